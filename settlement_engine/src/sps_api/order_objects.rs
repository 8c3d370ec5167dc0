use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewOrder, Order, OrderStatusType},
    errors::SettlementError,
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub status: Option<OrderStatusType>,
    /// Case-insensitive substring match on the customer name.
    pub search: Option<String>,
    pub user_id: Option<i64>,
}

impl OrderQueryFilter {
    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_search<S: Into<String>>(mut self, search: S) -> Self {
        let search = search.into();
        self.search = (!search.trim().is_empty()).then_some(search);
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.search.is_none() && self.user_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[serde(alias = "asc")]
    Asc,
    /// Newest first.
    #[default]
    #[serde(alias = "desc")]
    Desc,
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "ASC"),
            SortOrder::Desc => write!(f, "DESC"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            other => Err(SettlementError::ValidationError(format!("'{other}' is not a sort order"))),
        }
    }
}

/// Page selection for listings. The default is the first page of ten, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub sort: SortOrder,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_PAGE_SIZE, sort: SortOrder::Desc }
    }
}

impl Pagination {
    pub fn new(page: u32, limit: u32, sort: SortOrder) -> Result<Self, SettlementError> {
        if page == 0 {
            return Err(SettlementError::ValidationError("Pages are numbered from 1".into()));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(SettlementError::ValidationError(format!("The page size must be between 1 and {MAX_PAGE_SIZE}")));
        }
        Ok(Self { page, limit, sort })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub items_per_page: i64,
    pub orders: Vec<Order>,
}

impl OrderPage {
    pub fn total_pages_for(total_items: i64, limit: u32) -> i64 {
        let limit = i64::from(limit.max(1));
        (total_items + limit - 1) / limit
    }
}

/// Checks the shape of an order request before any store work is done.
pub fn validate_new_order(order: &NewOrder) -> Result<(), SettlementError> {
    if order.items.is_empty() {
        return Err(SettlementError::ValidationError("An order must contain at least one item".into()));
    }
    if order.name.trim().is_empty() {
        return Err(SettlementError::ValidationError("A recipient name is required".into()));
    }
    if order.phone.trim().is_empty() {
        return Err(SettlementError::ValidationError("A phone number is required".into()));
    }
    if order.total.value() < 0 {
        return Err(SettlementError::ValidationError("The order total cannot be negative".into()));
    }
    if let Some((i, item)) = order.items.iter().enumerate().find(|(_, item)| item.quantity < 1) {
        return Err(SettlementError::ValidationError(format!(
            "Item #{} (product {}) has quantity {}. Quantities start at 1",
            i + 1,
            item.product_id,
            item.quantity
        )));
    }
    Ok(())
}
