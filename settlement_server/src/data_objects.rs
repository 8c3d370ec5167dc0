use std::fmt::Display;

use serde::{Deserialize, Serialize};
use settlement_engine::{
    db_types::OrderStatusType,
    order_objects::{OrderQueryFilter, Pagination, SortOrder, DEFAULT_PAGE_SIZE},
    payment_objects::PaymentRequest,
    SettlementError,
};
use sps_common::Vnd;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusParams {
    pub status: OrderStatusType,
}

/// Query string of the admin order listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchParams {
    pub status: Option<OrderStatusType>,
    pub search: Option<String>,
    pub user_id: Option<i64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<SortOrder>,
}

impl OrderSearchParams {
    pub fn filter(&self) -> OrderQueryFilter {
        let mut filter = OrderQueryFilter::default();
        if let Some(status) = self.status {
            filter = filter.with_status(status);
        }
        if let Some(search) = &self.search {
            filter = filter.with_search(search.as_str());
        }
        if let Some(user_id) = self.user_id {
            filter = filter.with_user_id(user_id);
        }
        filter
    }

    pub fn pagination(&self) -> Result<Pagination, SettlementError> {
        Pagination::new(self.page.unwrap_or(1), self.limit.unwrap_or(DEFAULT_PAGE_SIZE), self.sort.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentParams {
    pub order_id: i64,
    pub amount: Vnd,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub order_info: Option<String>,
    #[serde(default)]
    pub bank_code: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

impl CreatePaymentParams {
    pub fn into_request(self, ip_addr: String) -> PaymentRequest {
        let mut request = PaymentRequest::new(self.order_id, self.amount, ip_addr);
        if let Some(user_id) = self.user_id {
            request = request.with_user(user_id);
        }
        if let Some(info) = self.order_info.filter(|s| !s.trim().is_empty()) {
            request = request.with_order_info(info);
        }
        if let Some(bank_code) = self.bank_code.filter(|s| !s.trim().is_empty()) {
            request = request.with_bank_code(bank_code);
        }
        if let Some(locale) = self.locale.filter(|s| !s.trim().is_empty()) {
            request.locale = Some(locale);
        }
        request
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushTokenParams {
    pub token: String,
}
