use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderStatusType},
    errors::SettlementError,
    sps_api::order_objects::{OrderPage, OrderQueryFilter, Pagination},
};

/// Inserts a new order with status `pending`. This is not atomic. Embed the call inside a transaction and pass `&mut tx`
/// as the connection argument.
///
/// When used inside a transaction, call this first: the insert takes the database write lock, so concurrent writers
/// queue behind the busy timeout instead of failing on a lock upgrade.
///
/// Nothing is inserted if the order names a user or voucher that does not exist. The result is `UserNotFound` or
/// `VoucherNotFound` respectively.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, SettlementError> {
    let inserted = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (user_id, name, phone, address, total, status, voucher_id)
            SELECT $1, $2, $3, $4, $5, 'pending', $6
            WHERE ($1 IS NULL OR EXISTS (SELECT 1 FROM users WHERE id = $1))
              AND ($6 IS NULL OR EXISTS (SELECT 1 FROM vouchers WHERE id = $6))
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.name.trim())
    .bind(order.phone.trim())
    .bind(order.address.as_deref())
    .bind(order.total)
    .bind(order.voucher_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(saved) = inserted else {
        return Err(missing_reference(order, conn).await?);
    };
    trace!("🗃️ Order #{} inserted", saved.id);
    Ok(saved)
}

async fn missing_reference(order: &NewOrder, conn: &mut SqliteConnection) -> Result<SettlementError, SettlementError> {
    if let Some(user_id) = order.user_id {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;
        if count == 0 {
            debug!("🗃️ Order rejected. User #{user_id} does not exist");
            return Ok(SettlementError::UserNotFound(user_id));
        }
    }
    match order.voucher_id {
        Some(voucher_id) => {
            debug!("🗃️ Order rejected. Voucher #{voucher_id} does not exist");
            Ok(SettlementError::VoucherNotFound(voucher_id))
        },
        None => Err(SettlementError::IntegrityError("Order was not inserted".into())),
    }
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, SettlementError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            SELECT id, user_id, name, phone, address, total, status, voucher_id, created_at, updated_at
            FROM orders
            WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Touches the order row and returns it. Inside a transaction this takes the write lock before the order is
/// inspected, so a read-then-write sequence cannot be interleaved with another writer.
pub async fn lock_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, SettlementError> {
    let order = sqlx::query_as::<_, Order>("UPDATE orders SET updated_at = updated_at WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Moves the order from `from` to `to`, only if it still has status `from`. Returns `None` when the status has
/// changed in the meantime.
pub async fn compare_and_set_status(
    id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SettlementError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    if order.is_some() {
        debug!("🗃️ Order #{id} status changed from {from} to {to}");
    }
    Ok(order)
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a OrderQueryFilter) {
    if filter.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(status) = filter.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(search) = &filter.search {
        where_clause.push("name LIKE ");
        where_clause.push_bind_unseparated(format!("%{}%", search.trim()));
    }
    if let Some(user_id) = filter.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
}

/// Fetches one page of orders matching the filter, along with the counts needed to page through the rest.
///
/// A page past the end yields no orders and reports the last page as the current one.
pub async fn search_orders(
    filter: &OrderQueryFilter,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<OrderPage, SettlementError> {
    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    push_filter(&mut count_query, filter);
    let total_items: i64 = count_query.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    let total_pages = OrderPage::total_pages_for(total_items, pagination.limit);
    let items_per_page = i64::from(pagination.limit);
    if i64::from(pagination.page) > total_pages {
        trace!("🗃️ Page {} requested, but there are only {total_pages} pages", pagination.page);
        return Ok(OrderPage { total_items, total_pages, current_page: total_pages, items_per_page, orders: vec![] });
    }

    let mut builder = QueryBuilder::new(
        "SELECT id, user_id, name, phone, address, total, status, voucher_id, created_at, updated_at FROM orders",
    );
    push_filter(&mut builder, filter);
    let sort = pagination.sort;
    builder.push(format!(" ORDER BY created_at {sort}, id {sort} LIMIT "));
    builder.push_bind(items_per_page);
    builder.push(" OFFSET ");
    builder.push_bind(pagination.offset());
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {} of {total_items}", orders.len());
    Ok(OrderPage { total_items, total_pages, current_page: i64::from(pagination.page), items_per_page, orders })
}
