use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde_json::Value;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    errors::SettlementError,
};

const PAYMENT_COLUMNS: &str =
    "id, order_id, user_id, amount, payment_type, txn_ref, status, response_data, expires_at, created_at, updated_at";

/// Stores a new pending payment for an existing order. Returns `OrderNotFound` if the order does not exist.
pub async fn insert_payment(payment: &NewPayment, conn: &mut SqliteConnection) -> Result<Payment, SettlementError> {
    let sql = format!(
        r#"
            INSERT INTO payments (order_id, user_id, amount, payment_type, txn_ref, status, response_data, expires_at)
            SELECT $1, $2, $3, $4, $5, 'pending', $6, $7
            WHERE EXISTS (SELECT 1 FROM orders WHERE id = $1)
            RETURNING {PAYMENT_COLUMNS};
        "#
    );
    let inserted = sqlx::query_as::<_, Payment>(&sql)
        .bind(payment.order_id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(payment.payment_type.as_str())
        .bind(payment.txn_ref.as_str())
        .bind(payment.response_data.to_string())
        .bind(payment.expires_at)
        .fetch_optional(conn)
        .await?;
    let payment = inserted.ok_or(SettlementError::OrderNotFound(payment.order_id))?;
    debug!("🗃️ Payment #{} ({}) stored for order #{}", payment.id, payment.txn_ref, payment.order_id);
    Ok(payment)
}

/// Finds the payment a gateway callback refers to. Only payments of the given order are considered. With a
/// transaction reference the match is exact; without one, the most recent payment of that type for the order is
/// used.
pub async fn fetch_payment_for_callback(
    order_id: i64,
    payment_type: &str,
    txn_ref: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SettlementError> {
    let payment = match txn_ref {
        Some(txn_ref) => {
            let sql = format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 AND payment_type = $2 AND txn_ref = $3"
            );
            sqlx::query_as::<_, Payment>(&sql)
                .bind(order_id)
                .bind(payment_type)
                .bind(txn_ref)
                .fetch_optional(conn)
                .await?
        },
        None => {
            let sql = format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 AND payment_type = $2 ORDER BY id DESC \
                 LIMIT 1"
            );
            sqlx::query_as::<_, Payment>(&sql).bind(order_id).bind(payment_type).fetch_optional(conn).await?
        },
    };
    Ok(payment)
}

pub async fn fetch_payments_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, SettlementError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 ORDER BY id DESC");
    let payments = sqlx::query_as::<_, Payment>(&sql).bind(order_id).fetch_all(conn).await?;
    Ok(payments)
}

/// Moves a pending payment to `status` and merges `patch` into its response data (RFC 7396 merge). Returns `None` if
/// the payment is no longer pending, in which case nothing is written.
pub async fn settle_payment(
    id: i64,
    status: PaymentStatus,
    patch: &Value,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SettlementError> {
    let sql = format!(
        r#"
            UPDATE payments
            SET status = $1, response_data = json_patch(response_data, $2), updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS};
        "#
    );
    let settled =
        sqlx::query_as::<_, Payment>(&sql).bind(status).bind(patch.to_string()).bind(id).fetch_optional(conn).await?;
    match &settled {
        Some(p) => debug!("🗃️ Payment #{id} ({}) settled as {}", p.txn_ref, p.status),
        None => trace!("🗃️ Payment #{id} is not pending. Settlement skipped"),
    }
    Ok(settled)
}

/// Cancels every pending payment of the order.
pub async fn cancel_pending_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, SettlementError> {
    let sql = format!(
        r#"
            UPDATE payments
            SET status = 'cancelled',
                response_data = json_patch(response_data, '{{"cancelledWithOrder":true}}'),
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS};
        "#
    );
    let cancelled = sqlx::query_as::<_, Payment>(&sql).bind(order_id).fetch_all(conn).await?;
    Ok(cancelled)
}

/// Marks pending payments that expired at or before `cutoff` as failed.
pub async fn expire_pending(cutoff: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Payment>, SettlementError> {
    let sql = format!(
        r#"
            UPDATE payments
            SET status = 'failed',
                response_data = json_patch(response_data, '{{"expired":true}}'),
                updated_at = CURRENT_TIMESTAMP
            WHERE status = 'pending' AND expires_at IS NOT NULL AND datetime(expires_at) <= datetime($1)
            RETURNING {PAYMENT_COLUMNS};
        "#
    );
    let expired = sqlx::query_as::<_, Payment>(&sql).bind(cutoff).fetch_all(conn).await?;
    Ok(expired)
}
