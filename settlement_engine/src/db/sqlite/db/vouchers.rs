use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{db_types::Voucher, errors::SettlementError};

const VOUCHER_COLUMNS: &str = "id, code, usage_limit, used_count, start_date, end_date, is_free_shipping";

pub async fn fetch_voucher(id: i64, conn: &mut SqliteConnection) -> Result<Option<Voucher>, SettlementError> {
    let sql = format!("SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE id = $1");
    let voucher = sqlx::query_as::<_, Voucher>(&sql).bind(id).fetch_optional(conn).await?;
    Ok(voucher)
}

/// Redeems one use of the voucher, if it is redeemable at `now`. A `None` voucher id is a no-op.
///
/// The eligibility check and the increment are a single conditional update, so two orders can never both take the
/// last remaining use. Rolling back the enclosing transaction gives the use back.
pub async fn reserve(
    voucher_id: Option<i64>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Voucher>, SettlementError> {
    let Some(id) = voucher_id else {
        return Ok(None);
    };
    let sql = format!(
        r#"
            UPDATE vouchers SET used_count = used_count + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
              AND datetime(start_date) <= datetime($2)
              AND datetime(end_date) >= datetime($2)
              AND used_count < usage_limit
            RETURNING {VOUCHER_COLUMNS};
        "#
    );
    let reserved = sqlx::query_as::<_, Voucher>(&sql).bind(id).bind(now).fetch_optional(&mut *conn).await?;
    match reserved {
        Some(voucher) => {
            debug!("🗃️ Voucher {} reserved. {} of {} uses taken", voucher.code, voucher.used_count, voucher.usage_limit);
            Ok(Some(voucher))
        },
        None => match fetch_voucher(id, conn).await? {
            Some(voucher) => {
                trace!("🗃️ Voucher {} cannot be redeemed at {now}: {voucher:?}", voucher.code);
                Err(SettlementError::VoucherInvalid(id))
            },
            None => Err(SettlementError::VoucherNotFound(id)),
        },
    }
}

/// Vouchers that are inside their validity window and still have uses left, soonest-expiring first.
pub async fn fetch_available(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Voucher>, SettlementError> {
    let sql = format!(
        r#"
            SELECT {VOUCHER_COLUMNS} FROM vouchers
            WHERE datetime(start_date) <= datetime($1)
              AND datetime(end_date) >= datetime($1)
              AND used_count < usage_limit
            ORDER BY end_date ASC, id ASC
        "#
    );
    let vouchers = sqlx::query_as::<_, Voucher>(&sql).bind(now).fetch_all(conn).await?;
    Ok(vouchers)
}
