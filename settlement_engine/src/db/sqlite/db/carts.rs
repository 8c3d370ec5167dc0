use sqlx::SqliteConnection;

use crate::errors::SettlementError;

/// Removes every cart line of the user and returns how many were removed.
pub async fn clear_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<u64, SettlementError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(conn).await?;
    Ok(result.rows_affected())
}
