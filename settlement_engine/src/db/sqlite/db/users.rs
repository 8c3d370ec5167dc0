use log::debug;
use sqlx::SqliteConnection;

use crate::errors::SettlementError;

/// The push token registered for the user, if the user exists and has one.
pub async fn push_token_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<String>, SettlementError> {
    let token = sqlx::query_scalar::<_, Option<String>>("SELECT push_token FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(token.flatten())
}

pub async fn admin_push_tokens(conn: &mut SqliteConnection) -> Result<Vec<(i64, String)>, SettlementError> {
    let tokens = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, push_token FROM users WHERE role = 'admin' AND push_token IS NOT NULL AND push_token <> '' ORDER BY id",
    )
    .fetch_all(conn)
    .await?;
    Ok(tokens)
}

/// Sets (or clears, with `None`) the user's push token. Returns false if the user does not exist.
pub async fn set_push_token(
    user_id: i64,
    token: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<bool, SettlementError> {
    let result = sqlx::query("UPDATE users SET push_token = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(token)
        .bind(user_id)
        .execute(conn)
        .await?;
    let updated = result.rows_affected() > 0;
    if updated {
        debug!("🗃️ Push token for user #{user_id} {}", if token.is_some() { "saved" } else { "removed" });
    }
    Ok(updated)
}
