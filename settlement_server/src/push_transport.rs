use log::*;
use settlement_engine::{
    side_effects::{PushMessage, PushTransport},
    SettlementError,
};

/// A push transport that writes each message to the log instead of delivering it to a device.
///
/// Used until a push provider is configured. Tokens are shortened in the log output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPushTransport;

impl PushTransport for LoggingPushTransport {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), SettlementError> {
        info!("📲️ Push to {}: [{}] {} {}", mask_token(token), message.title, message.body, message.data);
        Ok(())
    }
}

fn mask_token(token: &str) -> String {
    let visible = token.chars().take(6).collect::<String>();
    if visible.len() < token.len() {
        format!("{visible}…")
    } else {
        visible
    }
}
