//! Best-effort work that follows a committed order or payment change.
//!
//! None of these collaborators can fail or roll back the operation that triggered them. The hooks in [`hooks`] run
//! them on the event handler tasks, log failures and move on.
//!
//! The traits return `Send` futures so that generic hook code can run them on spawned tasks.
mod broadcast;
mod messages;
mod push;

pub mod hooks;

use std::future::Future;

pub use broadcast::BroadcastHub;
pub use messages::{AdminEvent, AdminNotification, OrderSummary, PaymentSummary, PushMessage, ADMIN_EVENT_CHANNEL};
pub use push::{PushNotifier, TokenCache};

use crate::errors::SettlementError;

/// Shopping cart storage. Only clearing is needed once an order is placed.
pub trait CartStore: Send + Sync {
    fn clear_cart(&self, user_id: i64) -> impl Future<Output = Result<u64, SettlementError>> + Send;
}

/// The source of truth for push notification addresses.
pub trait PushTokenStore: Send + Sync {
    fn push_token_for_user(&self, user_id: i64) -> impl Future<Output = Result<Option<String>, SettlementError>> + Send;

    /// `(user_id, token)` for every admin with a registered token.
    fn admin_push_tokens(&self) -> impl Future<Output = Result<Vec<(i64, String)>, SettlementError>> + Send;

    /// Sets or clears a user's token. Resolves to false if the user does not exist.
    fn set_push_token(
        &self,
        user_id: i64,
        token: Option<String>,
    ) -> impl Future<Output = Result<bool, SettlementError>> + Send;
}

/// Delivers a push message to one device token.
pub trait PushTransport: Send + Sync {
    fn send(&self, token: &str, message: &PushMessage) -> impl Future<Output = Result<(), SettlementError>> + Send;
}

/// Push notifications addressed by user.
pub trait Notifier: Send + Sync {
    /// Resolves to the number of devices the message was handed to.
    fn notify_user(
        &self,
        user_id: i64,
        message: PushMessage,
    ) -> impl Future<Output = Result<usize, SettlementError>> + Send;

    fn notify_admins(&self, message: PushMessage) -> impl Future<Output = Result<usize, SettlementError>> + Send;
}

/// Fan-out of real-time events to the connected admin observers. Having no observers is not an error.
pub trait AdminBroadcast: Send + Sync {
    /// Returns the number of observers that received the event.
    fn emit(&self, event: AdminEvent) -> Result<usize, SettlementError>;
}
