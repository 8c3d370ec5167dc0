use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use log::{debug, trace, warn};
use tokio::sync::RwLock;

use crate::{
    errors::SettlementError,
    side_effects::{Notifier, PushMessage, PushTokenStore, PushTransport},
};

struct CachedToken {
    token: Option<String>,
    fetched_at: Instant,
}

/// An expiring read-through cache of user push tokens. The store stays authoritative: entries older than the TTL are
/// ignored and re-read. A zero TTL disables caching.
pub struct TokenCache {
    ttl: Duration,
    entries: RwLock<HashMap<i64, CachedToken>>,
}

impl TokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    /// `Some(token)` on a fresh hit, where `token` may itself be `None` for a user with no registered device.
    pub async fn get(&self, user_id: i64) -> Option<Option<String>> {
        let entries = self.entries.read().await;
        entries.get(&user_id).filter(|e| e.fetched_at.elapsed() < self.ttl).map(|e| e.token.clone())
    }

    pub async fn put(&self, user_id: i64, token: Option<String>) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.fetched_at.elapsed() < self.ttl);
        entries.insert(user_id, CachedToken { token, fetched_at: Instant::now() });
    }

    pub async fn invalidate(&self, user_id: i64) {
        self.entries.write().await.remove(&user_id);
    }
}

/// Sends push notifications through a [`PushTransport`], addressing users via the tokens held in a
/// [`PushTokenStore`].
pub struct PushNotifier<S, T> {
    store: S,
    transport: T,
    cache: TokenCache,
}

impl<S, T> PushNotifier<S, T>
where
    S: PushTokenStore,
    T: PushTransport,
{
    pub fn new(store: S, transport: T, cache_ttl: Duration) -> Self {
        Self { store, transport, cache: TokenCache::new(cache_ttl) }
    }

    async fn token_for(&self, user_id: i64) -> Result<Option<String>, SettlementError> {
        if let Some(token) = self.cache.get(user_id).await {
            trace!("📲️ Push token cache hit for user #{user_id}");
            return Ok(token);
        }
        let token = self.store.push_token_for_user(user_id).await?;
        self.cache.put(user_id, token.clone()).await;
        Ok(token)
    }

    /// Saves the user's device token. Fails with `UserNotFound` if there is no such user.
    pub async fn register_token(&self, user_id: i64, token: String) -> Result<(), SettlementError> {
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(SettlementError::ValidationError("The push token cannot be empty".into()));
        }
        if !self.store.set_push_token(user_id, Some(token.clone())).await? {
            return Err(SettlementError::UserNotFound(user_id));
        }
        self.cache.put(user_id, Some(token)).await;
        debug!("📲️ Push token registered for user #{user_id}");
        Ok(())
    }

    pub async fn remove_token(&self, user_id: i64) -> Result<(), SettlementError> {
        if !self.store.set_push_token(user_id, None).await? {
            return Err(SettlementError::UserNotFound(user_id));
        }
        self.cache.invalidate(user_id).await;
        debug!("📲️ Push token removed for user #{user_id}");
        Ok(())
    }
}

impl<S, T> Notifier for PushNotifier<S, T>
where
    S: PushTokenStore,
    T: PushTransport,
{
    async fn notify_user(&self, user_id: i64, message: PushMessage) -> Result<usize, SettlementError> {
        match self.token_for(user_id).await? {
            Some(token) => {
                self.transport.send(&token, &message).await?;
                Ok(1)
            },
            None => {
                debug!("📲️ User #{user_id} has no push token. '{}' not sent", message.title);
                Ok(0)
            },
        }
    }

    async fn notify_admins(&self, message: PushMessage) -> Result<usize, SettlementError> {
        let tokens = self.store.admin_push_tokens().await?;
        let mut sent = 0;
        let mut last_error = None;
        for (admin_id, token) in &tokens {
            self.cache.put(*admin_id, Some(token.clone())).await;
            match self.transport.send(token, &message).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!("📲️ Could not notify admin #{admin_id}. {e}");
                    last_error = Some(e);
                },
            }
        }
        match last_error {
            Some(e) if sent == 0 => Err(e),
            _ => {
                debug!("📲️ '{}' sent to {sent} of {} admin devices", message.title, tokens.len());
                Ok(sent)
            },
        }
    }
}
