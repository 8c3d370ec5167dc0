use log::trace;
use tokio::sync::broadcast;

use crate::{
    errors::SettlementError,
    side_effects::{AdminBroadcast, AdminEvent},
};

/// In-process fan-out of admin events. Each connected observer holds a receiver from [`BroadcastHub::subscribe`].
/// Slow observers lose the oldest events once `capacity` events are queued for them.
#[derive(Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<AdminEvent>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdminEvent> {
        self.sender.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl AdminBroadcast for BroadcastHub {
    fn emit(&self, event: AdminEvent) -> Result<usize, SettlementError> {
        match self.sender.send(event) {
            Ok(n) => {
                trace!("📣️ Admin event delivered to {n} observers");
                Ok(n)
            },
            Err(_) => {
                trace!("📣️ No admin observers are connected. Event dropped");
                Ok(0)
            },
        }
    }
}
