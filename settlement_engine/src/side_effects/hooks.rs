//! Wires the best-effort side effects onto the engine's event hooks.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::{
    events::{EventHooks, OrderCreatedEvent, OrderStatusChangedEvent, PaymentSettledEvent},
    side_effects::{AdminBroadcast, AdminEvent, CartStore, Notifier, PushMessage},
};

/// The collaborators that run after an order or payment change has been committed.
pub struct SideEffects<C, N, A> {
    carts: Arc<C>,
    notifier: Arc<N>,
    broadcast: Arc<A>,
}

impl<C, N, A> Clone for SideEffects<C, N, A> {
    fn clone(&self) -> Self {
        Self { carts: Arc::clone(&self.carts), notifier: Arc::clone(&self.notifier), broadcast: Arc::clone(&self.broadcast) }
    }
}

impl<C, N, A> SideEffects<C, N, A>
where
    C: CartStore + 'static,
    N: Notifier + 'static,
    A: AdminBroadcast + 'static,
{
    pub fn new(carts: Arc<C>, notifier: Arc<N>, broadcast: Arc<A>) -> Self {
        Self { carts, notifier, broadcast }
    }

    /// Clears the buyer's cart, tells the admin dashboard and pushes a notice to every admin device. The three are
    /// independent; one failing does not stop the others.
    pub async fn on_order_created(&self, event: OrderCreatedEvent) {
        let order = &event.order;
        let clear_cart = async {
            if let Some(user_id) = order.user_id {
                match self.carts.clear_cart(user_id).await {
                    Ok(n) => debug!("🛒️ Cleared {n} cart items for user #{user_id} after order #{}", order.id),
                    Err(e) => warn!("🛒️ Could not clear the cart of user #{user_id} after order #{}. {e}", order.id),
                }
            }
        };
        let broadcast = async {
            if let Err(e) = self.broadcast.emit(AdminEvent::new_order(order)) {
                warn!("📣️ Could not broadcast new order #{}. {e}", order.id);
            }
        };
        let notify = async {
            if let Err(e) = self.notifier.notify_admins(PushMessage::new_order(order)).await {
                warn!("📲️ Could not notify admins of new order #{}. {e}", order.id);
            }
        };
        tokio::join!(clear_cart, broadcast, notify);
    }

    pub async fn on_order_status_changed(&self, event: OrderStatusChangedEvent) {
        let order = &event.order;
        let Some(user_id) = order.user_id else {
            trace!("📲️ Order #{} has no customer account. No status notification sent", order.id);
            return;
        };
        let message = PushMessage::order_status_changed(order);
        if let Err(e) = self.notifier.notify_user(user_id, message).await {
            warn!("📲️ Could not notify user #{user_id} that order #{} is now {}. {e}", order.id, order.status);
        }
    }

    pub async fn on_payment_settled(&self, event: PaymentSettledEvent) {
        let payment = &event.payment;
        let notify = async {
            if let Some(user_id) = payment.user_id {
                if let Err(e) = self.notifier.notify_user(user_id, PushMessage::payment_settled(payment)).await {
                    warn!("📲️ Could not notify user #{user_id} about payment {}. {e}", payment.txn_ref);
                }
            }
        };
        let broadcast = async {
            if let Err(e) = self.broadcast.emit(AdminEvent::payment_settled(payment)) {
                warn!("📣️ Could not broadcast settlement of payment {}. {e}", payment.txn_ref);
            }
        };
        tokio::join!(notify, broadcast);
        debug!("🔄️ Side effects for payment {} ({} via {}) complete", payment.txn_ref, payment.status, event.trigger);
    }

    /// Registers every side effect on a fresh set of hooks.
    pub fn into_event_hooks(self) -> EventHooks {
        let mut hooks = EventHooks::default();
        let effects = self.clone();
        hooks.on_order_created(move |ev| {
            let effects = effects.clone();
            Box::pin(async move { effects.on_order_created(ev).await }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let effects = self.clone();
        hooks.on_order_status_changed(move |ev| {
            let effects = effects.clone();
            Box::pin(async move { effects.on_order_status_changed(ev).await })
                as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let effects = self;
        hooks.on_payment_settled(move |ev| {
            let effects = effects.clone();
            Box::pin(async move { effects.on_payment_settled(ev).await }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        hooks
    }
}
