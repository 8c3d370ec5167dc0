use chrono::Duration;
use log::*;
use settlement_engine::{
    db_types::Payment,
    events::EventProducers,
    gateway::VnPayGateway,
    PaymentFlowApi,
    SqliteDatabase,
};
use tokio::task::JoinHandle;

const EXPIRY_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Starts the payment expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every minute, pending payments whose gateway expiry passed more than `grace` ago are marked as failed.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    gateway: VnPayGateway,
    producers: EventProducers,
    grace: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(EXPIRY_INTERVAL);
        let api = PaymentFlowApi::new(db, gateway, producers);
        info!("🕰️ Payment expiry worker started with a grace period of {} minutes", grace.num_minutes());
        loop {
            timer.tick().await;
            trace!("🕰️ Running payment expiry job");
            match api.expire_stale_payments(grace).await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No payments expired"),
                Ok(expired) => {
                    info!("🕰️ {} payments expired", expired.len());
                    debug!("🕰️ Expired payments: {}", payment_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running payment expiry job: {e}");
                },
            }
        }
    })
}

fn payment_list(payments: &[Payment]) -> String {
    payments
        .iter()
        .map(|p| format!("[{}] txn_ref: {} order: #{}", p.id, p.txn_ref, p.order_id))
        .collect::<Vec<String>>()
        .join(", ")
}
