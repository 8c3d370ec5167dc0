use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use serde_json::{json, Map, Value};

use crate::{
    db::traits::{OrderManagement, PaymentGatewayDatabase},
    db_types::{NewPayment, Payment, PaymentStatus, PAYMENT_TYPE_VNPAY},
    errors::SettlementError,
    events::{EventProducers, PaymentSettledEvent, SettlementTrigger},
    gateway::{new_txn_ref, CallbackVerification, GatewayParams, VnPayGateway, VnPayRequest},
    sps_api::payment_objects::{
        CallbackSource,
        PaymentRedirect,
        PaymentRequest,
        ReconciliationOutcome,
        ReconciliationResult,
        DEFAULT_LOCALE,
        DEFAULT_ORDER_TYPE,
    },
};

/// Callback fields copied to the top level of a payment's response data when it settles.
const MERGED_CALLBACK_FIELDS: [&str; 4] = ["vnp_ResponseCode", "vnp_TransactionNo", "vnp_PayDate", "vnp_BankCode"];

/// `PaymentFlowApi` sends payers to the gateway and reconciles what the gateway reports back.
///
/// Each payment settles at most once, whichever of the return URL and the IPN arrives first. Reconciliation records
/// the payment outcome only; it never changes the order's status.
pub struct PaymentFlowApi<B> {
    db: B,
    gateway: VnPayGateway,
    producers: EventProducers,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, gateway: VnPayGateway, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }

    pub fn gateway(&self) -> &VnPayGateway {
        &self.gateway
    }

    /// Checks a callback's signature and extracts its fields, without touching any payment.
    pub fn verify_callback(&self, params: &GatewayParams) -> CallbackVerification {
        self.gateway.verify_callback(params)
    }
}

impl<B> PaymentFlowApi<B>
where B: OrderManagement + PaymentGatewayDatabase
{
    /// Creates a pending payment for the order and returns the signed gateway URL to send the payer to. The amount may
    /// not exceed the order total.
    pub async fn create_payment_request(&self, request: PaymentRequest) -> Result<PaymentRedirect, SettlementError> {
        if !request.amount.is_positive() {
            return Err(SettlementError::ValidationError("The payment amount must be positive".into()));
        }
        let order =
            self.db.fetch_order(request.order_id).await?.ok_or(SettlementError::OrderNotFound(request.order_id))?;
        if request.amount > order.total {
            return Err(SettlementError::ValidationError(format!(
                "The payment amount ({}) is more than the order total ({})",
                request.amount, order.total
            )));
        }
        let now = Utc::now();
        let txn_ref = new_txn_ref(order.id, now);
        let bank_code = request.bank_code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        let gateway_request = VnPayRequest {
            txn_ref: txn_ref.clone(),
            amount: request.amount,
            order_info: non_blank(request.order_info).unwrap_or_else(|| format!("Thanh toan don hang #{}", order.id)),
            order_type: non_blank(request.order_type).unwrap_or_else(|| DEFAULT_ORDER_TYPE.to_string()),
            locale: non_blank(request.locale).unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            ip_addr: request.ip_addr,
            bank_code: bank_code.clone(),
            created_at: now,
        };
        let signed = self.gateway.build_payment(&gateway_request)?;
        let payment = NewPayment {
            order_id: order.id,
            user_id: request.user_id.or(order.user_id),
            amount: request.amount,
            payment_type: PAYMENT_TYPE_VNPAY.to_string(),
            txn_ref: txn_ref.clone(),
            response_data: json!({
                "vnpTxnRef": txn_ref,
                "bankCode": bank_code.unwrap_or_default(),
                "amount": request.amount,
                "createDate": signed.create_date,
                "expireDate": signed.expire_date,
            }),
            expires_at: Some(signed.expires_at),
        };
        let payment = self.db.insert_payment(payment).await?;
        info!("🔄️💳️ Payment {} of {} created for order #{}", payment.txn_ref, payment.amount, order.id);
        Ok(PaymentRedirect { order_id: order.id, txn_ref: payment.txn_ref, payment_url: signed.payment_url })
    }

    /// Matches a gateway callback to its payment and records the outcome, once.
    ///
    /// A callback only ever touches the payment with its own order id and transaction reference. Invalid signatures,
    /// unknown payments, mismatched amounts and repeat deliveries are reported in the outcome and change nothing.
    pub async fn apply_callback(
        &self,
        params: GatewayParams,
        source: CallbackSource,
    ) -> Result<ReconciliationResult, SettlementError> {
        let verification = self.gateway.verify_callback(&params);
        let data = &verification.data;
        let explicit_order_id = params.get("orderId").and_then(|id| id.trim().parse::<i64>().ok());
        let order_id = explicit_order_id.or(data.order_id);
        if !verification.is_valid {
            warn!("🔄️💳️ {source} callback for {:?} has an invalid signature. Ignoring it", data.txn_ref);
            return Ok(ReconciliationResult::new(order_id, ReconciliationOutcome::InvalidSignature));
        }
        let Some(order_id) = order_id else {
            info!("🔄️💳️ {source} callback for {:?} does not identify an order", data.txn_ref);
            return Ok(ReconciliationResult::new(None, ReconciliationOutcome::PaymentNotFound));
        };
        let not_found = ReconciliationResult::new(Some(order_id), ReconciliationOutcome::PaymentNotFound);
        let Some(payment) = self.db.fetch_payment_for_callback(order_id, data.txn_ref.clone()).await? else {
            info!("🔄️💳️ {source} callback: no payment {:?} for order #{order_id}", data.txn_ref);
            return Ok(not_found);
        };
        if payment.status.is_terminal() {
            debug!("🔄️💳️ {source} callback: payment {} is already {}", payment.txn_ref, payment.status);
            return Ok(ReconciliationResult::new(Some(order_id), ReconciliationOutcome::AlreadyProcessed(payment)));
        }
        if data.amount != Some(payment.amount) {
            warn!(
                "🔄️💳️ {source} callback for payment {} reports {:?} but {} is owed. Ignoring it",
                payment.txn_ref, data.amount, payment.amount
            );
            let outcome = ReconciliationOutcome::AmountMismatch { expected: payment.amount, received: data.amount };
            return Ok(ReconciliationResult::new(Some(order_id), outcome));
        }
        let status = if verification.is_successful { PaymentStatus::Success } else { PaymentStatus::Failed };
        let patch = callback_patch(&params, source);
        match self.db.settle_payment(payment.id, status, patch).await? {
            Some(settled) => {
                info!("🔄️💳️ Payment {} for order #{order_id} settled as {status} via {source}", settled.txn_ref);
                self.call_payment_settled_hook(&settled, source.into()).await;
                Ok(ReconciliationResult::new(Some(order_id), ReconciliationOutcome::Settled(settled)))
            },
            None => {
                debug!("🔄️💳️ Payment {} was settled by a concurrent callback", payment.txn_ref);
                let current = self.db.fetch_payment_for_callback(order_id, Some(payment.txn_ref)).await?;
                Ok(current
                    .map(|p| ReconciliationResult::new(Some(order_id), ReconciliationOutcome::AlreadyProcessed(p)))
                    .unwrap_or(not_found))
            },
        }
    }

    async fn call_payment_settled_hook(&self, payment: &Payment, trigger: SettlementTrigger) {
        for emitter in &self.producers.payment_settled_producer {
            trace!("🔄️💳️ Notifying payment settled hook subscribers");
            emitter.publish_event(PaymentSettledEvent::new(payment.clone(), trigger)).await;
        }
    }

    /// All payments made against the order, newest first.
    pub async fn payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, SettlementError> {
        if self.db.fetch_order(order_id).await?.is_none() {
            return Err(SettlementError::OrderNotFound(order_id));
        }
        self.db.fetch_payments_for_order(order_id).await
    }

    /// Fails pending payments whose gateway expiry passed more than `grace` ago.
    pub async fn expire_stale_payments(&self, grace: Duration) -> Result<Vec<Payment>, SettlementError> {
        let cutoff = Utc::now() - grace;
        let expired = self.db.expire_payments(cutoff).await?;
        if !expired.is_empty() {
            info!("🔄️💳️ {} unfinished payments have expired", expired.len());
        }
        for payment in &expired {
            self.call_payment_settled_hook(payment, SettlementTrigger::Expiry).await;
        }
        Ok(expired)
    }
}

/// The JSON merged into a payment's response data on settlement. Only fields the callback carries are copied, so an
/// absent field never erases a stored one.
fn callback_patch(params: &GatewayParams, source: CallbackSource) -> Value {
    let mut patch = Map::new();
    for key in MERGED_CALLBACK_FIELDS {
        if let Some(v) = params.get(key) {
            patch.insert(key.to_string(), Value::String(v.clone()));
        }
    }
    let payload = params.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect::<Map<_, _>>();
    patch.insert(source.payload_key().to_string(), Value::Object(payload));
    Value::Object(patch)
}
