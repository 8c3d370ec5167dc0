use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sps_common::Vnd;

use crate::{db_types::Payment, events::SettlementTrigger};

pub const DEFAULT_ORDER_TYPE: &str = "billpayment";
pub const DEFAULT_LOCALE: &str = "vn";

/// A request to pay for an existing order through the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub order_id: i64,
    pub amount: Vnd,
    pub order_info: Option<String>,
    /// The paying user. Defaults to the order's owner.
    pub user_id: Option<i64>,
    /// The payer's IP address, as the gateway requires it.
    pub ip_addr: String,
    pub bank_code: Option<String>,
    pub order_type: Option<String>,
    pub locale: Option<String>,
}

impl PaymentRequest {
    pub fn new<S: Into<String>>(order_id: i64, amount: Vnd, ip_addr: S) -> Self {
        Self {
            order_id,
            amount,
            order_info: None,
            user_id: None,
            ip_addr: ip_addr.into(),
            bank_code: None,
            order_type: None,
            locale: None,
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_bank_code<S: Into<String>>(mut self, bank_code: S) -> Self {
        self.bank_code = Some(bank_code.into());
        self
    }

    pub fn with_order_info<S: Into<String>>(mut self, order_info: S) -> Self {
        self.order_info = Some(order_info.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRedirect {
    pub order_id: i64,
    pub txn_ref: String,
    pub payment_url: String,
}

/// Which gateway channel delivered a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallbackSource {
    ReturnUrl,
    Ipn,
}

impl CallbackSource {
    /// The key the raw callback payload is stored under in the payment's response data.
    pub fn payload_key(&self) -> &'static str {
        match self {
            CallbackSource::ReturnUrl => "returnUrl",
            CallbackSource::Ipn => "ipn",
        }
    }
}

impl From<CallbackSource> for SettlementTrigger {
    fn from(source: CallbackSource) -> Self {
        match source {
            CallbackSource::ReturnUrl => SettlementTrigger::ReturnUrl,
            CallbackSource::Ipn => SettlementTrigger::Ipn,
        }
    }
}

impl Display for CallbackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SettlementTrigger::from(*self).fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ReconciliationOutcome {
    /// This callback moved the payment out of `pending`.
    Settled(Payment),
    /// The payment had already been settled. Nothing was changed.
    AlreadyProcessed(Payment),
    InvalidSignature,
    PaymentNotFound,
    /// The callback's amount differs from the stored payment. Nothing was changed.
    AmountMismatch { expected: Vnd, received: Option<Vnd> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub order_id: Option<i64>,
    #[serde(flatten)]
    pub outcome: ReconciliationOutcome,
}

impl ReconciliationResult {
    pub fn new(order_id: Option<i64>, outcome: ReconciliationOutcome) -> Self {
        Self { order_id, outcome }
    }

    /// The payment the callback refers to, if one was matched.
    pub fn payment(&self) -> Option<&Payment> {
        match &self.outcome {
            ReconciliationOutcome::Settled(p) | ReconciliationOutcome::AlreadyProcessed(p) => Some(p),
            _ => None,
        }
    }

    pub fn ipn_response(&self) -> IpnResponse {
        match self.outcome {
            ReconciliationOutcome::Settled(_) => IpnResponse::confirmed(),
            ReconciliationOutcome::AlreadyProcessed(_) => IpnResponse::already_confirmed(),
            ReconciliationOutcome::InvalidSignature => IpnResponse::invalid_signature(),
            ReconciliationOutcome::PaymentNotFound => IpnResponse::order_not_found(),
            ReconciliationOutcome::AmountMismatch { .. } => IpnResponse::invalid_amount(),
        }
    }
}

/// The acknowledgement the gateway expects in reply to an IPN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl IpnResponse {
    fn new(rsp_code: &str, message: &str) -> Self {
        Self { rsp_code: rsp_code.to_string(), message: message.to_string() }
    }

    pub fn confirmed() -> Self {
        Self::new("00", "Confirmed")
    }

    pub fn order_not_found() -> Self {
        Self::new("01", "Order not found")
    }

    pub fn already_confirmed() -> Self {
        Self::new("02", "Order already confirmed")
    }

    pub fn invalid_amount() -> Self {
        Self::new("04", "Invalid amount")
    }

    pub fn invalid_signature() -> Self {
        Self::new("97", "Invalid signature")
    }

    pub fn unknown_error() -> Self {
        Self::new("99", "Unknown error")
    }
}
