use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use log::*;
use sps_common::{Secret, Vnd, VND_CURRENCY_CODE};

use crate::gateway::{
    signature::{canonical_query, GatewayParams, SignatureCodec, SignatureError},
    SECURE_HASH,
};

pub const VNPAY_VERSION: &str = "2.1.0";
pub const SUCCESS_RESPONSE_CODE: &str = "00";
/// How long the payer has to complete the payment on the gateway's page.
pub const PAYMENT_EXPIRY_MINUTES: i64 = 15;
pub const DEFAULT_VNPAY_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;
const GATEWAY_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GatewayEnvironment {
    #[default]
    Production,
    Sandbox,
}

impl FromStr for GatewayEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "sandbox" | "test" | "development" => Ok(Self::Sandbox),
            other => Err(format!("'{other}' is not a gateway environment. Use 'production' or 'sandbox'")),
        }
    }
}

impl Display for GatewayEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayEnvironment::Production => write!(f, "production"),
            GatewayEnvironment::Sandbox => write!(f, "sandbox"),
        }
    }
}

/// How callback signatures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePolicy {
    Enforce,
    /// Accept any callback that carries a signature, right or wrong. Sandbox only.
    TrustUnsigned,
}

#[derive(Debug, Clone)]
pub struct VnPayConfig {
    pub tmn_code: String,
    pub hash_secret: Secret<String>,
    pub payment_url: String,
    pub return_url: String,
    pub environment: GatewayEnvironment,
    pub trust_unsigned: bool,
    /// The gateway's local time zone, used for `vnp_CreateDate` and `vnp_ExpireDate`.
    pub utc_offset_hours: i32,
}

impl Default for VnPayConfig {
    fn default() -> Self {
        Self {
            tmn_code: String::default(),
            hash_secret: Secret::default(),
            payment_url: DEFAULT_VNPAY_URL.to_string(),
            return_url: String::default(),
            environment: GatewayEnvironment::Production,
            trust_unsigned: false,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

impl VnPayConfig {
    /// Signatures are always enforced in production, whatever `trust_unsigned` says.
    pub fn signature_policy(&self) -> SignaturePolicy {
        match (self.environment, self.trust_unsigned) {
            (GatewayEnvironment::Sandbox, true) => SignaturePolicy::TrustUnsigned,
            _ => SignaturePolicy::Enforce,
        }
    }

    pub fn utc_offset(&self) -> FixedOffset {
        let seconds = self.utc_offset_hours.checked_mul(3600);
        seconds.and_then(FixedOffset::east_opt).unwrap_or_else(|| {
            warn!("🔐️ {} hours is not a valid UTC offset. Gateway times will be in UTC", self.utc_offset_hours);
            Utc.fix()
        })
    }
}

/// `VNP<order id>T<unix time in microseconds>`.
pub fn new_txn_ref(order_id: i64, now: DateTime<Utc>) -> String {
    format!("VNP{order_id}T{}", now.timestamp_micros())
}

/// Extracts the order id from a transaction reference made by [`new_txn_ref`].
pub fn order_id_from_txn_ref(txn_ref: &str) -> Option<i64> {
    let (id, time) = txn_ref.trim().strip_prefix("VNP")?.split_once('T')?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(id) || !all_digits(time) {
        return None;
    }
    id.parse().ok()
}

/// The merchant-side details of a payment request.
#[derive(Debug, Clone)]
pub struct VnPayRequest {
    pub txn_ref: String,
    pub amount: Vnd,
    pub order_info: String,
    pub order_type: String,
    pub locale: String,
    pub ip_addr: String,
    pub bank_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A signed payment request, ready to send the payer to.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub payment_url: String,
    pub params: GatewayParams,
    /// `vnp_CreateDate` as sent to the gateway.
    pub create_date: String,
    /// `vnp_ExpireDate` as sent to the gateway.
    pub expire_date: String,
    pub expires_at: DateTime<Utc>,
}

/// The fields of a gateway callback the engine cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackData {
    pub txn_ref: Option<String>,
    /// The order id embedded in the transaction reference.
    pub order_id: Option<i64>,
    /// `vnp_Amount` converted back to dong. `None` if missing or malformed.
    pub amount: Option<Vnd>,
    pub order_info: Option<String>,
    pub response_code: Option<String>,
    pub transaction_no: Option<String>,
    pub bank_code: Option<String>,
    pub pay_date: Option<String>,
    pub card_type: Option<String>,
    pub bank_tran_no: Option<String>,
}

impl CallbackData {
    pub fn from_params(params: &GatewayParams) -> Self {
        let get = |k: &str| params.get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let txn_ref = get("vnp_TxnRef");
        Self {
            order_id: txn_ref.as_deref().and_then(order_id_from_txn_ref),
            txn_ref,
            amount: get("vnp_Amount").and_then(|a| Vnd::from_gateway_amount(&a).ok()),
            order_info: get("vnp_OrderInfo"),
            response_code: get("vnp_ResponseCode"),
            transaction_no: get("vnp_TransactionNo"),
            bank_code: get("vnp_BankCode"),
            pay_date: get("vnp_PayDate"),
            card_type: get("vnp_CardType"),
            bank_tran_no: get("vnp_BankTranNo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackVerification {
    pub is_valid: bool,
    /// The gateway reported a successful payment (`vnp_ResponseCode` is `00`).
    pub is_successful: bool,
    pub data: CallbackData,
}

#[derive(Debug, Clone)]
pub struct VnPayGateway {
    config: VnPayConfig,
    codec: SignatureCodec,
}

impl VnPayGateway {
    pub fn new(config: VnPayConfig) -> Self {
        let codec = SignatureCodec::new(config.hash_secret.clone());
        if config.signature_policy() == SignaturePolicy::TrustUnsigned {
            warn!("🔐️ Sandbox mode: callback signatures are NOT being checked");
        }
        Self { config, codec }
    }

    pub fn config(&self) -> &VnPayConfig {
        &self.config
    }

    fn gateway_time(&self, t: DateTime<Utc>) -> String {
        t.with_timezone(&self.config.utc_offset()).format(GATEWAY_TIME_FORMAT).to_string()
    }

    pub fn build_payment(&self, request: &VnPayRequest) -> Result<SignedRequest, SignatureError> {
        let amount = request.amount.gateway_amount().ok_or(SignatureError::AmountOutOfRange(request.amount))?;
        let expires_at = request.created_at + Duration::minutes(PAYMENT_EXPIRY_MINUTES);
        let create_date = self.gateway_time(request.created_at);
        let expire_date = self.gateway_time(expires_at);
        let mut params = GatewayParams::new();
        let mut set = |k: &str, v: String| {
            params.insert(k.to_string(), v);
        };
        set("vnp_Version", VNPAY_VERSION.to_string());
        set("vnp_Command", "pay".to_string());
        set("vnp_TmnCode", self.config.tmn_code.clone());
        set("vnp_Locale", request.locale.clone());
        set("vnp_CurrCode", VND_CURRENCY_CODE.to_string());
        set("vnp_TxnRef", request.txn_ref.clone());
        set("vnp_OrderInfo", request.order_info.clone());
        set("vnp_OrderType", request.order_type.clone());
        set("vnp_Amount", amount.to_string());
        set("vnp_ReturnUrl", self.config.return_url.clone());
        set("vnp_IpAddr", request.ip_addr.clone());
        set("vnp_CreateDate", create_date.clone());
        set("vnp_ExpireDate", expire_date.clone());
        if let Some(bank_code) = request.bank_code.as_ref().filter(|c| !c.trim().is_empty()) {
            set("vnp_BankCode", bank_code.trim().to_string());
        }
        let signature = self.codec.sign(&params)?;
        let payment_url = format!("{}?{}&{SECURE_HASH}={signature}", self.config.payment_url, canonical_query(&params));
        trace!("🔐️ Signed payment request {}", request.txn_ref);
        Ok(SignedRequest { payment_url, params, create_date, expire_date, expires_at })
    }

    /// Checks a callback's signature and extracts its fields. A callback without a signature is never valid.
    pub fn verify_callback(&self, params: &GatewayParams) -> CallbackVerification {
        let data = CallbackData::from_params(params);
        let is_successful = data.response_code.as_deref() == Some(SUCCESS_RESPONSE_CODE);
        let is_valid = match params.get(SECURE_HASH).map(|h| h.trim()).filter(|h| !h.is_empty()) {
            None => {
                debug!("🔐️ Callback for {:?} has no signature", data.txn_ref);
                false
            },
            Some(hash) => match self.config.signature_policy() {
                SignaturePolicy::Enforce => self.codec.verify(params, hash),
                SignaturePolicy::TrustUnsigned => {
                    warn!("🔐️ Accepting callback for {:?} without checking its signature", data.txn_ref);
                    true
                },
            },
        };
        if !is_valid {
            info!("🔐️ Callback for {:?} failed signature verification", data.txn_ref);
        }
        CallbackVerification { is_valid, is_successful, data }
    }
}
