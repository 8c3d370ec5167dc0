//! The VNPay gateway: signing outgoing payment requests and verifying the callbacks that come back.
mod signature;
mod vnpay;

pub use signature::{canonical_query, encode_uri_component, GatewayParams, SignatureCodec, SignatureError};
pub use vnpay::{
    new_txn_ref,
    order_id_from_txn_ref,
    CallbackData,
    CallbackVerification,
    DEFAULT_UTC_OFFSET_HOURS,
    DEFAULT_VNPAY_URL,
    GatewayEnvironment,
    SignaturePolicy,
    SignedRequest,
    VnPayConfig,
    VnPayGateway,
    VnPayRequest,
    PAYMENT_EXPIRY_MINUTES,
    SUCCESS_RESPONSE_CODE,
};

pub const SECURE_HASH: &str = "vnp_SecureHash";
pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";
pub const AMOUNT: &str = "vnp_Amount";
