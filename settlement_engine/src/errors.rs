use std::fmt::Display;

use sps_common::Vnd;
use thiserror::Error;

use crate::{db_types::OrderStatusType, gateway::SignatureError};

/// Coarse classification of [`SettlementError`]s. Adapters (e.g. the HTTP server) map these onto their own error
/// vocabulary without having to know about every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is malformed or violates a business rule that the caller can fix.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// The request is well-formed but clashes with the current state (exhausted voucher, illegal transition).
    Conflict,
    /// The store rejected the write because it would break a constraint.
    Integrity,
    /// The store is busy or unreachable. Retrying may succeed.
    Transient,
    /// A best-effort collaborator (push transport, broadcast) failed.
    Downstream,
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Transient => "transient",
            ErrorKind::Downstream => "downstream",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("Item #{0} must specify both a color and a size")]
    MissingVariantSelection(usize),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Color {color_id} is not available for product {product_id}")]
    InvalidColorForProduct { product_id: i64, color_id: i64 },
    #[error("Size {0} does not exist")]
    InvalidSize(i64),
    #[error("Voucher {0} does not exist")]
    VoucherNotFound(i64),
    #[error("Voucher is invalid or exhausted")]
    VoucherInvalid(i64),
    #[error("The order total ({supplied}) does not match the computed total ({computed})")]
    OrderTotalMismatch { supplied: Vnd, computed: Vnd },
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {id} cannot move from '{from}' to '{to}'")]
    OrderModificationForbidden { id: i64, from: OrderStatusType, to: OrderStatusType },
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Data integrity error. {0}")]
    IntegrityError(String),
    #[error("The store is temporarily unavailable. {0}")]
    TransientError(String),
    #[error("Database error. {0}")]
    DatabaseError(String),
    #[error("Downstream service error. {0}")]
    DownstreamError(String),
    #[error("Internal error. {0}")]
    InternalError(String),
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        use SettlementError::*;
        match self {
            ValidationError(_) |
            MissingVariantSelection(_) |
            InvalidColorForProduct { .. } |
            InvalidSize(_) |
            OrderTotalMismatch { .. } => ErrorKind::Validation,
            ProductNotFound(_) | VoucherNotFound(_) | OrderNotFound(_) | UserNotFound(_) => {
                ErrorKind::NotFound
            },
            VoucherInvalid(_) | OrderModificationForbidden { .. } => ErrorKind::Conflict,
            IntegrityError(_) => ErrorKind::Integrity,
            TransientError(_) => ErrorKind::Transient,
            DownstreamError(_) => ErrorKind::Downstream,
            DatabaseError(_) | InternalError(_) => ErrorKind::Internal,
        }
    }
}

// SQLite primary result codes for a locked database
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::TransientError(e.to_string())
            },
            sqlx::Error::Database(ref db_err) => {
                let primary_code =
                    db_err.code().and_then(|c| c.parse::<i64>().ok()).map(|code| code & 0xff).unwrap_or_default();
                if primary_code == SQLITE_BUSY || primary_code == SQLITE_LOCKED {
                    Self::TransientError(db_err.message().to_string())
                } else if db_err.is_unique_violation() ||
                    db_err.is_check_violation() ||
                    db_err.is_foreign_key_violation()
                {
                    Self::IntegrityError(db_err.message().to_string())
                } else {
                    Self::DatabaseError(e.to_string())
                }
            },
            _ => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for SettlementError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::DatabaseError(format!("Migration failed. {e}"))
    }
}

impl From<SignatureError> for SettlementError {
    fn from(e: SignatureError) -> Self {
        match e {
            SignatureError::AmountOutOfRange(_) => Self::ValidationError(e.to_string()),
            SignatureError::InvalidKey => Self::InternalError(e.to_string()),
        }
    }
}
