//! Storefront Core
//!
//! Coupon engine and order status tracker for the storefront.
//!
//! ## Features
//! - Coupon validation (dry-run discount computation)
//! - Atomic, cap-aware coupon usage accounting with a per-order ledger
//! - Independent fulfillment / payment / delivery status axes on orders
//! - Idempotent payment gateway webhook handling

use rust_decimal::Decimal;
use thiserror::Error;

pub mod api;
pub mod config;
pub mod domain;
pub mod services;
pub mod store;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Coupon is not yet valid")]
    NotYetValid,

    #[error("Coupon has expired")]
    Expired,

    #[error("Coupon usage limit reached ({current_uses}/{max_uses})")]
    UsageLimitReached { current_uses: i32, max_uses: i32 },

    #[error("Coupon is not applicable to the products in this cart")]
    NotApplicable,

    #[error("Minimum order value of {minimum_order_value} not met")]
    BelowMinimum { minimum_order_value: Decimal },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl StorefrontError {
    pub fn coupon_not_found() -> Self {
        Self::NotFound("Coupon not found".to_string())
    }

    pub fn order_not_found() -> Self {
        Self::NotFound("Order not found".to_string())
    }

    pub fn amount_out_of_range() -> Self {
        Self::Validation("amount is out of range".to_string())
    }

    /// Machine-readable kind, echoed to clients in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::Validation(_) => "ValidationError",
            Self::NotYetValid => "NotYetValid",
            Self::Expired => "Expired",
            Self::UsageLimitReached { .. } => "UsageLimitReached",
            Self::NotApplicable => "NotApplicable",
            Self::BelowMinimum { .. } => "BelowMinimum",
            Self::InvalidStatus(_) => "InvalidStatus",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::Storage(_) => "StorageError",
        }
    }
}

impl From<sqlx::Error> for StorefrontError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StorefrontError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
