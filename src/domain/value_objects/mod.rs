//! Value Objects for the storefront core

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::StorefrontError;

/// Coupon code value object. Codes are case-insensitive and stored uppercase.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(String);

impl CouponCode {
    pub const MAX_LEN: usize = 50;

    pub fn new(value: impl Into<String>) -> Result<Self, CouponCodeError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(CouponCodeError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(CouponCodeError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CouponCodeError { Empty, TooLong }
impl std::error::Error for CouponCodeError {}
impl fmt::Display for CouponCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "coupon code must not be empty"),
            Self::TooLong => write!(f, "coupon code must be at most {} characters", CouponCode::MAX_LEN),
        }
    }
}

/// Human-readable order reference, random rather than sequential.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(|c| (c as char).to_ascii_uppercase())
            .collect();
        Self(format!("ORD-{}", suffix))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

// =============================================================================
// Money helpers
// =============================================================================

/// Rounds a currency amount to two decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// Amounts come from clients, so every operation that can overflow is checked.

pub fn line_total(price: Decimal, quantity: u32) -> crate::Result<Decimal> {
    price.checked_mul(Decimal::from(quantity)).ok_or_else(StorefrontError::amount_out_of_range)
}

/// Sum of `price * quantity` over `lines`.
pub fn lines_total(lines: impl IntoIterator<Item = (Decimal, u32)>) -> crate::Result<Decimal> {
    sum_money(lines.into_iter().map(|(price, quantity)| line_total(price, quantity)))
}

pub fn sum_money(amounts: impl IntoIterator<Item = crate::Result<Decimal>>) -> crate::Result<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount?).ok_or_else(StorefrontError::amount_out_of_range)
    })
}

/// `value` percent of `amount`.
pub fn percent_of(amount: Decimal, value: Decimal) -> crate::Result<Decimal> {
    amount.checked_mul(value)
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .or_else(|| (amount / Decimal::ONE_HUNDRED).checked_mul(value))
        .ok_or_else(StorefrontError::amount_out_of_range)
}

/// True when `amount` has no more than two decimal places.
pub fn is_whole_cents(amount: Decimal) -> bool {
    amount.normalize().scale() <= 2
}

// =============================================================================
// Date window helpers
// =============================================================================

/// True while `now` is before the window opens. The opening instant itself is valid.
pub fn not_yet_open(valid_from: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    valid_from.is_some_and(|from| from > now)
}

/// True once `now` has reached the closing instant. A window ending exactly now is closed.
pub fn has_closed(valid_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    valid_until.is_some_and(|until| until <= now)
}
