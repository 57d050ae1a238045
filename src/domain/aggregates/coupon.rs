//! Coupon Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{has_closed, is_whole_cents, lines_total, not_yet_open, percent_of, round_money, CouponCode};
use crate::{Result, StorefrontError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType { Percentage, Fixed }

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Percentage => "percentage", Self::Fixed => "fixed" }
    }
}

impl std::str::FromStr for DiscountType {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(StorefrontError::Validation(format!("unknown discount type '{}'", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub product_id: Option<Uuid>,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub minimum_order_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line as seen by the coupon engine: a price snapshot and a quantity.
#[derive(Clone, Debug, PartialEq)]
pub struct CartLine { pub product_id: Uuid, pub price: Decimal, pub quantity: u32 }

/// What the caller knows about the cart being discounted.
#[derive(Clone, Debug, Default)]
pub struct CartContext {
    pub order_total: Decimal,
    pub lines: Vec<CartLine>,
    /// Bare product references, used for scoping when no priced lines are sent.
    pub product_ids: Vec<Uuid>,
}

/// Editable coupon fields, already checked by [`CouponDraft::new`].
#[derive(Clone, Debug, PartialEq)]
pub struct CouponDraft {
    pub code: CouponCode,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub product_id: Option<Uuid>,
    pub max_uses: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub minimum_order_value: Decimal,
}

impl CouponDraft {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: &str, discount_type: DiscountType, discount_value: Decimal, product_id: Option<Uuid>,
        max_uses: Option<i32>, valid_from: Option<DateTime<Utc>>, valid_until: Option<DateTime<Utc>>,
        is_active: bool, minimum_order_value: Decimal,
    ) -> Result<Self> {
        let code = CouponCode::new(code).map_err(|e| StorefrontError::Validation(e.to_string()))?;
        if discount_value.is_sign_negative() {
            return Err(StorefrontError::Validation("discountValue must not be negative".into()));
        }
        if discount_type == DiscountType::Percentage && discount_value > Decimal::ONE_HUNDRED {
            return Err(StorefrontError::Validation("percentage discountValue must be between 0 and 100".into()));
        }
        if !is_whole_cents(discount_value) || !is_whole_cents(minimum_order_value) {
            return Err(StorefrontError::Validation("amounts allow at most two decimal places".into()));
        }
        if max_uses.is_some_and(|m| m < 1) {
            return Err(StorefrontError::Validation("maxUses must be at least 1".into()));
        }
        if minimum_order_value.is_sign_negative() {
            return Err(StorefrontError::Validation("minimumOrderValue must not be negative".into()));
        }
        if let (Some(from), Some(until)) = (valid_from, valid_until) {
            if from > until {
                return Err(StorefrontError::Validation("validFrom must not be after validUntil".into()));
            }
        }
        Ok(Self { code, discount_type, discount_value, product_id, max_uses, valid_from, valid_until, is_active, minimum_order_value })
    }
}

/// Usage and expiry snapshot for support/debug screens.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponStatus {
    pub code: String,
    pub is_active: bool,
    pub current_uses: i32,
    pub max_uses: Option<i32>,
    pub remaining_uses: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub is_not_yet_valid: bool,
    pub is_usage_limit_reached: bool,
    pub is_usable: bool,
}

impl Coupon {
    pub fn create(draft: CouponDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), code: draft.code.into_inner(), discount_type: draft.discount_type,
            discount_value: draft.discount_value, product_id: draft.product_id, max_uses: draft.max_uses,
            current_uses: 0, valid_from: draft.valid_from, valid_until: draft.valid_until,
            is_active: draft.is_active, minimum_order_value: draft.minimum_order_value,
            created_at: now, updated_at: now,
        }
    }

    /// Replaces the editable fields. Usage accounting is left untouched.
    pub fn apply(&mut self, draft: CouponDraft) {
        self.code = draft.code.into_inner();
        self.discount_type = draft.discount_type;
        self.discount_value = draft.discount_value;
        self.product_id = draft.product_id;
        self.max_uses = draft.max_uses;
        self.valid_from = draft.valid_from;
        self.valid_until = draft.valid_until;
        self.is_active = draft.is_active;
        self.minimum_order_value = draft.minimum_order_value;
        self.updated_at = Utc::now();
    }

    pub fn usage_limit_reached(&self) -> bool {
        self.max_uses.is_some_and(|max| self.current_uses >= max)
    }

    /// Dry-run discount computation. Checks run in a fixed order and stop at the first failure.
    pub fn evaluate(&self, cart: &CartContext, now: DateTime<Utc>) -> Result<Decimal> {
        if !self.is_active { return Err(StorefrontError::coupon_not_found()); }
        if not_yet_open(self.valid_from, now) { return Err(StorefrontError::NotYetValid); }
        if has_closed(self.valid_until, now) { return Err(StorefrontError::Expired); }
        if let Some(max_uses) = self.max_uses {
            if self.current_uses >= max_uses {
                return Err(StorefrontError::UsageLimitReached { current_uses: self.current_uses, max_uses });
            }
        }

        let subtotal = self.applicable_subtotal(cart)?;
        if subtotal < self.minimum_order_value {
            return Err(StorefrontError::BelowMinimum { minimum_order_value: self.minimum_order_value });
        }

        let raw = match self.discount_type {
            DiscountType::Percentage => percent_of(subtotal, self.discount_value)?,
            DiscountType::Fixed => self.discount_value,
        };
        Ok(round_money(raw).min(subtotal).max(Decimal::ZERO))
    }

    fn applicable_subtotal(&self, cart: &CartContext) -> Result<Decimal> {
        let Some(product_id) = self.product_id else { return Ok(cart.order_total); };

        if !cart.lines.is_empty() {
            let matching: Vec<&CartLine> = cart.lines.iter().filter(|l| l.product_id == product_id).collect();
            if matching.is_empty() { return Err(StorefrontError::NotApplicable); }
            return lines_total(matching.iter().map(|l| (l.price, l.quantity)));
        }
        if cart.product_ids.contains(&product_id) {
            return Ok(cart.order_total);
        }
        Err(StorefrontError::NotApplicable)
    }

    pub fn status(&self, now: DateTime<Utc>) -> CouponStatus {
        let is_expired = has_closed(self.valid_until, now);
        let is_not_yet_valid = not_yet_open(self.valid_from, now);
        let is_usage_limit_reached = self.usage_limit_reached();
        CouponStatus {
            code: self.code.clone(),
            is_active: self.is_active,
            current_uses: self.current_uses,
            max_uses: self.max_uses,
            remaining_uses: self.max_uses.map(|max| (max - self.current_uses).max(0)),
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            is_expired,
            is_not_yet_valid,
            is_usage_limit_reached,
            is_usable: self.is_active && !is_expired && !is_not_yet_valid && !is_usage_limit_reached,
        }
    }
}
