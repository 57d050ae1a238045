//! Request and response bodies.
//!
//! Bodies are checked here, at the boundary, before any value reaches the
//! services.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::aggregates::{
    CartContext, CartLine, CouponDraft, DeliveryKey, DiscountType, Order, OrderItem, ShippingAddress,
    VariantSelection,
};
use crate::services::{Checkout, CouponQuote, GatewayEvent};
use crate::{Result, StorefrontError};

fn non_negative(value: &Decimal) -> std::result::Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    Ok(())
}

fn default_true() -> bool { true }

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CouponRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub discount_type: DiscountType,
    #[validate(custom = "non_negative")]
    pub discount_value: Decimal,
    pub product_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    #[validate(custom = "non_negative")]
    pub minimum_order_value: Decimal,
}

impl CouponRequest {
    pub fn into_draft(self) -> Result<CouponDraft> {
        self.validate()?;
        CouponDraft::new(
            &self.code, self.discount_type, self.discount_value, self.product_id, self.max_uses,
            self.valid_from, self.valid_until, self.is_active, self.minimum_order_value,
        )
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: Uuid,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[serde(alias = "qty")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(custom = "non_negative")]
    pub order_total: Decimal,
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
    #[serde(default)]
    #[validate]
    pub cart_items: Vec<CartItemRequest>,
}

impl ValidateCouponRequest {
    pub fn cart(&self) -> CartContext {
        let mut product_ids = self.product_ids.clone();
        product_ids.extend(self.product_id);
        CartContext {
            order_total: self.order_total,
            lines: self.cart_items.iter().map(|i| CartLine { product_id: i.product_id, price: i.price, quantity: i.quantity }).collect(),
            product_ids,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotedCoupon {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub discount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    pub coupon: QuotedCoupon,
}

impl From<CouponQuote> for ValidateCouponResponse {
    fn from(q: CouponQuote) -> Self {
        Self {
            valid: true,
            coupon: QuotedCoupon {
                id: q.coupon.id, code: q.coupon.code, discount_type: q.coupon.discount_type,
                discount_value: q.coupon.discount_value, discount: q.discount,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementUsageRequest {
    /// Keys the increment so the same order is only counted once.
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IncrementByCodeRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self { Self { message: message.into() } }
}

// =============================================================================
// Orders
// =============================================================================

/// A variant choice as clients send it: a bare label or named options.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VariantInput {
    Label(String),
    Options(Vec<VariantSelection>),
}

impl VariantInput {
    fn into_selections(self) -> Vec<VariantSelection> {
        match self {
            Self::Label(value) => vec![VariantSelection { name: "variant".into(), value }],
            Self::Options(options) => options,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[serde(alias = "qty")]
    #[validate(range(min = 1))]
    pub quantity: u32,
    pub variant: Option<VariantInput>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate]
    pub order_items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[validate(length(min = 1))]
    pub payment_method: String,
    #[serde(default)]
    #[validate(custom = "non_negative")]
    pub shipping_price: Decimal,
    #[serde(default)]
    #[validate(custom = "non_negative")]
    pub tax_price: Decimal,
    pub coupon_code: Option<String>,
}

impl CreateOrderRequest {
    pub fn into_checkout(self, user_id: String) -> Result<Checkout> {
        self.validate()?;
        if self.order_items.is_empty() {
            return Err(StorefrontError::Validation("orderItems must not be empty".into()));
        }
        let items = self.order_items.into_iter().map(|i| OrderItem {
            product_id: i.product_id, name: i.name, price: i.price, quantity: i.quantity,
            variants: i.variant.map(VariantInput::into_selections).unwrap_or_default(),
        }).collect();
        Ok(Checkout {
            user_id, items, shipping_address: self.shipping_address, payment_method: self.payment_method,
            shipping_price: self.shipping_price, tax_price: self.tax_price, coupon_code: self.coupon_code,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryKeyRequest {
    pub delivery_key: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    #[validate(length(min = 1))]
    pub order_ids: Vec<Uuid>,
}

/// An order with its derived delivery key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub delivery_key: DeliveryKey,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let delivery_key = order.delivery_key();
        Self { order, delivery_key }
    }
}

// =============================================================================
// Payment gateway
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct GatewayEventRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: GatewayEventData,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewayEventData {
    #[serde(default)]
    pub object: GatewayEventObject,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewayEventObject {
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl TryFrom<GatewayEventRequest> for GatewayEvent {
    type Error = StorefrontError;

    fn try_from(r: GatewayEventRequest) -> Result<Self> {
        let order_id = r.data.object.metadata.get("orderId")
            .map(|raw| raw.parse::<Uuid>().map_err(|_| StorefrontError::Validation(format!("invalid orderId '{}'", raw))))
            .transpose()?;
        Ok(GatewayEvent { id: r.id, event_type: r.event_type, order_id })
    }
}
