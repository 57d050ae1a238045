//! Order Aggregate
//!
//! An order is an immutable financial record once created. Only its three
//! status axes (fulfillment, payment, delivery) change afterwards, and each
//! axis is written independently of the others.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{is_whole_cents, lines_total, round_money, sum_money, OrderNumber};
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub order_id: String,
    pub user_id: String,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub discount: Decimal,
    pub total_price: Decimal,
    pub coupon_id: Option<Uuid>,
    pub coupon_code: Option<String>,
    pub status: FulfillmentStatus,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantSelection>,
}

/// One chosen option of a product variant, e.g. `size = "M"`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariantSelection { pub name: String, pub value: String }

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress { pub address: String, pub city: String, pub postal_code: String, pub country: String }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus { #[default] Pending, Processing, Shipped, Completed, Cancelled }

impl FulfillmentStatus {
    pub const ALL: [FulfillmentStatus; 5] = [Self::Pending, Self::Processing, Self::Shipped, Self::Completed, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for FulfillmentStatus {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| StorefrontError::InvalidStatus(s.to_string()))
    }
}

/// UI selector combining the delivery flag and the shipped status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKey { None, Shipped, Delivered }

impl std::str::FromStr for DeliveryKey {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            other => Err(StorefrontError::InvalidStatus(other.to_string())),
        }
    }
}

/// Payment axis value: `paid_at` is set exactly when `is_paid` is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentState { pub is_paid: bool, pub paid_at: Option<DateTime<Utc>> }

impl PaymentState {
    pub fn resolve(is_paid: bool, paid_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self { is_paid, paid_at: if is_paid { Some(paid_at.unwrap_or(now)) } else { None } }
    }
}

/// Delivery axis value, stamped like [`PaymentState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeliveryState { pub is_delivered: bool, pub delivered_at: Option<DateTime<Utc>> }

impl DeliveryState {
    pub fn resolve(is_delivered: bool, delivered_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self { is_delivered, delivered_at: if is_delivered { Some(delivered_at.unwrap_or(now)) } else { None } }
    }
}

/// Field writes a delivery key selection expands to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeliveryKeyChange { pub delivery: Option<DeliveryState>, pub status: FulfillmentStatus }

impl DeliveryKey {
    pub fn plan(self, now: DateTime<Utc>) -> DeliveryKeyChange {
        match self {
            Self::None => DeliveryKeyChange { delivery: Some(DeliveryState::resolve(false, None, now)), status: FulfillmentStatus::Pending },
            Self::Shipped => DeliveryKeyChange { delivery: None, status: FulfillmentStatus::Shipped },
            Self::Delivered => DeliveryKeyChange { delivery: Some(DeliveryState::resolve(true, None, now)), status: FulfillmentStatus::Completed },
        }
    }
}

/// Totals computed once at checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderPricing { pub items_price: Decimal, pub shipping_price: Decimal, pub tax_price: Decimal, pub discount: Decimal, pub total_price: Decimal }

impl OrderPricing {
    pub fn compute(items: &[OrderItem], shipping_price: Decimal, tax_price: Decimal, discount: Decimal) -> Result<Self> {
        let items_price = round_money(lines_total(items.iter().map(|i| (i.price, i.quantity)))?);
        let gross = sum_money([Ok(items_price), Ok(shipping_price), Ok(tax_price)])?;
        let net = gross.checked_sub(discount).ok_or_else(StorefrontError::amount_out_of_range)?;
        let total_price = round_money(net).max(Decimal::ZERO);
        Ok(Self { items_price, shipping_price, tax_price, discount, total_price })
    }
}

/// Coupon applied at checkout.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedCoupon { pub coupon_id: Uuid, pub code: String, pub discount: Decimal }

#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub coupon: Option<AppliedCoupon>,
}

impl Order {
    pub fn create(draft: OrderDraft) -> Result<Self> {
        if draft.items.is_empty() { return Err(StorefrontError::Validation("orderItems must not be empty".into())); }
        if draft.items.iter().any(|i| i.quantity == 0 || i.price.is_sign_negative()) {
            return Err(StorefrontError::Validation("order items need a positive quantity and a non-negative price".into()));
        }
        for charge in [draft.shipping_price, draft.tax_price] {
            if charge.is_sign_negative() || !is_whole_cents(charge) {
                return Err(StorefrontError::Validation("shippingPrice and taxPrice must be non-negative with at most two decimal places".into()));
            }
        }
        let discount = draft.coupon.as_ref().map(|c| c.discount).unwrap_or(Decimal::ZERO);
        let pricing = OrderPricing::compute(&draft.items, draft.shipping_price, draft.tax_price, discount)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), order_id: OrderNumber::generate().into_inner(), user_id: draft.user_id,
            order_items: draft.items, shipping_address: draft.shipping_address, payment_method: draft.payment_method,
            items_price: pricing.items_price, shipping_price: pricing.shipping_price, tax_price: pricing.tax_price,
            discount: pricing.discount, total_price: pricing.total_price,
            coupon_id: draft.coupon.as_ref().map(|c| c.coupon_id), coupon_code: draft.coupon.map(|c| c.code),
            status: FulfillmentStatus::Pending, is_paid: false, paid_at: None, is_delivered: false, delivered_at: None,
            created_at: now, updated_at: now,
        })
    }

    pub fn delivery_key(&self) -> DeliveryKey {
        if self.is_delivered { DeliveryKey::Delivered }
        else if self.status == FulfillmentStatus::Shipped { DeliveryKey::Shipped }
        else { DeliveryKey::None }
    }

    pub fn set_status(&mut self, status: FulfillmentStatus) { self.status = status; self.touch(); }
    pub fn set_payment(&mut self, payment: PaymentState) { self.is_paid = payment.is_paid; self.paid_at = payment.paid_at; self.touch(); }
    pub fn set_delivery(&mut self, delivery: DeliveryState) { self.is_delivered = delivery.is_delivered; self.delivered_at = delivery.delivered_at; self.touch(); }

    pub fn apply_delivery_key(&mut self, change: DeliveryKeyChange) {
        if let Some(delivery) = change.delivery { self.set_delivery(delivery); }
        self.set_status(change.status);
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal { s.parse().unwrap() }

    fn draft() -> OrderDraft {
        OrderDraft {
            user_id: "CUST001".into(),
            items: vec![OrderItem { product_id: Uuid::new_v4(), name: "Widget".into(), price: dec("10"), quantity: 2, variants: vec![] }],
            shipping_address: ShippingAddress::default(),
            payment_method: "card".into(),
            shipping_price: dec("4.99"),
            tax_price: dec("2"),
            coupon: None,
        }
    }

    #[test]
    fn test_order_creation_totals() {
        let mut d = draft();
        d.coupon = Some(AppliedCoupon { coupon_id: Uuid::new_v4(), code: "SAVE10".into(), discount: dec("2") });
        let order = Order::create(d).unwrap();
        assert_eq!(order.items_price, dec("20"));
        assert_eq!(order.total_price, dec("24.99"));
        assert_eq!(order.status, FulfillmentStatus::Pending);
        assert!(!order.is_paid && !order.is_delivered);
        assert_eq!(order.coupon_code.as_deref(), Some("SAVE10"));
    }

    #[test]
    fn test_overflowing_totals_rejected() {
        let mut d = draft();
        d.items[0].price = Decimal::from_scientific("5e28").unwrap();
        d.items[0].quantity = 1000;
        assert!(matches!(Order::create(d), Err(StorefrontError::Validation(_))));

        let mut d = draft();
        d.items[0].price = Decimal::MAX;
        d.items[0].quantity = 1;
        assert!(matches!(Order::create(d), Err(StorefrontError::Validation(_))));
    }

    #[test]
    fn test_sub_cent_charges_rejected() {
        let mut d = draft();
        d.tax_price = dec("1.005");
        assert!(matches!(Order::create(d), Err(StorefrontError::Validation(_))));
    }

    #[test]
    fn test_empty_order_rejected() {
        let mut d = draft();
        d.items.clear();
        assert!(matches!(Order::create(d), Err(StorefrontError::Validation(_))));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("shipped".parse::<FulfillmentStatus>().unwrap(), FulfillmentStatus::Shipped);
        assert!(matches!("lost".parse::<FulfillmentStatus>(), Err(StorefrontError::InvalidStatus(_))));
        assert!(matches!("Shipped".parse::<FulfillmentStatus>(), Err(StorefrontError::InvalidStatus(_))));
    }

    #[test]
    fn test_payment_stamping() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::hours(3);
        assert_eq!(PaymentState::resolve(true, None, now).paid_at, Some(now));
        assert_eq!(PaymentState::resolve(true, Some(earlier), now).paid_at, Some(earlier));
        assert_eq!(PaymentState::resolve(false, Some(earlier), now).paid_at, None);
    }

    #[test]
    fn test_payment_leaves_other_axes() {
        let mut order = Order::create(draft()).unwrap();
        order.set_status(FulfillmentStatus::Processing);
        order.set_payment(PaymentState::resolve(true, None, Utc::now()));
        assert_eq!(order.status, FulfillmentStatus::Processing);
        assert!(!order.is_delivered);
        assert!(order.is_paid && order.paid_at.is_some());
    }

    #[test]
    fn test_backwards_transition_allowed() {
        let mut order = Order::create(draft()).unwrap();
        order.set_status(FulfillmentStatus::Completed);
        order.set_status(FulfillmentStatus::Pending);
        assert_eq!(order.status, FulfillmentStatus::Pending);
    }

    #[test]
    fn test_delivery_key_workflow() {
        let now = Utc::now();
        let mut order = Order::create(draft()).unwrap();
        assert_eq!(order.delivery_key(), DeliveryKey::None);

        order.apply_delivery_key(DeliveryKey::Shipped.plan(now));
        assert_eq!(order.status, FulfillmentStatus::Shipped);
        assert_eq!(order.delivery_key(), DeliveryKey::Shipped);

        order.apply_delivery_key(DeliveryKey::Delivered.plan(now));
        assert!(order.is_delivered);
        assert_eq!(order.delivered_at, Some(now));
        assert_eq!(order.status, FulfillmentStatus::Completed);
        assert_eq!(order.delivery_key(), DeliveryKey::Delivered);

        order.apply_delivery_key(DeliveryKey::None.plan(now));
        assert!(!order.is_delivered);
        assert_eq!(order.delivered_at, None);
        assert_eq!(order.status, FulfillmentStatus::Pending);
    }
}
