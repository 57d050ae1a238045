//! Payment gateway callbacks.
//!
//! Gateways deliver events at least once. An event already in the log is
//! acknowledged without touching the order. The steps themselves are also
//! safe to repeat: an order already paid keeps its original `paid_at`, and
//! coupon usage is keyed by the order ID.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{CouponService, OrderService};
use crate::store::PaymentEventLog;
use crate::{Result, StorefrontError};

const PAYMENT_SUCCEEDED: [&str; 2] = ["checkout.session.completed", "payment_intent.succeeded"];

/// Gateway event reduced to the fields the core reads.
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    pub id: String,
    pub event_type: String,
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    pub received: bool,
    pub duplicate: bool,
    pub ignored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct PaymentService {
    orders: OrderService,
    coupons: CouponService,
    log: Arc<dyn PaymentEventLog>,
}

impl PaymentService {
    pub fn new(orders: OrderService, coupons: CouponService, log: Arc<dyn PaymentEventLog>) -> Self {
        Self { orders, coupons, log }
    }

    pub async fn handle(&self, event: GatewayEvent) -> Result<WebhookOutcome> {
        if !PAYMENT_SUCCEEDED.contains(&event.event_type.as_str()) {
            tracing::debug!(event_id = %event.id, event_type = %event.event_type, "ignoring gateway event");
            return Ok(WebhookOutcome { received: true, duplicate: false, ignored: true, order_id: None });
        }
        if self.log.seen(&event.id).await? {
            tracing::info!(event_id = %event.id, "duplicate gateway event");
            return Ok(WebhookOutcome { received: true, duplicate: true, ignored: false, order_id: event.order_id });
        }
        let order_id = event.order_id
            .ok_or_else(|| StorefrontError::Validation("event metadata is missing orderId".into()))?;

        let order = self.orders.confirm_payment(order_id).await?;
        if let Some(coupon_id) = order.coupon_id {
            match self.coupons.increment_usage(coupon_id, Some(order.id)).await {
                Ok(_) => {}
                // Payment is already captured at this point, so the order stands.
                Err(e @ (StorefrontError::UsageLimitReached { .. } | StorefrontError::NotFound(_))) => {
                    tracing::warn!(order_id = %order.id, coupon_id = %coupon_id, error = %e, "coupon usage not counted for paid order");
                }
                Err(e) => return Err(e),
            }
        }

        // Recorded last: a delivery that failed above is retried in full.
        let fresh = self.log.record(&event.id).await?;
        tracing::info!(event_id = %event.id, order_id = %order_id, concurrent_duplicate = !fresh, "payment confirmed by gateway");
        Ok(WebhookOutcome { received: true, duplicate: !fresh, ignored: false, order_id: Some(order_id) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CouponDraft, DiscountType, OrderItem, ShippingAddress};
    use crate::services::{Checkout, EventPublisher};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_redelivered_event_counts_coupon_once() {
        let store = Arc::new(MemoryStore::new());
        let coupons = CouponService::new(store.clone(), store.clone(), EventPublisher::disabled());
        let orders = OrderService::new(store.clone(), coupons.clone(), EventPublisher::disabled());
        let payments = PaymentService::new(orders.clone(), coupons.clone(), store.clone());

        let coupon = coupons.create(CouponDraft::new("TEN", DiscountType::Fixed, Decimal::TEN, None, Some(5), None, None, true, Decimal::ZERO).unwrap()).await.unwrap();
        let order = orders.create(Checkout {
            user_id: "u1".into(),
            items: vec![OrderItem { product_id: Uuid::new_v4(), name: "Lamp".into(), price: Decimal::new(40, 0), quantity: 1, variants: vec![] }],
            shipping_address: ShippingAddress::default(),
            payment_method: "card".into(),
            shipping_price: Decimal::ZERO,
            tax_price: Decimal::ZERO,
            coupon_code: Some("ten".into()),
        }).await.unwrap();
        assert_eq!(order.total_price, Decimal::new(30, 0));

        let event = GatewayEvent { id: "evt_1".into(), event_type: "checkout.session.completed".into(), order_id: Some(order.id) };
        let first = payments.handle(event.clone()).await.unwrap();
        let paid_at = orders.get(order.id).await.unwrap().paid_at;
        let second = payments.handle(event).await.unwrap();

        assert!(!first.duplicate && second.duplicate);
        assert_eq!(coupons.get(coupon.id).await.unwrap().current_uses, 1);
        let order = orders.get(order.id).await.unwrap();
        assert!(order.is_paid);
        assert_eq!(order.paid_at, paid_at);
    }

    #[tokio::test]
    async fn test_redelivery_after_manual_unpay_changes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let coupons = CouponService::new(store.clone(), store.clone(), EventPublisher::disabled());
        let orders = OrderService::new(store.clone(), coupons.clone(), EventPublisher::disabled());
        let payments = PaymentService::new(orders.clone(), coupons, store.clone());

        let order = orders.create(Checkout {
            user_id: "u1".into(),
            items: vec![OrderItem { product_id: Uuid::new_v4(), name: "Vase".into(), price: Decimal::TEN, quantity: 1, variants: vec![] }],
            shipping_address: ShippingAddress::default(),
            payment_method: "card".into(),
            shipping_price: Decimal::ZERO,
            tax_price: Decimal::ZERO,
            coupon_code: None,
        }).await.unwrap();
        let event = GatewayEvent { id: "evt_9".into(), event_type: "payment_intent.succeeded".into(), order_id: Some(order.id) };
        payments.handle(event.clone()).await.unwrap();

        orders.set_payment_status(order.id, false, None).await.unwrap();
        let again = payments.handle(event.clone()).await.unwrap();
        assert!(again.duplicate);
        assert!(!orders.get(order.id).await.unwrap().is_paid);

        orders.delete(order.id).await.unwrap();
        assert!(payments.handle(event).await.unwrap().duplicate);
    }

    #[tokio::test]
    async fn test_second_success_event_keeps_first_stamp() {
        let store = Arc::new(MemoryStore::new());
        let coupons = CouponService::new(store.clone(), store.clone(), EventPublisher::disabled());
        let orders = OrderService::new(store.clone(), coupons.clone(), EventPublisher::disabled());
        let payments = PaymentService::new(orders.clone(), coupons, store.clone());

        let order = orders.create(Checkout {
            user_id: "u1".into(),
            items: vec![OrderItem { product_id: Uuid::new_v4(), name: "Bowl".into(), price: Decimal::TEN, quantity: 1, variants: vec![] }],
            shipping_address: ShippingAddress::default(),
            payment_method: "card".into(),
            shipping_price: Decimal::ZERO,
            tax_price: Decimal::ZERO,
            coupon_code: None,
        }).await.unwrap();

        payments.handle(GatewayEvent { id: "cs_1".into(), event_type: "checkout.session.completed".into(), order_id: Some(order.id) }).await.unwrap();
        let paid_at = orders.get(order.id).await.unwrap().paid_at;
        let second = payments.handle(GatewayEvent { id: "pi_1".into(), event_type: "payment_intent.succeeded".into(), order_id: Some(order.id) }).await.unwrap();
        assert!(!second.duplicate);
        assert_eq!(orders.get(order.id).await.unwrap().paid_at, paid_at);
    }

    #[tokio::test]
    async fn test_unhandled_event_ignored() {
        let store = Arc::new(MemoryStore::new());
        let coupons = CouponService::new(store.clone(), store.clone(), EventPublisher::disabled());
        let orders = OrderService::new(store.clone(), coupons.clone(), EventPublisher::disabled());
        let payments = PaymentService::new(orders, coupons, store);
        let outcome = payments.handle(GatewayEvent { id: "evt_2".into(), event_type: "charge.refunded".into(), order_id: None }).await.unwrap();
        assert!(outcome.ignored);
    }
}
