//! Order state tracker: checkout and the three independent status axes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{CouponService, EventPublisher};
use crate::domain::aggregates::{
    AppliedCoupon, CartContext, CartLine, DeliveryKey, DeliveryState, FulfillmentStatus, Order, OrderDraft, OrderItem,
    PaymentState, ShippingAddress,
};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::lines_total;
use crate::store::OrderStore;
use crate::{Result, StorefrontError};

/// Checkout input before any coupon has been priced in.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteResult {
    pub id: Uuid,
    pub deleted: bool,
    pub message: String,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    coupons: CouponService,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, coupons: CouponService, events: EventPublisher) -> Self {
        Self { store, coupons, events }
    }

    /// Creates a pending, unpaid order. Coupon usage is committed later, on payment.
    pub async fn create(&self, checkout: Checkout) -> Result<Order> {
        let coupon = match checkout.coupon_code.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(code) => {
                let cart = CartContext {
                    order_total: lines_total(checkout.items.iter().map(|i| (i.price, i.quantity)))?,
                    lines: checkout.items.iter().map(|i| CartLine { product_id: i.product_id, price: i.price, quantity: i.quantity }).collect(),
                    product_ids: vec![],
                };
                let quote = self.coupons.validate(code, &cart).await?;
                Some(AppliedCoupon { coupon_id: quote.coupon.id, code: quote.coupon.code, discount: quote.discount })
            }
            None => None,
        };

        let order = Order::create(OrderDraft {
            user_id: checkout.user_id, items: checkout.items, shipping_address: checkout.shipping_address,
            payment_method: checkout.payment_method, shipping_price: checkout.shipping_price,
            tax_price: checkout.tax_price, coupon,
        })?;
        self.store.insert(&order).await?;
        tracing::info!(order_id = %order.id, order_number = %order.order_id, total = %order.total_price, coupon = ?order.coupon_code, "order created");
        self.events.publish(DomainEvent::Order(OrderEvent::Created { order_id: order.id, order_number: order.order_id.clone(), total: order.total_price })).await;
        Ok(order)
    }

    pub async fn get(&self, id: Uuid) -> Result<Order> {
        self.store.get(id).await?.ok_or_else(StorefrontError::order_not_found)
    }

    pub async fn list(&self) -> Result<Vec<Order>> { self.store.list().await }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>> { self.store.list_for_user(user_id).await }

    /// Any listed status may follow any other, so admins can correct mistakes.
    pub async fn set_fulfillment_status(&self, id: Uuid, status: &str) -> Result<Order> {
        let status: FulfillmentStatus = status.parse()?;
        let order = self.store.set_status(id, status).await?.ok_or_else(StorefrontError::order_not_found)?;
        tracing::info!(order_id = %id, status = status.as_str(), "order status updated");
        self.events.publish(DomainEvent::Order(OrderEvent::StatusChanged { order_id: id, status })).await;
        Ok(order)
    }

    pub async fn set_payment_status(&self, id: Uuid, is_paid: bool, paid_at: Option<DateTime<Utc>>) -> Result<Order> {
        let payment = PaymentState::resolve(is_paid, paid_at, Utc::now());
        let order = self.store.set_payment(id, payment).await?.ok_or_else(StorefrontError::order_not_found)?;
        tracing::info!(order_id = %id, is_paid, "order payment updated");
        self.events.publish(DomainEvent::Order(OrderEvent::PaymentChanged { order_id: id, is_paid, paid_at: payment.paid_at })).await;
        Ok(order)
    }

    /// Marks the order paid on a gateway confirmation. An order already paid is left as is.
    pub async fn confirm_payment(&self, id: Uuid) -> Result<Order> {
        let (order, changed) = self.store.mark_paid(id, Utc::now()).await?.ok_or_else(StorefrontError::order_not_found)?;
        if changed {
            tracing::info!(order_id = %id, "order marked paid");
            self.events.publish(DomainEvent::Order(OrderEvent::PaymentChanged { order_id: id, is_paid: true, paid_at: order.paid_at })).await;
        }
        Ok(order)
    }

    pub async fn set_delivery_status(&self, id: Uuid, is_delivered: bool, delivered_at: Option<DateTime<Utc>>) -> Result<Order> {
        let delivery = DeliveryState::resolve(is_delivered, delivered_at, Utc::now());
        let order = self.store.set_delivery(id, delivery).await?.ok_or_else(StorefrontError::order_not_found)?;
        tracing::info!(order_id = %id, is_delivered, "order delivery updated");
        self.events.publish(DomainEvent::Order(OrderEvent::DeliveryChanged { order_id: id, is_delivered, delivered_at: delivery.delivered_at })).await;
        Ok(order)
    }

    /// Applies a UI delivery key. `none` also resets fulfillment to pending.
    pub async fn set_delivery_key(&self, id: Uuid, key: &str) -> Result<Order> {
        let key: DeliveryKey = key.parse()?;
        let change = key.plan(Utc::now());
        let order = self.store.apply_delivery_key(id, change).await?.ok_or_else(StorefrontError::order_not_found)?;
        tracing::info!(order_id = %id, delivery_key = ?key, status = order.status.as_str(), "order delivery key applied");
        self.events.publish(DomainEvent::Order(OrderEvent::StatusChanged { order_id: id, status: order.status })).await;
        if let Some(d) = change.delivery {
            self.events.publish(DomainEvent::Order(OrderEvent::DeliveryChanged { order_id: id, is_delivered: d.is_delivered, delivered_at: d.delivered_at })).await;
        }
        Ok(order)
    }

    /// Deletes unconditionally. Coupon usage consumed by the order is kept.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.store.delete(id).await? { return Err(StorefrontError::order_not_found()); }
        tracing::info!(order_id = %id, "order deleted");
        self.events.publish(DomainEvent::Order(OrderEvent::Deleted { order_id: id })).await;
        Ok(())
    }

    /// Deletes each order on its own; one failure does not stop the rest.
    pub async fn bulk_delete(&self, ids: &[Uuid]) -> Vec<BulkDeleteResult> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            let result = match self.delete(id).await {
                Ok(()) => BulkDeleteResult { id, deleted: true, message: "Order deleted".into() },
                Err(StorefrontError::Storage(e)) => {
                    tracing::error!(order_id = %id, error = %e, "bulk delete failed for order");
                    BulkDeleteResult { id, deleted: false, message: "Internal server error".into() }
                }
                Err(e) => BulkDeleteResult { id, deleted: false, message: e.to_string() },
            };
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn dec(s: &str) -> Decimal { s.parse().unwrap() }

    fn service() -> OrderService {
        let store = Arc::new(MemoryStore::new());
        let coupons = CouponService::new(store.clone(), store.clone(), EventPublisher::disabled());
        OrderService::new(store, coupons, EventPublisher::disabled())
    }

    fn checkout() -> Checkout {
        Checkout {
            user_id: "u1".into(),
            items: vec![OrderItem { product_id: Uuid::new_v4(), name: "Mug".into(), price: dec("12.5"), quantity: 2, variants: vec![] }],
            shipping_address: ShippingAddress::default(),
            payment_method: "card".into(),
            shipping_price: dec("3"),
            tax_price: dec("0"),
            coupon_code: None,
        }
    }

    #[tokio::test]
    async fn test_setters_touch_only_their_axis() {
        let svc = service();
        let order = svc.create(checkout()).await.unwrap();
        svc.set_fulfillment_status(order.id, "processing").await.unwrap();
        let paid = svc.set_payment_status(order.id, true, None).await.unwrap();
        assert_eq!(paid.status, FulfillmentStatus::Processing);
        assert!(!paid.is_delivered);
        assert!(paid.paid_at.is_some());

        let unpaid = svc.set_payment_status(order.id, false, None).await.unwrap();
        assert!(!unpaid.is_paid && unpaid.paid_at.is_none());
        assert_eq!(unpaid.total_price, dec("28"));
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let svc = service();
        let order = svc.create(checkout()).await.unwrap();
        assert!(matches!(svc.set_fulfillment_status(order.id, "teleported").await, Err(StorefrontError::InvalidStatus(_))));
        assert!(matches!(svc.set_delivery_key(order.id, "lost").await, Err(StorefrontError::InvalidStatus(_))));
    }

    #[tokio::test]
    async fn test_delivered_key_completes_order() {
        let svc = service();
        let order = svc.create(checkout()).await.unwrap();
        let updated = svc.set_delivery_key(order.id, "delivered").await.unwrap();
        assert!(updated.is_delivered);
        assert_eq!(updated.status, FulfillmentStatus::Completed);
        assert!(!updated.is_paid);
    }

    #[tokio::test]
    async fn test_bulk_delete_reports_each_id() {
        let svc = service();
        let a = svc.create(checkout()).await.unwrap();
        let missing = Uuid::new_v4();
        let b = svc.create(checkout()).await.unwrap();
        let results = svc.bulk_delete(&[a.id, missing, b.id]).await;
        assert_eq!(results.iter().map(|r| r.deleted).collect::<Vec<_>>(), vec![true, false, true]);
        assert_eq!(results[1].message, "Order not found");
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_order() {
        let svc = service();
        assert!(matches!(svc.set_payment_status(Uuid::new_v4(), true, None).await, Err(StorefrontError::NotFound(_))));
    }
}
