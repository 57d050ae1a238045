//! In-process store used by tests and `memory://` runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CouponStore, OrderStore, PaymentEventLog, ProductCatalog, Redemption};
use crate::domain::aggregates::{Coupon, DeliveryKeyChange, DeliveryState, FulfillmentStatus, Order, PaymentState};
use crate::domain::value_objects::CouponCode;
use crate::{Result, StorefrontError};

#[derive(Default)]
struct State {
    coupons: HashMap<Uuid, Coupon>,
    redemptions: HashSet<(Uuid, Uuid)>,
    orders: HashMap<Uuid, Order>,
    products: HashSet<Uuid>,
    payment_events: HashSet<String>,
}

/// All collections behind one lock, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn add_product(&self, product_id: Uuid) {
        self.state.write().await.products.insert(product_id);
    }

    async fn update_order<F: FnOnce(&mut Order)>(&self, id: Uuid, f: F) -> Result<Option<Order>> {
        let mut state = self.state.write().await;
        Ok(state.orders.get_mut(&id).map(|order| { f(order); order.clone() }))
    }
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
    items
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Coupon>> {
        let coupons = self.state.read().await.coupons.values().cloned().collect();
        Ok(newest_first(coupons, |c: &Coupon| c.created_at))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Coupon>> {
        Ok(self.state.read().await.coupons.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>> {
        Ok(self.state.read().await.coupons.values().find(|c| c.code == code.as_str()).cloned())
    }

    async fn insert(&self, coupon: &Coupon) -> Result<()> {
        let mut state = self.state.write().await;
        if state.coupons.values().any(|c| c.code == coupon.code) {
            return Err(StorefrontError::Validation("coupon code already exists".into()));
        }
        state.coupons.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn update(&self, coupon: &Coupon) -> Result<Option<Coupon>> {
        let mut state = self.state.write().await;
        if state.coupons.values().any(|c| c.code == coupon.code && c.id != coupon.id) {
            return Err(StorefrontError::Validation("coupon code already exists".into()));
        }
        Ok(state.coupons.get_mut(&coupon.id).map(|stored| {
            let current_uses = stored.current_uses;
            *stored = Coupon { current_uses, ..coupon.clone() };
            stored.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        state.redemptions.retain(|(coupon_id, _)| *coupon_id != id);
        Ok(state.coupons.remove(&id).is_some())
    }

    async fn redeem(&self, id: Uuid, order_id: Option<Uuid>) -> Result<Redemption> {
        let mut state = self.state.write().await;
        let State { coupons, redemptions, .. } = &mut *state;
        let coupon = coupons.get_mut(&id).ok_or_else(StorefrontError::coupon_not_found)?;

        if let Some(order_id) = order_id {
            if redemptions.contains(&(id, order_id)) {
                return Ok(Redemption { coupon: coupon.clone(), recorded: false });
            }
        }
        if let Some(max_uses) = coupon.max_uses {
            if coupon.current_uses >= max_uses {
                return Err(StorefrontError::UsageLimitReached { current_uses: coupon.current_uses, max_uses });
            }
        }
        coupon.current_uses += 1;
        coupon.updated_at = Utc::now();
        if let Some(order_id) = order_id {
            redemptions.insert((id, order_id));
        }
        Ok(Redemption { coupon: coupon.clone(), recorded: true })
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        self.state.write().await.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let orders = self.state.read().await.orders.values().cloned().collect();
        Ok(newest_first(orders, |o: &Order| o.created_at))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>> {
        let orders = self.state.read().await.orders.values().filter(|o| o.user_id == user_id).cloned().collect();
        Ok(newest_first(orders, |o: &Order| o.created_at))
    }

    async fn set_status(&self, id: Uuid, status: FulfillmentStatus) -> Result<Option<Order>> {
        self.update_order(id, |o| o.set_status(status)).await
    }

    async fn set_payment(&self, id: Uuid, payment: PaymentState) -> Result<Option<Order>> {
        self.update_order(id, |o| o.set_payment(payment)).await
    }

    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> Result<Option<(Order, bool)>> {
        let mut state = self.state.write().await;
        Ok(state.orders.get_mut(&id).map(|order| {
            let changed = !order.is_paid;
            if changed { order.set_payment(PaymentState { is_paid: true, paid_at: Some(paid_at) }); }
            (order.clone(), changed)
        }))
    }

    async fn set_delivery(&self, id: Uuid, delivery: DeliveryState) -> Result<Option<Order>> {
        self.update_order(id, |o| o.set_delivery(delivery)).await
    }

    async fn apply_delivery_key(&self, id: Uuid, change: DeliveryKeyChange) -> Result<Option<Order>> {
        self.update_order(id, |o| o.apply_delivery_key(change)).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.orders.remove(&id).is_some())
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn exists(&self, product_id: Uuid) -> Result<bool> {
        Ok(self.state.read().await.products.contains(&product_id))
    }
}

#[async_trait]
impl PaymentEventLog for MemoryStore {
    async fn seen(&self, event_id: &str) -> Result<bool> {
        Ok(self.state.read().await.payment_events.contains(event_id))
    }

    async fn record(&self, event_id: &str) -> Result<bool> {
        Ok(self.state.write().await.payment_events.insert(event_id.to_string()))
    }
}
