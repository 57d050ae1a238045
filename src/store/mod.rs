//! Persistence seam.
//!
//! Each trait covers one collaborator of the core. Implementations must keep
//! the counter and status writes narrow: a coupon redemption is a single
//! conditional increment, and each order setter touches only its own columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::aggregates::{Coupon, DeliveryKeyChange, DeliveryState, FulfillmentStatus, Order, PaymentState};
use crate::domain::value_objects::CouponCode;
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Outcome of a usage increment.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub coupon: Coupon,
    /// False when the order had already been counted and nothing changed.
    pub recorded: bool,
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Coupon>>;
    async fn get(&self, id: Uuid) -> Result<Option<Coupon>>;
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>>;
    /// Fails with `Validation` when the code is taken.
    async fn insert(&self, coupon: &Coupon) -> Result<()>;
    /// Writes the editable fields; `current_uses` is never overwritten.
    async fn update(&self, coupon: &Coupon) -> Result<Option<Coupon>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    /// Increments `current_uses` only while it is below `max_uses`.
    ///
    /// With an `order_id`, the increment is recorded in the usage ledger and a
    /// repeated call for the same order is a no-op.
    async fn redeem(&self, id: Uuid, order_id: Option<Uuid>) -> Result<Redemption>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Order>>;
    async fn list(&self) -> Result<Vec<Order>>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>>;
    async fn set_status(&self, id: Uuid, status: FulfillmentStatus) -> Result<Option<Order>>;
    async fn set_payment(&self, id: Uuid, payment: PaymentState) -> Result<Option<Order>>;
    /// Marks the order paid at `paid_at` only while it is still unpaid, so the
    /// first confirmation keeps its stamp. The flag is true when this call changed it.
    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> Result<Option<(Order, bool)>>;
    async fn set_delivery(&self, id: Uuid, delivery: DeliveryState) -> Result<Option<Order>>;
    /// Writes both axes of a delivery key selection in one update.
    async fn apply_delivery_key(&self, id: Uuid, change: DeliveryKeyChange) -> Result<Option<Order>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Read-only view of the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn exists(&self, product_id: Uuid) -> Result<bool>;
}

/// Processed payment gateway events.
#[async_trait]
pub trait PaymentEventLog: Send + Sync {
    async fn seen(&self, event_id: &str) -> Result<bool>;
    /// Returns false when the event was already recorded.
    async fn record(&self, event_id: &str) -> Result<bool>;
}
