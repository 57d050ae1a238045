//! Coupon engine: administration, dry-run validation and usage commits.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::EventPublisher;
use crate::domain::aggregates::{CartContext, Coupon, CouponDraft, CouponStatus};
use crate::domain::events::{CouponEvent, DomainEvent};
use crate::domain::value_objects::CouponCode;
use crate::store::{CouponStore, ProductCatalog, Redemption};
use crate::{Result, StorefrontError};

/// A successful validation: the coupon and the discount it would grant.
#[derive(Debug, Clone)]
pub struct CouponQuote {
    pub coupon: Coupon,
    pub discount: Decimal,
}

#[derive(Clone)]
pub struct CouponService {
    store: Arc<dyn CouponStore>,
    catalog: Arc<dyn ProductCatalog>,
    events: EventPublisher,
}

impl CouponService {
    pub fn new(store: Arc<dyn CouponStore>, catalog: Arc<dyn ProductCatalog>, events: EventPublisher) -> Self {
        Self { store, catalog, events }
    }

    pub async fn list(&self) -> Result<Vec<Coupon>> { self.store.list().await }

    pub async fn get(&self, id: Uuid) -> Result<Coupon> {
        self.store.get(id).await?.ok_or_else(StorefrontError::coupon_not_found)
    }

    pub async fn create(&self, draft: CouponDraft) -> Result<Coupon> {
        self.ensure_product(draft.product_id).await?;
        let coupon = Coupon::create(draft);
        self.store.insert(&coupon).await?;
        tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "coupon created");
        self.events.publish(DomainEvent::Coupon(CouponEvent::Created { coupon_id: coupon.id, code: coupon.code.clone() })).await;
        Ok(coupon)
    }

    pub async fn update(&self, id: Uuid, draft: CouponDraft) -> Result<Coupon> {
        self.ensure_product(draft.product_id).await?;
        let mut coupon = self.get(id).await?;
        coupon.apply(draft);
        let updated = self.store.update(&coupon).await?.ok_or_else(StorefrontError::coupon_not_found)?;
        tracing::info!(coupon_id = %id, code = %updated.code, "coupon updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.store.delete(id).await? { return Err(StorefrontError::coupon_not_found()); }
        tracing::info!(coupon_id = %id, "coupon deleted");
        Ok(())
    }

    /// Looks up a coupon by case-insensitive code, active or not.
    async fn find(&self, code: &str) -> Result<Coupon> {
        let code = CouponCode::new(code).map_err(|_| StorefrontError::coupon_not_found())?;
        self.store.find_by_code(&code).await?.ok_or_else(StorefrontError::coupon_not_found)
    }

    /// Computes the discount a coupon grants on `cart`. Read-only.
    pub async fn validate(&self, code: &str, cart: &CartContext) -> Result<CouponQuote> {
        let coupon = self.find(code).await?;
        match coupon.evaluate(cart, Utc::now()) {
            Ok(discount) => {
                tracing::debug!(code = %coupon.code, %discount, "coupon validated");
                Ok(CouponQuote { coupon, discount })
            }
            Err(e) => {
                tracing::debug!(code = %coupon.code, reason = e.kind(), "coupon rejected");
                Err(e)
            }
        }
    }

    pub async fn status(&self, code: &str) -> Result<CouponStatus> {
        Ok(self.find(code).await?.status(Utc::now()))
    }

    /// Commits one use of the coupon. Refused once the cap is reached.
    pub async fn increment_usage(&self, id: Uuid, order_id: Option<Uuid>) -> Result<Redemption> {
        let redemption = self.store.redeem(id, order_id).await.map_err(|e| {
            if let StorefrontError::UsageLimitReached { current_uses, max_uses } = &e {
                tracing::warn!(coupon_id = %id, current_uses, max_uses, "coupon usage limit reached");
            }
            e
        })?;
        if redemption.recorded {
            let c = &redemption.coupon;
            tracing::info!(coupon_id = %c.id, code = %c.code, current_uses = c.current_uses, order_id = ?order_id, "coupon usage incremented");
            self.events.publish(DomainEvent::Coupon(CouponEvent::Redeemed {
                coupon_id: c.id, code: c.code.clone(), current_uses: c.current_uses, order_id,
            })).await;
        } else {
            tracing::info!(coupon_id = %id, order_id = ?order_id, "coupon usage already counted for order");
        }
        Ok(redemption)
    }

    pub async fn increment_usage_by_code(&self, code: &str, order_id: Option<Uuid>) -> Result<Redemption> {
        let coupon = self.find(code).await?;
        self.increment_usage(coupon.id, order_id).await
    }

    async fn ensure_product(&self, product_id: Option<Uuid>) -> Result<()> {
        match product_id {
            Some(id) if !self.catalog.exists(id).await? => Err(StorefrontError::NotFound("Product not found".into())),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::DiscountType;
    use crate::store::MemoryStore;

    fn dec(s: &str) -> Decimal { s.parse().unwrap() }

    fn service() -> (CouponService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CouponService::new(store.clone(), store.clone(), EventPublisher::disabled()), store)
    }

    fn draft(code: &str, kind: DiscountType, value: &str, max_uses: Option<i32>) -> CouponDraft {
        CouponDraft::new(code, kind, dec(value), None, max_uses, None, None, true, Decimal::ZERO).unwrap()
    }

    #[tokio::test]
    async fn test_validate_is_case_insensitive_and_repeatable() {
        let (svc, _) = service();
        svc.create(draft("Save10", DiscountType::Percentage, "10", Some(100))).await.unwrap();
        let cart = CartContext { order_total: dec("50"), ..Default::default() };
        let first = svc.validate("save10", &cart).await.unwrap();
        let second = svc.validate("SAVE10", &cart).await.unwrap();
        assert_eq!(first.discount, dec("5"));
        assert_eq!(first.discount, second.discount);
        assert_eq!(second.coupon.current_uses, 0);
    }

    #[tokio::test]
    async fn test_n_increments_exhaust_cap() {
        let (svc, _) = service();
        let coupon = svc.create(draft("THREE", DiscountType::Fixed, "1", Some(3))).await.unwrap();
        for _ in 0..3 { svc.increment_usage(coupon.id, None).await.unwrap(); }
        assert!(matches!(svc.increment_usage(coupon.id, None).await, Err(StorefrontError::UsageLimitReached { .. })));
        let cart = CartContext { order_total: dec("10"), ..Default::default() };
        assert!(matches!(svc.validate("three", &cart).await, Err(StorefrontError::UsageLimitReached { current_uses: 3, max_uses: 3 })));
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let (svc, store) = service();
        let product = Uuid::new_v4();
        let mut d = draft("SCOPED", DiscountType::Fixed, "1", None);
        d.product_id = Some(product);
        assert!(matches!(svc.create(d.clone()).await, Err(StorefrontError::NotFound(_))));
        store.add_product(product).await;
        assert!(svc.create(d).await.is_ok());
    }

    #[tokio::test]
    async fn test_increment_by_missing_code() {
        let (svc, _) = service();
        assert!(matches!(svc.increment_usage_by_code("NOPE", None).await, Err(StorefrontError::NotFound(_))));
    }
}
