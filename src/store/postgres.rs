//! PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{CouponStore, OrderStore, PaymentEventLog, ProductCatalog, Redemption};
use crate::domain::aggregates::{
    Coupon, DeliveryKeyChange, DeliveryState, FulfillmentStatus, Order, OrderItem, PaymentState, ShippingAddress,
};
use crate::domain::value_objects::CouponCode;
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: Uuid, code: String, discount_type: String, discount_value: Decimal, product_id: Option<Uuid>,
    max_uses: Option<i32>, current_uses: i32, valid_from: Option<DateTime<Utc>>, valid_until: Option<DateTime<Utc>>,
    is_active: bool, minimum_order_value: Decimal, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = StorefrontError;

    fn try_from(r: CouponRow) -> Result<Self> {
        Ok(Coupon {
            id: r.id, code: r.code, discount_type: r.discount_type.parse()?, discount_value: r.discount_value,
            product_id: r.product_id, max_uses: r.max_uses, current_uses: r.current_uses, valid_from: r.valid_from,
            valid_until: r.valid_until, is_active: r.is_active, minimum_order_value: r.minimum_order_value,
            created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid, order_id: String, user_id: String, order_items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>, payment_method: String, items_price: Decimal, shipping_price: Decimal,
    tax_price: Decimal, discount: Decimal, total_price: Decimal, coupon_id: Option<Uuid>, coupon_code: Option<String>,
    status: String, is_paid: bool, paid_at: Option<DateTime<Utc>>, is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StorefrontError;

    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order {
            id: r.id, order_id: r.order_id, user_id: r.user_id, order_items: r.order_items.0,
            shipping_address: r.shipping_address.0, payment_method: r.payment_method, items_price: r.items_price,
            shipping_price: r.shipping_price, tax_price: r.tax_price, discount: r.discount, total_price: r.total_price,
            coupon_id: r.coupon_id, coupon_code: r.coupon_code, status: r.status.parse()?, is_paid: r.is_paid,
            paid_at: r.paid_at, is_delivered: r.is_delivered, delivered_at: r.delivered_at,
            created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

fn code_conflict(err: sqlx::Error) -> StorefrontError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StorefrontError::Validation("coupon code already exists".into());
        }
    }
    err.into()
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl CouponStore for PgStore {
    async fn list(&self) -> Result<Vec<Coupon>> {
        let rows = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons ORDER BY created_at DESC").fetch_all(&self.pool).await?;
        rows.into_iter().map(Coupon::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE id = $1").bind(id)
            .fetch_optional(&self.pool).await?.map(Coupon::try_from).transpose()
    }

    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE UPPER(code) = $1").bind(code.as_str())
            .fetch_optional(&self.pool).await?.map(Coupon::try_from).transpose()
    }

    async fn insert(&self, c: &Coupon) -> Result<()> {
        sqlx::query("INSERT INTO coupons (id, code, discount_type, discount_value, product_id, max_uses, current_uses, valid_from, valid_until, is_active, minimum_order_value, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)")
            .bind(c.id).bind(&c.code).bind(c.discount_type.as_str()).bind(c.discount_value).bind(c.product_id)
            .bind(c.max_uses).bind(c.current_uses).bind(c.valid_from).bind(c.valid_until).bind(c.is_active)
            .bind(c.minimum_order_value).bind(c.created_at).bind(c.updated_at)
            .execute(&self.pool).await.map_err(code_conflict)?;
        Ok(())
    }

    async fn update(&self, c: &Coupon) -> Result<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("UPDATE coupons SET code = $2, discount_type = $3, discount_value = $4, product_id = $5, max_uses = $6, valid_from = $7, valid_until = $8, is_active = $9, minimum_order_value = $10, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(c.id).bind(&c.code).bind(c.discount_type.as_str()).bind(c.discount_value).bind(c.product_id)
            .bind(c.max_uses).bind(c.valid_from).bind(c.valid_until).bind(c.is_active).bind(c.minimum_order_value)
            .fetch_optional(&self.pool).await.map_err(code_conflict)?.map(Coupon::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn redeem(&self, id: Uuid, order_id: Option<Uuid>) -> Result<Redemption> {
        let mut tx = self.pool.begin().await?;

        if let Some(order_id) = order_id {
            let (seen,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM coupon_redemptions WHERE coupon_id = $1 AND order_id = $2)")
                .bind(id).bind(order_id).fetch_one(&mut *tx).await?;
            if seen {
                tx.rollback().await?;
                let coupon = CouponStore::get(self, id).await?.ok_or_else(StorefrontError::coupon_not_found)?;
                return Ok(Redemption { coupon, recorded: false });
            }
        }

        // The cap is part of the filter, so two racing increments cannot both pass it.
        let row = sqlx::query_as::<_, CouponRow>("UPDATE coupons SET current_uses = current_uses + 1, updated_at = NOW() WHERE id = $1 AND (max_uses IS NULL OR current_uses < max_uses) RETURNING *")
            .bind(id).fetch_optional(&mut *tx).await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return match CouponStore::get(self, id).await? {
                None => Err(StorefrontError::coupon_not_found()),
                Some(c) => Err(StorefrontError::UsageLimitReached { current_uses: c.current_uses, max_uses: c.max_uses.unwrap_or(c.current_uses) }),
            };
        };

        if let Some(order_id) = order_id {
            let inserted = sqlx::query("INSERT INTO coupon_redemptions (coupon_id, order_id) VALUES ($1, $2) ON CONFLICT (coupon_id, order_id) DO NOTHING")
                .bind(id).bind(order_id).execute(&mut *tx).await?.rows_affected();
            if inserted == 0 {
                tx.rollback().await?;
                let coupon = CouponStore::get(self, id).await?.ok_or_else(StorefrontError::coupon_not_found)?;
                return Ok(Redemption { coupon, recorded: false });
            }
        }

        tx.commit().await?;
        Ok(Redemption { coupon: row.try_into()?, recorded: true })
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert(&self, o: &Order) -> Result<()> {
        sqlx::query("INSERT INTO orders (id, order_id, user_id, order_items, shipping_address, payment_method, items_price, shipping_price, tax_price, discount, total_price, coupon_id, coupon_code, status, is_paid, paid_at, is_delivered, delivered_at, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)")
            .bind(o.id).bind(&o.order_id).bind(&o.user_id).bind(Json(&o.order_items)).bind(Json(&o.shipping_address))
            .bind(&o.payment_method).bind(o.items_price).bind(o.shipping_price).bind(o.tax_price).bind(o.discount)
            .bind(o.total_price).bind(o.coupon_id).bind(&o.coupon_code).bind(o.status.as_str()).bind(o.is_paid)
            .bind(o.paid_at).bind(o.is_delivered).bind(o.delivered_at).bind(o.created_at).bind(o.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1").bind(id)
            .fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Order>> {
        into_orders(sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC").fetch_all(&self.pool).await?)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>> {
        into_orders(sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC").bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn set_status(&self, id: Uuid, status: FulfillmentStatus) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(status.as_str()).fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn set_payment(&self, id: Uuid, payment: PaymentState) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("UPDATE orders SET is_paid = $2, paid_at = $3, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(payment.is_paid).bind(payment.paid_at).fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> Result<Option<(Order, bool)>> {
        let row = sqlx::query_as::<_, OrderRow>("UPDATE orders SET is_paid = TRUE, paid_at = $2, updated_at = NOW() WHERE id = $1 AND is_paid = FALSE RETURNING *")
            .bind(id).bind(paid_at).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some((row.try_into()?, true))),
            None => Ok(OrderStore::get(self, id).await?.map(|order| (order, false))),
        }
    }

    async fn set_delivery(&self, id: Uuid, delivery: DeliveryState) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("UPDATE orders SET is_delivered = $2, delivered_at = $3, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(delivery.is_delivered).bind(delivery.delivered_at).fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn apply_delivery_key(&self, id: Uuid, change: DeliveryKeyChange) -> Result<Option<Order>> {
        let row = match change.delivery {
            Some(d) => sqlx::query_as::<_, OrderRow>("UPDATE orders SET status = $2, is_delivered = $3, delivered_at = $4, updated_at = NOW() WHERE id = $1 RETURNING *")
                .bind(id).bind(change.status.as_str()).bind(d.is_delivered).bind(d.delivered_at)
                .fetch_optional(&self.pool).await?,
            None => return self.set_status(id, change.status).await,
        };
        row.map(Order::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductCatalog for PgStore {
    async fn exists(&self, product_id: Uuid) -> Result<bool> {
        let (found,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id).fetch_one(&self.pool).await?;
        Ok(found)
    }
}

#[async_trait]
impl PaymentEventLog for PgStore {
    async fn seen(&self, event_id: &str) -> Result<bool> {
        let (found,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM payment_events WHERE event_id = $1)")
            .bind(event_id).fetch_one(&self.pool).await?;
        Ok(found)
    }

    async fn record(&self, event_id: &str) -> Result<bool> {
        let done = sqlx::query("INSERT INTO payment_events (event_id) VALUES ($1) ON CONFLICT (event_id) DO NOTHING")
            .bind(event_id).execute(&self.pool).await?;
        Ok(done.rows_affected() == 1)
    }
}
