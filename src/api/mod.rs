//! HTTP surface.

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::{CouponService, EventPublisher, OrderService, PaymentService};
use crate::store::{CouponStore, MemoryStore, OrderStore, PaymentEventLog, ProductCatalog};

pub mod auth;
pub mod coupons;
pub mod dto;
pub mod error;
pub mod extract;
pub mod orders;
pub mod payments;

#[derive(Clone)]
pub struct AppState {
    pub coupons: CouponService,
    pub orders: OrderService,
    pub payments: PaymentService,
}

impl AppState {
    pub fn new(
        coupon_store: Arc<dyn CouponStore>,
        order_store: Arc<dyn OrderStore>,
        catalog: Arc<dyn ProductCatalog>,
        payment_log: Arc<dyn PaymentEventLog>,
        events: EventPublisher,
    ) -> Self {
        let coupons = CouponService::new(coupon_store, catalog, events.clone());
        let orders = OrderService::new(order_store, coupons.clone(), events);
        let payments = PaymentService::new(orders.clone(), coupons.clone(), payment_log);
        Self { coupons, orders, payments }
    }

    /// Every collaborator backed by one in-process store.
    pub fn in_memory(store: Arc<MemoryStore>, events: EventPublisher) -> Self {
        Self::new(store.clone(), store.clone(), store.clone(), store, events)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-core"})) }))
        .route("/api/coupons", get(coupons::list_coupons).post(coupons::create_coupon))
        .route("/api/coupons/validate", post(coupons::validate_coupon))
        .route("/api/coupons/status/:code", get(coupons::coupon_status))
        .route("/api/coupons/increment-by-code", post(coupons::increment_by_code))
        .route("/api/coupons/:id", get(coupons::get_coupon).put(coupons::update_coupon).delete(coupons::delete_coupon))
        .route("/api/coupons/:id/increment-usage", post(coupons::increment_usage))
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/mine", get(orders::my_orders))
        .route("/api/orders/bulk-delete", post(orders::bulk_delete_orders))
        .route("/api/orders/:id", get(orders::get_order).delete(orders::delete_order))
        .route("/api/orders/:id/status", put(orders::update_status))
        .route("/api/orders/:id/payment", put(orders::update_payment))
        .route("/api/orders/:id/delivery", put(orders::update_delivery))
        .route("/api/orders/:id/delivery-key", put(orders::update_delivery_key))
        .route("/api/payments/webhook", post(payments::gateway_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
