//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use storefront_core::api::{self, AppState};
use storefront_core::services::EventPublisher;
use storefront_core::store::MemoryStore;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN: (&str, &str) = ("admin-1", "admin");
pub const SHOPPER: (&str, &str) = ("shopper-1", "user");

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = api::router(AppState::in_memory(store.clone(), EventPublisher::disabled()));
        Self { router, store }
    }

    pub async fn request(&self, method: Method, uri: &str, caller: Option<(&str, &str)>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = caller {
            builder = builder.header("x-user-id", id).header("x-user-role", role);
        }
        let request = match body {
            Some(body) => builder.header("content-type", "application/json").body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = self.router.clone().oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body reads");
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, value)
    }

    pub async fn get(&self, uri: &str, caller: Option<(&str, &str)>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, caller, None).await
    }

    pub async fn post(&self, uri: &str, caller: Option<(&str, &str)>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, caller, Some(body)).await
    }

    pub async fn put(&self, uri: &str, caller: Option<(&str, &str)>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, caller, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, caller: Option<(&str, &str)>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, caller, None).await
    }

    /// Creates a coupon as admin and returns its JSON.
    pub async fn create_coupon(&self, body: Value) -> Value {
        let (status, coupon) = self.post("/api/coupons", Some(ADMIN), body).await;
        assert_eq!(status, StatusCode::CREATED, "coupon create failed: {}", coupon);
        coupon
    }

    /// Places a single-line order as the shopper.
    pub async fn place_order(&self, price: f64, quantity: u32, coupon_code: Option<&str>) -> Value {
        let mut body = json!({
            "orderItems": [{ "productId": Uuid::new_v4(), "name": "Teapot", "price": price, "quantity": quantity }],
            "shippingAddress": { "address": "1 High St", "city": "Leeds", "postalCode": "LS1 1AA", "country": "UK" },
            "paymentMethod": "card",
            "shippingPrice": 0,
            "taxPrice": 0
        });
        if let Some(code) = coupon_code {
            body["couponCode"] = json!(code);
        }
        let (status, order) = self.post("/api/orders", Some(SHOPPER), body).await;
        assert_eq!(status, StatusCode::CREATED, "order create failed: {}", order);
        order
    }
}

pub fn num(v: &Value) -> f64 {
    v.as_f64().unwrap_or_else(|| panic!("expected number, got {}", v))
}
