//! Order endpoints. Everything but checkout and own-order reads is admin-only.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::auth::{AdminCaller, Caller};
use super::dto::{BulkDeleteRequest, CreateOrderRequest, DeliveryKeyRequest, DeliveryRequest, MessageResponse, OrderResponse, PaymentRequest, StatusRequest};
use super::extract::{ApiJson, ApiPath};
use super::AppState;
use crate::services::BulkDeleteResult;
use crate::{Result, StorefrontError};

pub async fn create_order(State(s): State<AppState>, caller: Caller, ApiJson(r): ApiJson<CreateOrderRequest>) -> Result<(StatusCode, Json<OrderResponse>)> {
    let order = s.orders.create(r.into_checkout(caller.id)?).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

pub async fn list_orders(State(s): State<AppState>, _admin: AdminCaller) -> Result<Json<Vec<OrderResponse>>> {
    Ok(Json(s.orders.list().await?.into_iter().map(Into::into).collect()))
}

pub async fn my_orders(State(s): State<AppState>, caller: Caller) -> Result<Json<Vec<OrderResponse>>> {
    Ok(Json(s.orders.list_for_user(&caller.id).await?.into_iter().map(Into::into).collect()))
}

pub async fn get_order(State(s): State<AppState>, caller: Caller, ApiPath(id): ApiPath<Uuid>) -> Result<Json<OrderResponse>> {
    let order = s.orders.get(id).await?;
    if !caller.is_admin() && order.user_id != caller.id {
        return Err(StorefrontError::Forbidden("Not allowed to view this order".into()));
    }
    Ok(Json(order.into()))
}

pub async fn update_status(State(s): State<AppState>, _admin: AdminCaller, ApiPath(id): ApiPath<Uuid>, ApiJson(r): ApiJson<StatusRequest>) -> Result<Json<OrderResponse>> {
    Ok(Json(s.orders.set_fulfillment_status(id, &r.status).await?.into()))
}

pub async fn update_payment(State(s): State<AppState>, _admin: AdminCaller, ApiPath(id): ApiPath<Uuid>, ApiJson(r): ApiJson<PaymentRequest>) -> Result<Json<OrderResponse>> {
    Ok(Json(s.orders.set_payment_status(id, r.is_paid, r.paid_at).await?.into()))
}

pub async fn update_delivery(State(s): State<AppState>, _admin: AdminCaller, ApiPath(id): ApiPath<Uuid>, ApiJson(r): ApiJson<DeliveryRequest>) -> Result<Json<OrderResponse>> {
    Ok(Json(s.orders.set_delivery_status(id, r.is_delivered, r.delivered_at).await?.into()))
}

pub async fn update_delivery_key(State(s): State<AppState>, _admin: AdminCaller, ApiPath(id): ApiPath<Uuid>, ApiJson(r): ApiJson<DeliveryKeyRequest>) -> Result<Json<OrderResponse>> {
    Ok(Json(s.orders.set_delivery_key(id, &r.delivery_key).await?.into()))
}

pub async fn delete_order(State(s): State<AppState>, _admin: AdminCaller, ApiPath(id): ApiPath<Uuid>) -> Result<Json<MessageResponse>> {
    s.orders.delete(id).await?;
    Ok(Json(MessageResponse::new("Order deleted")))
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub results: Vec<BulkDeleteResult>,
}

pub async fn bulk_delete_orders(State(s): State<AppState>, _admin: AdminCaller, ApiJson(r): ApiJson<BulkDeleteRequest>) -> Result<Json<BulkDeleteResponse>> {
    r.validate()?;
    Ok(Json(BulkDeleteResponse { results: s.orders.bulk_delete(&r.order_ids).await }))
}
