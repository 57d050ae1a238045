//! Coupon endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::auth::AdminCaller;
use super::dto::{CouponRequest, IncrementByCodeRequest, IncrementUsageRequest, MessageResponse, ValidateCouponRequest, ValidateCouponResponse};
use super::extract::{ApiJson, ApiPath};
use super::AppState;
use crate::domain::aggregates::{Coupon, CouponStatus};
use crate::Result;

pub async fn list_coupons(State(s): State<AppState>, _admin: AdminCaller) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(s.coupons.list().await?))
}

pub async fn get_coupon(State(s): State<AppState>, _admin: AdminCaller, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Coupon>> {
    Ok(Json(s.coupons.get(id).await?))
}

pub async fn create_coupon(State(s): State<AppState>, _admin: AdminCaller, ApiJson(r): ApiJson<CouponRequest>) -> Result<(StatusCode, Json<Coupon>)> {
    let coupon = s.coupons.create(r.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn update_coupon(State(s): State<AppState>, _admin: AdminCaller, ApiPath(id): ApiPath<Uuid>, ApiJson(r): ApiJson<CouponRequest>) -> Result<Json<Coupon>> {
    Ok(Json(s.coupons.update(id, r.into_draft()?).await?))
}

pub async fn delete_coupon(State(s): State<AppState>, _admin: AdminCaller, ApiPath(id): ApiPath<Uuid>) -> Result<Json<MessageResponse>> {
    s.coupons.delete(id).await?;
    Ok(Json(MessageResponse::new("Coupon deleted")))
}

pub async fn validate_coupon(State(s): State<AppState>, ApiJson(r): ApiJson<ValidateCouponRequest>) -> Result<Json<ValidateCouponResponse>> {
    r.validate()?;
    let quote = s.coupons.validate(&r.code, &r.cart()).await?;
    Ok(Json(quote.into()))
}

pub async fn coupon_status(State(s): State<AppState>, ApiPath(code): ApiPath<String>) -> Result<Json<CouponStatus>> {
    Ok(Json(s.coupons.status(&code).await?))
}

pub async fn increment_by_code(State(s): State<AppState>, ApiJson(r): ApiJson<IncrementByCodeRequest>) -> Result<Json<Coupon>> {
    r.validate()?;
    Ok(Json(s.coupons.increment_usage_by_code(&r.code, r.order_id).await?.coupon))
}

pub async fn increment_usage(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>, body: Option<ApiJson<IncrementUsageRequest>>) -> Result<Json<Coupon>> {
    let r = body.map(|ApiJson(r)| r).unwrap_or_default();
    Ok(Json(s.coupons.increment_usage(id, r.order_id).await?.coupon))
}
