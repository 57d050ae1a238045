//! Payment gateway webhook.

use axum::{extract::State, Json};

use super::dto::GatewayEventRequest;
use super::extract::ApiJson;
use super::AppState;
use crate::services::{GatewayEvent, WebhookOutcome};
use crate::Result;

pub async fn gateway_webhook(State(s): State<AppState>, ApiJson(r): ApiJson<GatewayEventRequest>) -> Result<Json<WebhookOutcome>> {
    let event = GatewayEvent::try_from(r)?;
    Ok(Json(s.payments.handle(event).await?))
}
