//! HTTP mapping of [`StorefrontError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::StorefrontError;

impl StorefrontError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_)
            | Self::NotYetValid
            | Self::Expired
            | Self::UsageLimitReached { .. }
            | Self::NotApplicable
            | Self::BelowMinimum { .. }
            | Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Storage(detail) => {
                tracing::error!(error = %detail, "storage failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({ "message": message, "error": self.kind() });
        match &self {
            Self::UsageLimitReached { current_uses, max_uses } => {
                body["currentUses"] = json!(current_uses);
                body["maxUses"] = json!(max_uses);
            }
            Self::BelowMinimum { minimum_order_value } => {
                body["minimumOrderValue"] = json!(minimum_order_value);
            }
            _ => {}
        }
        (status, Json(body)).into_response()
    }
}
