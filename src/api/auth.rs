//! Caller identity forwarded by the authentication layer in front of the service.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::StorefrontError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: String,
}

impl Caller {
    pub fn is_admin(&self) -> bool { self.role == "admin" }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_ID_HEADER).ok_or(StorefrontError::Unauthorized)?;
        let role = header(parts, USER_ROLE_HEADER).unwrap_or("user");
        Ok(Caller { id: id.to_string(), role: role.to_lowercase() })
    }
}

/// A caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminCaller(pub Caller);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminCaller {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        if !caller.is_admin() {
            tracing::warn!(user_id = %caller.id, path = %parts.uri.path(), "admin route refused");
            return Err(StorefrontError::Forbidden("Admin access required".into()));
        }
        Ok(AdminCaller(caller))
    }
}
