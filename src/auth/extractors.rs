use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Path},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::jwt::TokenKeys;
use crate::{error::AppError, users::repo_types::Username};

/// The `:username` of a data route, proven by a bearer token issued to that user.
pub struct DataOwner(pub Username);

#[async_trait]
impl<S> FromRequestParts<S> for DataOwner
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::InvalidInput("Invalid username".into()))?;
        let username = Username::parse(&raw)?;

        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))?;

        TokenKeys::from_ref(state).verify_for(token, &username)?;
        Ok(DataOwner(username))
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
