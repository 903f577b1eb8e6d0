//! Bearer token presence check.
//!
//! Requests must carry `Authorization: Bearer <token>` with a non-empty
//! token. The token itself is not validated here.

use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

pub async fn require_bearer(request: Request, next: Next) -> Result<Response, ApiError> {
    let has_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| !token.trim().is_empty());

    if !has_token {
        return Err(ApiError::Unauthorized(
            "Missing or malformed bearer token".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
