//! Auth middleware and security headers, grounded on
//! `ShahadIshraq-porua`'s `auth::auth_middleware` (`from_fn_with_state`
//! extracting a bearer token, resolving a typed identity, attaching it as
//! a request extension for handlers to pull back out).

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use gen_audio_core::models::TokenType;

use crate::state::{AppState, CurrentUser};

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, gen_audio_core::ApiError> {
    let token = bearer_token(&request).ok_or(gen_audio_core::ApiError::Unauthenticated)?;
    let claims = state
        .tokens
        .verify(&token, TokenType::Session)
        .map_err(|_| gen_audio_core::ApiError::Unauthenticated)?;

    request.extensions_mut().insert(CurrentUser {
        id: claims.sub,
        username: claims.username,
    });

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Attaches the fixed set of security headers to every response —
/// `X-Content-Type-Options`, `X-Frame-Options`, a restrictive CSP, and
/// `Strict-Transport-Security` — the way a `tower::Layer` wraps a service
/// in the teacher's `tower-http` peers (ferrex, sideseat-sideseat).
pub async fn security_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=63072000; includeSubDomains"),
    );
    response
}
