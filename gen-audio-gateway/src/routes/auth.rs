//! Auth endpoints (§4.1): register, login, refresh, logout, profile,
//! change-password, forgot-password, reset-password. Handler style and
//! validate-before-side-effect ordering follow `los-libros`'s
//! `handshake()` (validate the request fully before touching storage).

use std::net::SocketAddr;

use axum::{
    Extension, Json,
    extract::{ConnectInfo, State},
};
use chrono::Duration as ChronoDuration;
use gen_audio_core::ApiError;
use gen_audio_core::auth::{hash_password, validate_password, validate_username, verify_password};
use gen_audio_core::models::TokenType;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::rate_limit::RateLimitCategory;
use crate::state::{AppState, CurrentUser};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub username: String,
}

pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !state.rate_limiters.check(RateLimitCategory::Registration, addr.ip()) {
        return Err(ApiError::RateLimited);
    }
    req.validate().map_err(|e| ApiError::Validation(e.to_string()))?;
    validate_username(&req.username).map_err(ApiError::Validation)?;
    validate_password(&req.password).map_err(ApiError::Validation)?;

    if state
        .store
        .find_user_by_email(&req.email)
        .await
        .map_err(ApiError::Internal)?
        .is_some()
    {
        return Err(ApiError::Conflict("an account with that email already exists".into()));
    }

    let password_hash = hash_password(&req.password).map_err(ApiError::Internal)?;
    let user = state
        .store
        .create_user(&req.username, &req.email, &password_hash)
        .await
        .map_err(ApiError::Internal)?;

    issue_session(&state, user.id, &user.username)
}

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !state.rate_limiters.check(RateLimitCategory::Login, addr.ip()) {
        return Err(ApiError::RateLimited);
    }
    req.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    let user = state
        .store
        .find_user_by_email(&req.email)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::Unauthenticated)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthenticated);
    }

    state.store.touch_last_login(user.id).await.map_err(ApiError::Internal)?;
    issue_session(&state, user.id, &user.username)
}

pub async fn refresh(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<AuthResponse>, ApiError> {
    issue_session(&state, current.id, &current.username)
}

/// Logout is advisory per §9: session tokens are stateless, so there is
/// no server-side deny list to update. This endpoint exists for client
/// symmetry and to let the gateway log the event.
pub async fn logout(Extension(current): Extension<CurrentUser>) -> Json<serde_json::Value> {
    tracing::info!(user_id = %current.id, "logout");
    Json(serde_json::json!({ "detail": "logged out" }))
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: String,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .store
        .find_user_by_id(current.id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        email: user.email,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if !state.rate_limiters.check(RateLimitCategory::ProfileUpdate, addr.ip()) {
        return Err(ApiError::RateLimited);
    }
    if let Some(ref username) = req.username {
        validate_username(username).map_err(ApiError::Validation)?;
    }
    let user = state
        .store
        .find_user_by_id(current.id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(ProfileResponse {
        id: user.id,
        username: req.username.unwrap_or(user.username),
        email: user.email,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.rate_limiters.check(RateLimitCategory::ChangePassword, addr.ip()) {
        return Err(ApiError::RateLimited);
    }
    validate_password(&req.new_password).map_err(ApiError::Validation)?;

    let user = state
        .store
        .find_user_by_id(current.id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound)?;
    if !verify_password(&req.current_password, &user.password_hash) {
        return Err(ApiError::Unauthenticated);
    }
    let new_hash = hash_password(&req.new_password).map_err(ApiError::Internal)?;
    state
        .store
        .update_password(current.id, &new_hash)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(serde_json::json!({ "detail": "password changed" })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Always returns success regardless of whether the email matches an
/// account, to avoid leaking account existence — the same
/// non-committal response the original service gives.
pub async fn forgot_password(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.rate_limiters.check(RateLimitCategory::ForgotPassword, addr.ip()) {
        return Err(ApiError::RateLimited);
    }
    req.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    if let Some(user) = state
        .store
        .find_user_by_email(&req.email)
        .await
        .map_err(ApiError::Internal)?
    {
        let reset_token = state
            .tokens
            .issue(user.id, &user.username, TokenType::PasswordReset, ChronoDuration::from_std(
                state.config.reset_token_ttl,
            ).unwrap_or(ChronoDuration::minutes(30)))
            .map_err(ApiError::Internal)?;
        tracing::info!(user_id = %user.id, "issued password reset token");
        let _ = reset_token; // delivery (email) is an external collaborator, out of scope per §1
    }

    Ok(Json(serde_json::json!({ "detail": "if that email exists, a reset link has been sent" })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.rate_limiters.check(RateLimitCategory::ResetPassword, addr.ip()) {
        return Err(ApiError::RateLimited);
    }
    validate_password(&req.new_password).map_err(ApiError::Validation)?;

    let claims = state
        .tokens
        .verify(&req.token, TokenType::PasswordReset)
        .map_err(|_| ApiError::Unauthenticated)?;

    let new_hash = hash_password(&req.new_password).map_err(ApiError::Internal)?;
    state
        .store
        .update_password(claims.sub, &new_hash)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(serde_json::json!({ "detail": "password reset" })))
}

fn issue_session(state: &AppState, user_id: uuid::Uuid, username: &str) -> Result<Json<AuthResponse>, ApiError> {
    let ttl = ChronoDuration::from_std(state.config.session_token_ttl).unwrap_or(ChronoDuration::hours(1));
    let token = state
        .tokens
        .issue(user_id, username, TokenType::Session, ttl)
        .map_err(ApiError::Internal)?;
    Ok(Json(AuthResponse {
        access_token: token,
        token_type: "bearer",
        expires_in: ttl.num_seconds(),
        username: username.to_string(),
    }))
}
