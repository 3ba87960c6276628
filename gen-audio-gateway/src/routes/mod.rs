pub mod auth;
pub mod books;
pub mod chunks;
pub mod health;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;

/// Router assembly follows `ShahadIshraq-porua`'s `create_router`: public
/// routes first, then a nested router with the auth middleware layered
/// on via `from_fn_with_state`, all merged under one `AppState`.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login/email", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route(
            "/api/v1/books/{book_id}/chunks/{seq}",
            get(chunks::get_chunk),
        );

    let protected = Router::new()
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/auth/change-password", post(auth::change_password))
        .route("/api/v1/books", get(books::list_books).post(books::submit_book))
        .route("/api/v1/books/{book_id}/status", get(books::book_status))
        .route("/api/v1/books/{book_id}", delete(books::delete_book))
        .route("/api/v1/books/{book_id}/chunks", get(chunks::list_chunks))
        .route(
            "/api/v1/books/{book_id}/chunks/{seq}/signed-url",
            post(chunks::signed_url),
        )
        .route(
            "/api/v1/books/{book_id}/chunks/batch-signed-urls",
            post(chunks::batch_signed_urls),
        )
        .layer(from_fn_with_state(state.clone(), require_auth));

    public.merge(protected).with_state(state)
}
