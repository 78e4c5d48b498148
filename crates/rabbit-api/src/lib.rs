//! HTTP surface: account flows, chat threads, guest chat, mood and journal
//! entries.

pub mod auth;
pub mod chats;
pub mod entries;
pub mod mailer;
pub mod middleware;
pub mod otp;
pub mod reply;
pub mod resources;

use axum::{
    Json, Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::error;

use rabbit_store::StoreError;

use auth::AppState;
use middleware::require_auth;

/// All routes, mounted under `/api`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/resend-otp", post(auth::resend_otp))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/public-chat", post(chats::public_chat))
        .route("/resources", get(resources::list_resources))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/auth/verify", get(auth::session))
        .route("/chats", get(chats::list_chats))
        .route("/chats/{chat_id}/delete", post(chats::delete_chat))
        .route("/chat/{chat_id}", get(chats::get_chat))
        .route("/chat", post(chats::send_message))
        .route("/mood", get(entries::list_moods).post(entries::add_mood))
        .route("/journal", get(entries::list_journals).post(entries::add_journal))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": rabbit_types::models::timestamp_now() }))
}

pub(crate) fn store_status(e: StoreError) -> StatusCode {
    match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::DuplicateKey { .. } => StatusCode::CONFLICT,
        StoreError::ReservedName(_) => StatusCode::BAD_REQUEST,
        other => {
            error!("Storage error: {}", other);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Run a store call on the blocking pool.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> rabbit_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(store_status)
}
