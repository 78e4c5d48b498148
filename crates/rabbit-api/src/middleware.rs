use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use rabbit_types::Username;
use rabbit_types::api::Claims;

use crate::auth::AppState;

/// The caller behind a validated bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: Username,
}

/// Extract and validate JWT from Authorization header.
///
/// No token is 401; a token that fails validation is 403.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        StatusCode::FORBIDDEN
    })?;

    let username = Username::parse(token_data.claims.sub).map_err(|_| StatusCode::FORBIDDEN)?;

    req.extensions_mut().insert(AuthUser { username });
    Ok(next.run(req).await)
}
