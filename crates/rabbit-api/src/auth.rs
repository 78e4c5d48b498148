use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info, warn};
use uuid::Uuid;

use rabbit_store::Store;
use rabbit_types::Username;
use rabbit_types::api::{
    AuthResponse, Claims, ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    ResendOtpRequest, ResetPasswordRequest, SessionResponse, UserProfile, VerifyEmailRequest,
};
use rabbit_types::models::{EmailKind, EmailLogEntry, User, UserUpdate, timestamp_now};

use crate::mailer::{Mailer, OutgoingEmail};
use crate::middleware::AuthUser;
use crate::otp::{OtpStore, PendingRegistration};
use crate::blocking;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub jwt_secret: String,
    pub otps: OtpStore,
    pub mailer: Box<dyn Mailer>,
}

const TOKEN_LIFETIME_DAYS: i64 = 7;
const MIN_PASSWORD_LEN: usize = 6;

fn ok_message(message: &str) -> Json<MessageResponse> {
    Json(MessageResponse { success: true, message: message.to_string() })
}

fn profile(user: &User) -> UserProfile {
    UserProfile {
        username: user.username.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
    }
}

fn valid_new_username(raw: &str) -> Option<Username> {
    let shape_ok = (3..=32).contains(&raw.len())
        && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if shape_ok { Username::parse(raw).ok() } else { None }
}

fn valid_email(raw: &str) -> bool {
    let raw = raw.trim();
    matches!(
        raw.split_once('@'),
        Some((local, domain)) if !local.is_empty() && domain.contains('.')
    )
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    let username = valid_new_username(&req.username).ok_or(StatusCode::BAD_REQUEST)?;
    if !valid_email(&req.email) || req.password.len() < MIN_PASSWORD_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    let email = req.email.trim().to_lowercase();

    // Check if username or email is taken
    let db = state.clone();
    let (lookup_name, lookup_email) = (username.clone(), email.clone());
    let taken = blocking(move || {
        Ok(db.store.get_user_by_username(&lookup_name)?.is_some()
            || db.store.get_user_by_email(&lookup_email)?.is_some())
    })
    .await?;
    if taken {
        return Err(StatusCode::CONFLICT);
    }

    let registration = PendingRegistration {
        username: username.clone(),
        email: email.clone(),
        password_hash: hash_password(&req.password)?,
        name: req.name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| req.username.clone()),
    };

    let code = state.otps.issue(&username, EmailKind::Verification, Some(registration));
    let sent =
        send_otp_email(&state, &email, EmailKind::Verification, &code, Some(&username)).await;
    if let Err(status) = sent {
        state.otps.discard(&username);
        return Err(status);
    }

    Ok(ok_message("Verification code sent to your email"))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let username = Username::parse(req.username).map_err(|_| StatusCode::BAD_REQUEST)?;

    let registration = state
        .otps
        .verify(&username, EmailKind::Verification, &req.otp)
        .map_err(|e| {
            warn!("Email verification for {} failed: {}", username, e);
            StatusCode::BAD_REQUEST
        })?
        .ok_or(StatusCode::BAD_REQUEST)?;

    let user = User {
        username: registration.username,
        email: registration.email,
        password: registration.password_hash,
        name: registration.name,
        email_verified: true,
        created_at: timestamp_now(),
    };

    let db = state.clone();
    let user = blocking(move || db.store.create_user(user)).await?;

    let token = create_token(&state.jwt_secret, &user)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse { token, user: profile(&user), history: None }),
    ))
}

pub async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<ResendOtpRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    match req.kind {
        EmailKind::Verification => {
            let raw = req.username.ok_or(StatusCode::BAD_REQUEST)?;
            let username = Username::parse(raw).map_err(|_| StatusCode::BAD_REQUEST)?;
            let (code, registration) = state
                .otps
                .reissue_registration(&username)
                .map_err(|_| StatusCode::BAD_REQUEST)?;
            send_otp_email(
                &state,
                &registration.email,
                EmailKind::Verification,
                &code,
                Some(&username),
            )
            .await?;
            Ok(ok_message("Verification code resent to your email"))
        }
        EmailKind::Reset => {
            let email = req.email.ok_or(StatusCode::BAD_REQUEST)?;
            let user = find_user(&state, None, Some(email)).await?.ok_or(StatusCode::NOT_FOUND)?;
            let code = state.otps.issue(&user.username, EmailKind::Reset, None);
            send_otp_email(&state, &user.email, EmailKind::Reset, &code, Some(&user.username))
                .await?;
            Ok(ok_message("Password reset code sent to your email"))
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.username.is_none() && req.email.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = find_user(&state, req.username, req.email)
        .await?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !user.email_verified {
        return Err(StatusCode::FORBIDDEN);
    }

    verify_password(&req.password, &user.password)?;

    let db = state.clone();
    let username = user.username.clone();
    let history = blocking(move || db.store.user_history(&username)).await?;

    let token = create_token(&state.jwt_secret, &user)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    info!("User {} logged in", user.username);

    Ok(Json(AuthResponse { token, user: profile(&user), history: Some(history) }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let generic = "If the email exists, a reset code has been sent";

    // Same answer for unknown addresses so accounts can't be probed
    let Some(user) = find_user(&state, None, Some(req.email)).await? else {
        return Ok(ok_message(generic));
    };

    let code = state.otps.issue(&user.username, EmailKind::Reset, None);
    let sent =
        send_otp_email(&state, &user.email, EmailKind::Reset, &code, Some(&user.username)).await;
    if let Err(status) = sent {
        state.otps.discard(&user.username);
        return Err(status);
    }

    Ok(ok_message(generic))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.username.is_none() && req.email.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = find_user(&state, req.username, req.email)
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;

    state
        .otps
        .verify(&user.username, EmailKind::Reset, &req.otp)
        .map_err(|e| {
            warn!("Password reset for {} failed: {}", user.username, e);
            StatusCode::BAD_REQUEST
        })?;

    let update = UserUpdate {
        password: Some(hash_password(&req.new_password)?),
        ..Default::default()
    };
    let db = state.clone();
    let username = user.username.clone();
    blocking(move || db.store.update_user(&username, update)).await?;

    info!("Password reset for {}", user.username);
    Ok(ok_message("Password reset successfully"))
}

/// Current user and how much they have stored.
pub async fn session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let (user, history) = blocking(move || {
        let user = db.store.get_user_by_username(&auth.username)?;
        let history = db.store.user_history(&auth.username)?;
        Ok((user, history))
    })
    .await?;

    let user = user.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(SessionResponse { user: profile(&user), history }))
}

async fn find_user(
    state: &AppState,
    username: Option<String>,
    email: Option<String>,
) -> Result<Option<User>, StatusCode> {
    let db = state.clone();
    match (username, email) {
        (Some(raw), _) => {
            let Ok(username) = Username::parse(raw) else {
                return Ok(None);
            };
            blocking(move || db.store.get_user_by_username(&username)).await
        }
        (None, Some(email)) => blocking(move || db.store.get_user_by_email(email.trim())).await,
        (None, None) => Ok(None),
    }
}

/// Mail a one-time code and record it in the outbound email log.
async fn send_otp_email(
    state: &AppState,
    to: &str,
    kind: EmailKind,
    code: &str,
    username: Option<&Username>,
) -> Result<(), StatusCode> {
    let ttl_minutes = state.otps.ttl().as_secs().div_ceil(60);
    let email = OutgoingEmail::otp(to, kind, code, ttl_minutes);

    state.mailer.send(&email).map_err(|e| {
        error!("Failed to send {} email to {}: {}", kind, to, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let entry = EmailLogEntry {
        id: Uuid::new_v4().to_string(),
        to: email.to,
        subject: email.subject,
        kind,
        otp: code.to_string(),
        sent_at: timestamp_now(),
        username: username.cloned(),
    };
    let db = state.clone();
    blocking(move || db.store.add_email(&entry)).await
}

fn hash_password(password: &str) -> Result<String, StatusCode> {
    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn verify_password(password: &str, stored: &str) -> Result<(), StatusCode> {
    let parsed_hash = PasswordHash::new(stored).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)
}

pub fn create_token(secret: &str, user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.username.to_string(),
        email: user.email.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp()
            as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
