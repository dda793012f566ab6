use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{Created, LoginRequest, LoginResponse, ProfileResponse, RegisterRequest},
        extractors::CurrentUser,
        password,
        repo::User,
    },
    characters,
    error::{constraint_message, ApiError},
    state::AppState,
};

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/sessions", post(login))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/users/:id", get(profile))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Opaque credential issued once at registration.
pub(crate) fn new_access_token() -> String {
    Uuid::new_v4().to_string()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty() {
        warn!("registration without username");
        return Err(ApiError::Validation("a username must be provided".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation(
            "please enter a valid email address".into(),
        ));
    }
    if payload.password.trim().is_empty() {
        warn!("registration without password");
        return Err(ApiError::Validation("please enter a password".into()));
    }

    let hash = password::hash_password(&payload.password)?;
    let token = new_access_token();

    match User::create(&state.db, &payload.username, &payload.email, &hash, &token).await {
        Ok(user) => {
            info!(user_id = %user.id, username = %user.username, "user registered");
            Ok((StatusCode::CREATED, Json(Created { created: true })))
        }
        Err(e) => match constraint_message(&e) {
            Some(msg) => {
                warn!(username = %payload.username, error = %msg, "registration rejected");
                Err(ApiError::Validation(msg))
            }
            None => Err(ApiError::Internal(e)),
        },
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // Unknown usernames fail the same way as bad passwords.
    let user = User::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| {
            warn!(username = %payload.username, "login for unknown username");
            ApiError::InvalidCredentials
        })?;

    let ok = password::verify_password(&payload.password, &user.password_hash)?;
    if !ok {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(LoginResponse {
        message: "login successful".into(),
        token: user.access_token,
        user_id: user.id,
    }))
}

/// The token check already resolved the user; this only expands the owned
/// characters in the order the reference list keeps them.
#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let rows = characters::repo::by_ids(&state.db, &user.characters).await?;
    let expanded = characters::repo::in_reference_order(&user.characters, rows);

    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        characters: expanded,
    }))
}
