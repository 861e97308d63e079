//! Registration, login, guest sessions and token revocation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::ApiError;
use crate::api::input::JsonObject;
use crate::api::types::{AppState, AuthUser};
use crate::auth::{generate_token, hash_password, hash_token, verify_password};
use crate::models::User;
use crate::repo;
use crate::validation::{is_valid_email, validate_required_string, FieldErrors};

const MIN_PASSWORD_LEN: usize = 8;
// Guests can never log in with a password; this is not a valid hash encoding.
const GUEST_PASSWORD_HASH: &str = "!guest";

/// `POST /api/v1/auth/register`
pub async fn register(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut errors = FieldErrors::new();
    let name = validate_required_string("name", body.get("name"), Some(255), &mut errors);
    let email = validate_required_string("email", body.get("email"), Some(255), &mut errors);
    let password = match body.get("password") {
        Some(Value::String(p)) if !p.is_empty() => {
            if p.chars().count() < MIN_PASSWORD_LEN {
                errors.add("password", format!("The password field must be at least {MIN_PASSWORD_LEN} characters."));
            }
            Some(p.clone())
        }
        Some(Value::String(_)) | None | Some(Value::Null) => {
            errors.add("password", "The password field is required.");
            None
        }
        Some(_) => {
            errors.add("password", "The password field must be a string.");
            None
        }
    };

    if let Some(email) = &email {
        if !is_valid_email(email) {
            errors.add("email", "The email field must be a valid email address.");
        } else if repo::email_taken(&state.pool, email)
            .await
            .map_err(ApiError::internal("Registration failed"))?
        {
            errors.add("email", "The email has already been taken.");
        }
    }
    errors.into_result()?;

    let (Some(name), Some(email), Some(password)) = (name, email, password) else {
        return Err(ApiError::Internal { context: "Registration failed", detail: "incomplete input".into() });
    };

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ApiError::internal("Registration failed"))?;

    let user = match repo::create_user(&state.pool, &name, &email, &password_hash, false).await {
        Ok(user) => user,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(FieldErrors::single("email", "The email has already been taken.").into());
        }
        Err(e) => return Err(ApiError::internal("Registration failed")(e)),
    };
    let token = issue_token(&state, &user, "Registration failed").await?;

    info!(user_id = user.id, "Registered user");
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "user": user, "token": token})),
    ))
}

/// `POST /api/v1/auth/login`
pub async fn login(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Json<Value>, ApiError> {
    let mut errors = FieldErrors::new();
    let email = validate_required_string("email", body.get("email"), None, &mut errors);
    let password = match body.get("password") {
        Some(Value::String(p)) if !p.is_empty() => Some(p.clone()),
        _ => {
            errors.add("password", "The password field is required.");
            None
        }
    };
    errors.into_result()?;

    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::InvalidCredentials);
    };

    let user = repo::find_user_by_email(&state.pool, &email)
        .await
        .map_err(ApiError::internal("Login failed"))?
        .filter(|u| !u.is_guest)
        .ok_or(ApiError::InvalidCredentials)?;

    let stored = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(ApiError::internal("Login failed"))?;
    if !valid {
        info!("Rejected login attempt");
        return Err(ApiError::InvalidCredentials);
    }

    let token = issue_token(&state, &user, "Login failed").await?;
    info!(user_id = user.id, "User logged in");
    Ok(Json(json!({"success": true, "user": user, "token": token})))
}

/// `POST /api/v1/auth/guest`
pub async fn guest(State(state): State<AppState>) -> Result<(StatusCode, Json<Value>), ApiError> {
    // Random, unguessable address keeps the unique constraint satisfied.
    let email = format!("guest-{}@guest.heal-io.local", generate_token().to_lowercase());
    let user = repo::create_user(&state.pool, "Guest", &email, GUEST_PASSWORD_HASH, true)
        .await
        .map_err(ApiError::internal("Guest session failed"))?;
    let token = issue_token(&state, &user, "Guest session failed").await?;

    info!(user_id = user.id, "Started guest session");
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "user": user, "token": token})),
    ))
}

/// `POST /api/v1/auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    repo::delete_token(&state.pool, caller.token_id)
        .await
        .map_err(ApiError::internal("Logout failed"))?;
    info!(user_id = caller.user.id, "User logged out");
    Ok(Json(json!({"success": true, "message": "Logged out successfully"})))
}

/// `GET /api/v1/auth/me`
pub async fn me(Extension(caller): Extension<AuthUser>) -> Json<Value> {
    Json(json!({"success": true, "user": caller.user}))
}

async fn issue_token(state: &AppState, user: &User, context: &'static str) -> Result<String, ApiError> {
    let token = generate_token();
    repo::insert_token(&state.pool, user.id, &hash_token(&token))
        .await
        .map_err(ApiError::internal(context))?;
    Ok(token)
}
