//! Bearer token authentication.
//!
//! `require_auth` rejects requests without a valid token. `resolve_user`
//! attaches the caller when a valid token is present and lets anonymous
//! requests through untouched.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::types::{AppState, AuthUser};
use crate::auth::hash_token;
use crate::repo;

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn lookup(state: &AppState, token: &str) -> Result<Option<AuthUser>, ApiError> {
    let found = repo::find_user_by_token(&state.pool, &hash_token(token))
        .await
        .map_err(ApiError::internal("Authentication failed"))?;
    Ok(found.map(|(token_id, user)| AuthUser { user, token_id }))
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?.to_string();
    let caller = lookup(&state, &token).await?.ok_or(ApiError::Unauthorized)?;

    debug!(user_id = caller.user.id, "Authenticated request");
    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

pub async fn resolve_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = bearer_token(req.headers()).map(str::to_string) {
        match lookup(&state, &token).await? {
            Some(caller) => {
                debug!(user_id = caller.user.id, "Resolved caller");
                req.extensions_mut().insert(caller);
            }
            None => debug!("Unknown bearer token, continuing anonymously"),
        }
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
