//! Shared types for the API layer.

use sqlx::PgPool;

use crate::ai_client::AiClient;
use crate::models::User;

/// Shared state for all routes and middleware.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub ai: AiClient,
}

impl AppState {
    pub fn new(pool: PgPool, ai: AiClient) -> Self {
        Self { pool, ai }
    }
}

/// Authenticated caller, injected into request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token_id: i64,
}
