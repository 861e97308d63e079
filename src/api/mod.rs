//! HTTP API served under `/api/v1`.
//!
//! Public routes need no token. Diagnosis submissions resolve the caller if a
//! bearer token is present so results can be stored. History, single
//! diagnosis lookup and session routes require a valid token.

pub mod endpoints;
pub mod error;
pub mod input;
pub mod middleware;
pub mod router;
pub mod types;

pub use router::api_router;
pub use types::AppState;
