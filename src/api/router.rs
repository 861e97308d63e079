use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints::{auth, diagnosis, doctors, health, reports};
use crate::api::middleware;
use crate::api::types::AppState;
use crate::validation::MAX_IMAGE_KB;

/// Upload ceiling for diagnosis forms: the image limit plus room for other fields.
const MAX_UPLOAD_BYTES: usize = MAX_IMAGE_KB * 1024 + 2 * 1024 * 1024;

pub fn api_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/guest", post(auth::guest))
        .route("/doctors/search", get(doctors::search))
        .route("/doctors/:id", get(doctors::detail))
        .route("/reports/generate", post(reports::generate));

    // Anonymous callers get results back; authenticated ones also get them stored.
    let analysis = Router::new()
        .route("/diagnosis/image", post(diagnosis::analyze_image))
        .route("/diagnosis/symptoms", post(diagnosis::analyze_symptoms))
        .route("/diagnosis/combined", post(diagnosis::analyze_combined))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth::resolve_user));

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/diagnosis/history", get(diagnosis::history))
        .route("/diagnosis/:id", get(diagnosis::detail))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth::require_auth));

    Router::new()
        .nest("/api/v1", public.merge(analysis).merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
