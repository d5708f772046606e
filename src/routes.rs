// src/routes.rs

use axum::{
    Router,
    http::{HeaderName, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, attempts, config, logs},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Student surface: config view, attempt lifecycle, session operations.
/// * Admin surface under /api/admin, gated by the password middleware.
/// * Global middleware (Trace, CORS) and shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(admin::ADMIN_PASSWORD_HEADER),
        ]);

    let attempt_routes = Router::new()
        .route(
            "/",
            get(attempts::list_attempts)
                .post(attempts::create_attempt)
                .delete(attempts::delete_all_attempts),
        )
        .route("/student/{student_id}", get(attempts::get_attempt_by_student))
        .route(
            "/{id}",
            get(attempts::get_attempt)
                .put(attempts::update_attempt)
                .delete(attempts::delete_attempt),
        )
        .route("/{id}/answer", post(attempts::record_answer))
        .route("/{id}/signals", post(attempts::report_signal))
        .route("/{id}/detections", post(attempts::report_detections))
        .route("/{id}/unlock", post(attempts::unlock_attempt))
        .route("/{id}/submit", post(attempts::submit_attempt));

    let log_routes = Router::new().route(
        "/",
        get(logs::list_logs).post(logs::create_log).delete(logs::clear_logs),
    );

    let admin_routes = Router::new()
        .route("/config", get(admin::get_config).post(admin::update_config))
        .route("/attempts/{id}/force-unlock", post(admin::force_unlock))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin,
        ));

    Router::new()
        .route("/api/config", get(config::get_config))
        .nest("/api/attempts", attempt_routes)
        .nest("/api/logs", log_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
