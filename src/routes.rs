// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, assignment, auth, comment, profile, result, survey},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, member_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, profile, dashboard, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Profile stays open to guests; only a valid session is required.
    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .route("/preferences", put(profile::update_preferences))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // The personal dashboard: assignments, submissions, comment threads.
    // Guests are rejected by the member middleware.
    let member_routes = Router::new()
        .route("/assignments", get(assignment::list_my_assignments))
        .route("/assignments/{id}", get(assignment::get_my_assignment))
        .route("/assignments/{id}/result", post(result::submit_result))
        .route("/results/{id}", get(result::get_result))
        .route(
            "/results/{id}/comments",
            get(comment::list_comments).post(comment::add_user_comment),
        )
        .route("/results/{id}/comments/read", post(comment::mark_read_by_user))
        .layer(middleware::from_fn(member_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route(
            "/surveys",
            get(survey::list_surveys).post(survey::create_survey),
        )
        .route(
            "/surveys/{id}",
            get(survey::get_survey)
                .put(survey::update_survey)
                .delete(survey::delete_survey),
        )
        .route(
            "/surveys/{id}/comments/read",
            post(comment::mark_read_by_admin),
        )
        .route("/assignments", post(assignment::assign_survey))
        .route(
            "/results/{id}/comments",
            post(comment::add_admin_comment).delete(comment::clear_comments),
        )
        .route("/unread-surveys", get(comment::unread_survey_count))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api", member_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
