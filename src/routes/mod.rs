pub mod attempts;
pub mod auth;
pub mod comments;
pub mod health;

use axum::{
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};

use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/tests", get(tests::list_tests))
        .route("/api/tests/:id", get(tests::get_test))
        .route("/api/tests/:id/comments", get(comments::list_comments));

    let authed = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/tests", post(tests::create_test))
        .route(
            "/api/tests/:id",
            put(tests::update_test).delete(tests::delete_test),
        )
        .route("/api/tests/:id/edit", get(tests::get_test_for_edit))
        .route("/api/tests/:id/attempts", post(attempts::submit_attempt))
        .route("/api/tests/:id/comments", post(comments::create_comment))
        .route("/api/results", get(attempts::list_results))
        .route("/api/results/:id", get(attempts::get_result))
        .layer(from_fn(crate::middleware::auth::require_bearer_auth));

    public.merge(authed).with_state(state)
}
