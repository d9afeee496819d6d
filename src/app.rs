use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::middleware::require_auth;
use crate::handlers;
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/signin", post(handlers::auth::signin));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        // Habits
        .route(
            "/api/habits",
            get(handlers::habits::list_habits).post(handlers::habits::create_habit),
        )
        .route(
            "/api/habits/:id",
            get(handlers::habits::get_habit)
                .put(handlers::habits::update_habit)
                .delete(handlers::habits::delete_habit),
        )
        // Completions
        .route(
            "/api/habits/:id/completions",
            get(handlers::completions::list_habit_completions)
                .post(handlers::completions::create_completion),
        )
        .route(
            "/api/completions",
            get(handlers::completions::list_completions),
        )
        .route(
            "/api/completions/:id",
            delete(handlers::completions::delete_completion),
        )
        // Streaks
        .route("/api/habits/:id/streak", get(handlers::streaks::get_streak))
        .route("/api/streaks", get(handlers::streaks::list_streaks))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
