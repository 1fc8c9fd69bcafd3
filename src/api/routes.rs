use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{handlers, AppState};
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::register_user))
        // Catalog
        .route("/movies/lists/:kind", get(handlers::list_movies))
        .route("/movies/search", get(handlers::search_movies))
        .route("/movies/:id", get(handlers::get_movie))
        // Ratings and reviews
        .route(
            "/movies/:id/rating",
            get(handlers::get_rating).put(handlers::submit_rating),
        )
        .route(
            "/movies/:id/reviews",
            get(handlers::list_reviews).post(handlers::submit_review),
        )
        // Watchlist
        .route("/watchlist", get(handlers::list_watchlist))
        .route("/watchlist/:movie_id", get(handlers::watchlist_status))
        .route("/watchlist/:movie_id/toggle", post(handlers::toggle_watchlist))
}
