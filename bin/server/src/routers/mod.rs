use axum::Router;

pub mod graph;
pub mod profiles;

/// Create the main API router
pub fn create_router() -> Router {
    Router::new()
        .nest("/profiles", profiles::create_router())
        .nest("/graph", graph::create_router())
}
