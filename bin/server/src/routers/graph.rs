use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Json,
    routing::get,
    Router,
};
use tracing::instrument;
use uniconnect_core::{GraphResponse, GraphSnapshot, ProfileId};

use crate::{
    dto::{api_error, ApiError},
    service::ConnectService,
};

/// Create graph router
pub fn create_router() -> Router {
    Router::new()
        .route("/", get(get_graph))
        .route("/ego/:id", get(get_ego_graph))
}

/// Last completed graph snapshot
#[instrument(skip(service))]
async fn get_graph(Extension(service): Extension<Arc<ConnectService>>) -> Json<GraphSnapshot> {
    Json(service.graph().await.as_ref().clone())
}

/// A profile with its direct neighbors
#[instrument(skip(service))]
async fn get_ego_graph(
    Extension(service): Extension<Arc<ConnectService>>,
    Path(id): Path<String>,
) -> Result<Json<GraphResponse>, ApiError> {
    service
        .ego_graph(&ProfileId::new(id))
        .await
        .map(Json)
        .map_err(api_error)
}
