use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tracing::{field, instrument, Span};
use uniconnect_core::{ConnectError, GraphSnapshot, Profile, ProfileId};

use crate::{
    dto::{api_error, rejection_error, ApiError, SubmitProfileRequest},
    service::ConnectService,
};

/// Create profiles router
pub fn create_router() -> Router {
    Router::new()
        .route("/", post(submit_profile).delete(reset_profiles))
        .route("/:id", get(get_profile))
}

/// Submit (upsert) a profile and return the recomputed graph
#[instrument(skip_all, fields(id = field::Empty))]
pub async fn submit_profile(
    Extension(service): Extension<Arc<ConnectService>>,
    payload: Result<Json<SubmitProfileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GraphSnapshot>), ApiError> {
    let profile = parse_submission(payload)?;
    let snapshot = service.submit_profile(profile).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(snapshot.as_ref().clone())))
}

/// Submit (upsert) a profile and return the submitter's ego view of the
/// recomputed graph
#[instrument(skip_all, fields(id = field::Empty))]
pub async fn submit_profile_ego(
    Extension(service): Extension<Arc<ConnectService>>,
    payload: Result<Json<SubmitProfileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GraphSnapshot>), ApiError> {
    let profile = parse_submission(payload)?;
    let id = profile.id.clone();
    let snapshot = service.submit_profile(profile).await.map_err(api_error)?;
    let ego = snapshot
        .graph
        .ego_view(&id)
        .ok_or_else(|| api_error(ConnectError::ProfileNotFound { id }))?;
    Ok((
        StatusCode::CREATED,
        Json(GraphSnapshot {
            generation: snapshot.generation,
            computed_at: snapshot.computed_at,
            graph: ego,
        }),
    ))
}

fn parse_submission(payload: Result<Json<SubmitProfileRequest>, JsonRejection>) -> Result<Profile, ApiError> {
    let Json(request) = payload.map_err(rejection_error)?;
    Span::current().record("id", field::display(&request.id));
    request.into_profile().map_err(api_error)
}

/// Get a stored profile
#[instrument(skip(service))]
async fn get_profile(
    Extension(service): Extension<Arc<ConnectService>>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    service
        .get_profile(&ProfileId::new(id))
        .await
        .map(Json)
        .map_err(api_error)
}

/// Drop every profile
#[instrument(skip(service))]
async fn reset_profiles(
    Extension(service): Extension<Arc<ConnectService>>,
) -> Result<Json<GraphSnapshot>, ApiError> {
    let snapshot = service.reset().await.map_err(api_error)?;
    Ok(Json(snapshot.as_ref().clone()))
}
