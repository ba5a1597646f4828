use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{dto::ProfileInput, repo_types::UserProfile, services::derive_profile};
use crate::{
    error::{reject, PlannerError},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/users/:user_id/profile", get(get_profile))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/users/:user_id/profile", put(put_profile))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserProfile>, (StatusCode, String)> {
    let profile = state
        .store
        .load_profile(user_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(PlannerError::NotFound(format!("profile for user {user_id}"))))?;
    Ok(Json(profile))
}

/// PUT /users/:user_id/profile: stores raw fields and re-derives the targets.
#[instrument(skip(state, payload))]
pub async fn put_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ProfileInput>,
) -> Result<Json<UserProfile>, (StatusCode, String)> {
    let profile =
        derive_profile(user_id, &payload, OffsetDateTime::now_utc()).map_err(reject)?;
    state.store.save_profile(&profile).await.map_err(reject)?;

    info!(
        %user_id,
        bmr = profile.targets.bmr,
        tdee = profile.targets.tdee,
        calorie_target = profile.targets.calorie_target,
        "profile derived"
    );
    Ok(Json(profile))
}
