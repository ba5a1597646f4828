use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    dto::{AllowanceQuery, ConstraintSummary, FoodAllowance},
    repo_types::UserConstraints,
    services::ConstraintResolver,
};
use crate::{
    catalog::{Food, FoodCatalog, FoodId},
    error::reject,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id/constraints-summary", get(constraints_summary))
        .route("/users/:user_id/allowed-foods", get(allowed_foods))
        .route("/foods/:food_id/check-allowed", get(check_allowed))
}

async fn load_inputs(
    state: &AppState,
    user_id: Uuid,
) -> Result<(FoodCatalog, UserConstraints), (StatusCode, String)> {
    let catalog = state.store.load_catalog().await.map_err(reject)?;
    let constraints = state
        .store
        .load_constraints(user_id)
        .await
        .map_err(reject)?;
    Ok((catalog, constraints))
}

#[instrument(skip(state))]
pub async fn constraints_summary(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ConstraintSummary>, (StatusCode, String)> {
    let (catalog, constraints) = load_inputs(&state, user_id).await?;
    let resolver = ConstraintResolver::new(&catalog, &constraints).map_err(reject)?;
    Ok(Json(resolver.summary()))
}

#[instrument(skip(state))]
pub async fn allowed_foods(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Food>>, (StatusCode, String)> {
    let (catalog, constraints) = load_inputs(&state, user_id).await?;
    let admissible = ConstraintResolver::new(&catalog, &constraints)
        .map_err(reject)?
        .admissible();
    debug!(allowed = admissible.len(), total = catalog.len(), "constraints resolved");
    Ok(Json(admissible.iter().cloned().collect()))
}

#[instrument(skip(state))]
pub async fn check_allowed(
    State(state): State<AppState>,
    Path(food_id): Path<FoodId>,
    Query(q): Query<AllowanceQuery>,
) -> Result<Json<FoodAllowance>, (StatusCode, String)> {
    let (catalog, constraints) = load_inputs(&state, q.user_id).await?;
    let allowance = ConstraintResolver::new(&catalog, &constraints)
        .map_err(reject)?
        .check(food_id)
        .map_err(reject)?;
    Ok(Json(allowance))
}
