use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};

use super::{dto::FoodSearch, repo_types::Food};
use crate::{error::reject, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/foods", get(list_foods))
}

#[instrument(skip(state))]
pub async fn list_foods(
    State(state): State<AppState>,
    Query(q): Query<FoodSearch>,
) -> Result<Json<Vec<Food>>, (StatusCode, String)> {
    let catalog = state.store.load_catalog().await.map_err(reject)?;
    let foods: Vec<Food> = catalog
        .search(q.search.as_deref().unwrap_or(""))
        .into_iter()
        .cloned()
        .collect();
    debug!(count = foods.len(), "foods listed");
    Ok(Json(foods))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_and_filters_seeded_foods() {
        let state = AppState::fake();

        let Json(all) = list_foods(State(state.clone()), Query(FoodSearch { search: None }))
            .await
            .unwrap();
        assert_eq!(all.len(), 20);

        let Json(hits) = list_foods(
            State(state),
            Query(FoodSearch {
                search: Some("oil".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Olive Oil");
    }
}
