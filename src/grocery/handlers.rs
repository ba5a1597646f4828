use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{dto::GroceryList, services::grocery_list};
use crate::{
    error::{reject, PlannerError},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/meal-plans/:id/grocery-list", get(get_grocery_list))
}

#[instrument(skip(state))]
pub async fn get_grocery_list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GroceryList>, (StatusCode, String)> {
    let plan = state
        .store
        .load_meal_plan(id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(PlannerError::NotFound(format!("meal plan {id}"))))?;
    let list = grocery_list(&plan);
    debug!(meal_plan_id = %id, items = list.total_items, "grocery list built");
    Ok(Json(list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meal_plans::generator::{GenerationRequest, MealPlanGenerator};
    use crate::meal_plans::GeneratorSettings;
    use crate::nutrition::Nutrition;
    use crate::profiles::services::macro_targets;
    use crate::profiles::MetabolicTargets;
    use crate::storage::{MemoryStore, PlannerStore};
    use crate::{catalog::seed, constraints::AdmissibleFoods};
    use std::sync::Arc;

    #[tokio::test]
    async fn grocery_list_conserves_plan_nutrition() {
        let store = Arc::new(MemoryStore::seeded());
        let state = AppState::with_store(store.clone());

        let (protein_target, carb_target, fat_target) = macro_targets(2400.0);
        let targets = MetabolicTargets {
            bmr: 1800.0,
            tdee: 2400.0,
            calorie_target: 2400.0,
            protein_target,
            carb_target,
            fat_target,
        };
        let foods: AdmissibleFoods = seed::foods().into_iter().collect();
        let plan = MealPlanGenerator::new(GeneratorSettings {
            timeout: None,
            ..GeneratorSettings::default()
        })
        .generate(&GenerationRequest {
            user_id: Uuid::new_v4(),
            targets: &targets,
            foods: &foods,
            num_days: 5,
            start_date: None,
            seed: 3,
        })
        .unwrap()
        .plan;
        store.save_meal_plan(&plan).await.unwrap();

        let Json(list) = get_grocery_list(State(state), Path(plan.id)).await.unwrap();
        assert_eq!(list.meal_plan_id, plan.id);
        assert_eq!(list.total_items, list.items.len());

        let summed: Nutrition = list.items.iter().map(|i| i.nutrition).sum();
        assert!(summed.approx_eq(&plan.total_nutrition(), 1e-6));

        let grams: f64 = list.items.iter().map(|i| i.total_quantity_grams).sum();
        let planned: f64 = plan.meal_foods().map(|f| f.quantity_grams).sum();
        assert!((grams - planned).abs() < 0.05 * list.total_items as f64);
    }

    #[tokio::test]
    async fn unknown_plan_is_not_found() {
        let (status, _) = get_grocery_list(State(AppState::fake()), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
