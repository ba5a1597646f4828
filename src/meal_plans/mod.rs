pub mod dto;
pub mod generator;
pub mod handlers;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub use generator::GeneratorSettings;
pub use repo_types::{Meal, MealFood, MealPlan, MealPlanSummary};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
