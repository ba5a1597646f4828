mod dto;
pub mod handlers;
pub mod repo_types;
pub mod seed;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use repo_types::{CategoryId, DietaryPattern, Food, FoodCategory, FoodId};
pub use services::{CatalogError, FoodCatalog};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::read_routes())
}
