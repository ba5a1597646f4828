pub mod dto;
pub mod handlers;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use repo_types::{UserAllergy, UserConstraints, UserDietaryPreference, UserFoodDislike};
pub use services::{AdmissibleFoods, ConstraintResolver};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::read_routes())
}
