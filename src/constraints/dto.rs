use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::FoodId;

/// Human-readable overview of a user's constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSummary {
    pub dietary_patterns: Vec<String>,
    pub allergies: Vec<String>,
    pub dislikes: Vec<String>,
    pub total_allowed_foods: usize,
    pub total_excluded_foods: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodAllowance {
    pub food_id: FoodId,
    pub food_name: String,
    pub is_allowed: bool,
    pub exclusion_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AllowanceQuery {
    pub user_id: Uuid,
}
