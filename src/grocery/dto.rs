use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::FoodId;
use crate::nutrition::Nutrition;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    pub food_id: FoodId,
    pub food_name: String,
    pub total_quantity_grams: f64,
    pub nutrition: Nutrition,
}

/// Shopping list for one meal plan, items sorted by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryList {
    pub meal_plan_id: Uuid,
    pub items: Vec<GroceryItem>,
    pub total_items: usize,
}
