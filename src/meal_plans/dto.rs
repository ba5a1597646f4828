use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::generator::PlanFit;
use super::repo_types::{Meal, MealFood, MealPlan, MealPlanSummary, MealType};
use crate::catalog::FoodId;
use crate::nutrition::Nutrition;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Deserialize)]
pub struct GenerateMealPlanRequest {
    pub user_id: Uuid,
    /// Range-checked by the generator so bad counts surface as 400s.
    #[serde(default = "default_num_days")]
    pub num_days: i64,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    /// Overrides `PLAN_SEED`.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_num_days() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct MealFoodResponse {
    pub food_id: FoodId,
    pub food_name: String,
    pub quantity_grams: f64,
    pub nutrition: Nutrition,
}

#[derive(Debug, Serialize)]
pub struct MealResponse {
    pub id: Uuid,
    pub name: String,
    pub meal_type: MealType,
    pub day: u32,
    pub foods: Vec<MealFoodResponse>,
    pub total_nutrition: Nutrition,
}

#[derive(Debug, Serialize)]
pub struct MealPlanResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub end_date: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub meals: Vec<MealResponse>,
    pub total_nutrition: Nutrition,
}

#[derive(Debug, Serialize)]
pub struct GeneratedMealPlanResponse {
    pub meal_plan: MealPlanResponse,
    pub fit: PlanFit,
}

#[derive(Debug, Serialize)]
pub struct MealPlanListItem {
    pub id: Uuid,
    #[serde(with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub end_date: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub meal_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct MealPlanListQuery {
    pub user_id: Uuid,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl From<&MealFood> for MealFoodResponse {
    fn from(food: &MealFood) -> Self {
        Self {
            food_id: food.food_id,
            food_name: food.food_name.clone(),
            quantity_grams: food.quantity_grams,
            nutrition: food.nutrition(),
        }
    }
}

impl From<&Meal> for MealResponse {
    fn from(meal: &Meal) -> Self {
        Self {
            id: meal.id,
            name: meal.name.clone(),
            meal_type: meal.meal_type,
            day: meal.day,
            foods: meal.foods.iter().map(Into::into).collect(),
            total_nutrition: meal.total_nutrition(),
        }
    }
}

impl From<&MealPlan> for MealPlanResponse {
    fn from(plan: &MealPlan) -> Self {
        Self {
            id: plan.id,
            user_id: plan.user_id,
            start_date: plan.start_date,
            end_date: plan.end_date,
            created_at: plan.created_at,
            meals: plan.meals.iter().map(Into::into).collect(),
            total_nutrition: plan.total_nutrition(),
        }
    }
}

impl From<MealPlanSummary> for MealPlanListItem {
    fn from(s: MealPlanSummary) -> Self {
        Self {
            id: s.id,
            start_date: s.start_date,
            end_date: s.end_date,
            created_at: s.created_at,
            meal_count: s.meal_count,
        }
    }
}
