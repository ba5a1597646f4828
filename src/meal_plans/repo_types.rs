use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::catalog::FoodId;
use crate::nutrition::{MacroProfile, Nutrition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

text_enum!(MealType {
    Breakfast => "breakfast",
    Lunch => "lunch",
    Dinner => "dinner",
    Snack => "snack",
});

impl MealType {
    pub const fn label(self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        }
    }
}

/// A portion of one food inside a meal.
///
/// The food's name and per-100g profile are captured when the meal is built,
/// so later catalog edits never change a stored plan.
#[derive(Debug, Clone, PartialEq)]
pub struct MealFood {
    pub food_id: FoodId,
    pub food_name: String,
    pub quantity_grams: f64,
    pub per_100g: MacroProfile,
}

impl MealFood {
    pub fn nutrition(&self) -> Nutrition {
        Nutrition::of(&self.per_100g, self.quantity_grams)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub meal_type: MealType,
    /// 1-based day within the plan.
    pub day: u32,
    pub foods: Vec<MealFood>,
}

impl Meal {
    pub fn total_nutrition(&self) -> Nutrition {
        self.foods.iter().map(MealFood::nutrition).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meals: Vec<Meal>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub created_at: OffsetDateTime,
}

impl MealPlan {
    pub fn total_nutrition(&self) -> Nutrition {
        self.meal_foods().map(MealFood::nutrition).sum()
    }

    pub fn meal_foods(&self) -> impl Iterator<Item = &MealFood> {
        self.meals.iter().flat_map(|m| m.foods.iter())
    }

    #[cfg(test)]
    pub fn num_days(&self) -> u32 {
        self.meals.iter().map(|m| m.day).max().unwrap_or(0)
    }
}

/// Listing row: a plan without its meals.
#[derive(Debug, Clone, PartialEq)]
pub struct MealPlanSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub created_at: OffsetDateTime,
    pub meal_count: usize,
}

impl From<&MealPlan> for MealPlanSummary {
    fn from(plan: &MealPlan) -> Self {
        Self {
            id: plan.id,
            user_id: plan.user_id,
            start_date: plan.start_date,
            end_date: plan.end_date,
            created_at: plan.created_at,
            meal_count: plan.meals.len(),
        }
    }
}
