use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::nutrition::MacroProfile;

pub type FoodId = i64;
pub type CategoryId = i64;
pub type PatternId = i64;

/// Classification key used by dietary pattern exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

/// Catalog entry. Nutrition is given per 100 g.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: FoodId,
    pub name: String,
    pub per_100g: MacroProfile,
    pub categories: BTreeSet<CategoryId>,
}

/// Reusable diet definition, e.g. vegetarian = no meat, no fish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DietaryPattern {
    pub id: PatternId,
    pub name: String,
    pub description: Option<String>,
    pub excluded_categories: BTreeSet<CategoryId>,
}
