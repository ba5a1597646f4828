use serde::{Deserialize, Serialize};

use crate::catalog::{DietaryPattern, FoodId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

text_enum!(Severity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
});

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
        }
    }
}

/// A user's opt-in to a shared dietary pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDietaryPreference {
    pub pattern: DietaryPattern,
    pub custom_notes: Option<String>,
}

/// Severity is informational; every allergy excludes strictly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAllergy {
    pub allergen_name: String,
    pub food_id: Option<FoodId>,
    pub severity: Severity,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFoodDislike {
    pub food_id: FoodId,
    pub reason: Option<String>,
}

/// Everything that limits which foods a user may be served.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConstraints {
    #[serde(default)]
    pub preferences: Vec<UserDietaryPreference>,
    #[serde(default)]
    pub allergies: Vec<UserAllergy>,
    #[serde(default)]
    pub dislikes: Vec<UserFoodDislike>,
}

impl UserConstraints {
    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty() && self.allergies.is_empty() && self.dislikes.is_empty()
    }
}
