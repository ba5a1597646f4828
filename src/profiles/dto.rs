use serde::Deserialize;

use super::repo_types::{ActivityLevel, Gender, WeightGoal};

/// Raw, user-editable profile fields. Everything is optional on the wire so
/// that a missing field is reported by name instead of as a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    /// inches
    pub height: Option<f64>,
    /// lbs
    pub weight: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    #[serde(default)]
    pub weight_goal_type: WeightGoal,
    pub goal_weight: Option<f64>,
    /// lbs per week, required unless maintaining
    pub weight_change_per_week: Option<f64>,
}
