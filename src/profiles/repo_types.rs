use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Activity levels, least to most active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtraActive,
}

impl ActivityLevel {
    /// TDEE multiplier applied to BMR.
    pub const fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtraActive => 1.9,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightGoal {
    Lose,
    #[default]
    Maintain,
    Gain,
}

text_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

text_enum!(ActivityLevel {
    Sedentary => "sedentary",
    LightlyActive => "lightly_active",
    ModeratelyActive => "moderately_active",
    VeryActive => "very_active",
    ExtraActive => "extra_active",
});

text_enum!(WeightGoal {
    Lose => "lose",
    Maintain => "maintain",
    Gain => "gain",
});

/// Values derived from the raw profile fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetabolicTargets {
    pub bmr: f64,
    pub tdee: f64,
    pub calorie_target: f64,
    pub protein_target: f64,
    pub carb_target: f64,
    pub fat_target: f64,
}

/// Stored profile: raw fields plus their derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub age: u32,
    pub gender: Gender,
    /// inches
    pub height: f64,
    /// lbs
    pub weight: f64,
    pub activity_level: ActivityLevel,
    pub weight_goal_type: WeightGoal,
    pub goal_weight: Option<f64>,
    pub weight_change_per_week: Option<f64>,
    #[serde(flatten)]
    pub targets: MetabolicTargets,
    pub weeks_to_goal: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
