//! BMR / TDEE / calorie and macro targets.
//!
//! BMR uses the Mifflin-St Jeor equation:
//! `10 x kg + 6.25 x cm - 5 x age + 5` (male, other) or `- 161` (female).

use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::ProfileInput;
use super::repo_types::{ActivityLevel, Gender, MetabolicTargets, UserProfile, WeightGoal};
use crate::error::PlannerError;
use crate::nutrition::Macro;

pub const CALORIES_PER_POUND: f64 = 3500.0;

pub const PROTEIN_SHARE: f64 = 0.30;
pub const CARB_SHARE: f64 = 0.40;
pub const FAT_SHARE: f64 = 0.30;

const KG_PER_LB: f64 = 0.453592;
const CM_PER_INCH: f64 = 2.54;

const MAX_AGE: i64 = 150;
const MAX_HEIGHT_IN: f64 = 120.0;
const MAX_WEIGHT_LBS: f64 = 1000.0;
const MIN_RATE: f64 = 0.1;
const MAX_RATE: f64 = 5.0;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn bmr(weight_lbs: f64, height_in: f64, age: u32, gender: Gender) -> f64 {
    let weight_kg = weight_lbs * KG_PER_LB;
    let height_cm = height_in * CM_PER_INCH;
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    let offset = match gender {
        Gender::Female => -161.0,
        Gender::Male | Gender::Other => 5.0,
    };
    round_to(base + offset, 2)
}

pub fn tdee(bmr: f64, activity: ActivityLevel) -> f64 {
    round_to(bmr * activity.multiplier(), 2)
}

/// Whole-kcal daily adjustment for a weekly weight change.
pub fn daily_calorie_delta(lbs_per_week: f64) -> f64 {
    (lbs_per_week * CALORIES_PER_POUND / 7.0).round()
}

pub fn calorie_target(
    tdee: f64,
    goal: WeightGoal,
    lbs_per_week: Option<f64>,
) -> Result<f64, PlannerError> {
    let target = match goal {
        WeightGoal::Maintain => return Ok(tdee),
        WeightGoal::Lose => tdee - daily_calorie_delta(checked_rate(goal, lbs_per_week)?),
        WeightGoal::Gain => tdee + daily_calorie_delta(checked_rate(goal, lbs_per_week)?),
    };
    if target <= 0.0 {
        return Err(PlannerError::invalid_profile(
            "weight_change_per_week",
            format!("leaves a non-positive calorie target ({target:.0} kcal)"),
        ));
    }
    Ok(target)
}

fn checked_rate(goal: WeightGoal, lbs_per_week: Option<f64>) -> Result<f64, PlannerError> {
    let rate = lbs_per_week.ok_or_else(|| {
        PlannerError::invalid_profile(
            "weight_change_per_week",
            format!("is required for goal '{goal}'"),
        )
    })?;
    if !(MIN_RATE..=MAX_RATE).contains(&rate) {
        return Err(PlannerError::invalid_profile(
            "weight_change_per_week",
            format!("must be between {MIN_RATE} and {MAX_RATE} lbs/week, got {rate}"),
        ));
    }
    Ok(rate)
}

/// Protein/carb/fat grams for a 30/40/30 calorie split.
pub fn macro_targets(calorie_target: f64) -> (f64, f64, f64) {
    let grams = |share: f64, m: Macro| round_to(calorie_target * share / m.kcal_per_gram(), 2);
    (
        grams(PROTEIN_SHARE, Macro::Protein),
        grams(CARB_SHARE, Macro::Carbs),
        grams(FAT_SHARE, Macro::Fat),
    )
}

pub fn derive_targets(
    weight_lbs: f64,
    height_in: f64,
    age: u32,
    gender: Gender,
    activity: ActivityLevel,
    goal: WeightGoal,
    lbs_per_week: Option<f64>,
) -> Result<MetabolicTargets, PlannerError> {
    let bmr = bmr(weight_lbs, height_in, age, gender);
    let tdee = tdee(bmr, activity);
    let calorie_target = calorie_target(tdee, goal, lbs_per_week)?;
    let (protein_target, carb_target, fat_target) = macro_targets(calorie_target);
    Ok(MetabolicTargets {
        bmr,
        tdee,
        calorie_target,
        protein_target,
        carb_target,
        fat_target,
    })
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, PlannerError> {
    value.ok_or_else(|| PlannerError::invalid_profile(field, "is required"))
}

/// Validates raw fields and recomputes every derived value. Callers invoke
/// this after each change to the raw fields.
pub fn derive_profile(
    user_id: Uuid,
    input: &ProfileInput,
    now: OffsetDateTime,
) -> Result<UserProfile, PlannerError> {
    let age = required(input.age, "age")?;
    if !(0..=MAX_AGE).contains(&age) {
        return Err(PlannerError::invalid_profile(
            "age",
            format!("must be between 0 and {MAX_AGE}"),
        ));
    }
    let age = age as u32;
    let gender = required(input.gender, "gender")?;
    let height = required(input.height, "height")?;
    if !(height > 0.0 && height <= MAX_HEIGHT_IN) {
        return Err(PlannerError::invalid_profile(
            "height",
            format!("must be between 0 and {MAX_HEIGHT_IN} in"),
        ));
    }
    let weight = required(input.weight, "weight")?;
    if !(weight > 0.0 && weight <= MAX_WEIGHT_LBS) {
        return Err(PlannerError::invalid_profile(
            "weight",
            format!("must be between 0 and {MAX_WEIGHT_LBS} lbs"),
        ));
    }
    let activity = required(input.activity_level, "activity_level")?;
    let goal = input.weight_goal_type;

    if let Some(goal_weight) = input.goal_weight {
        let on_wrong_side = match goal {
            WeightGoal::Lose => goal_weight >= weight,
            WeightGoal::Gain => goal_weight <= weight,
            WeightGoal::Maintain => false,
        };
        if !(goal_weight > 0.0 && goal_weight <= MAX_WEIGHT_LBS) || on_wrong_side {
            return Err(PlannerError::invalid_profile(
                "goal_weight",
                format!("{goal_weight} lbs is not a valid target to {goal} from {weight} lbs"),
            ));
        }
    }

    let targets = derive_targets(
        weight,
        height,
        age,
        gender,
        activity,
        goal,
        input.weight_change_per_week,
    )?;

    let weeks_to_goal = match (goal, input.goal_weight, input.weight_change_per_week) {
        (WeightGoal::Maintain, _, _) => None,
        (_, Some(goal_weight), Some(rate)) => Some(round_to((weight - goal_weight).abs() / rate, 1)),
        _ => None,
    };

    Ok(UserProfile {
        user_id,
        age,
        gender,
        height,
        weight,
        activity_level: activity,
        weight_goal_type: goal,
        goal_weight: input.goal_weight,
        weight_change_per_week: input.weight_change_per_week,
        targets,
        weeks_to_goal,
        updated_at: now,
    })
}
