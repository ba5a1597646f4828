//! Multi-day meal plan search.
//!
//! Every day is planned on its own. Within a day each meal slot gets a share
//! of the daily targets; foods are picked greedily toward the macro with the
//! largest relative gap (randomized among the best few candidates), portions
//! are fitted by weighted least squares and then scaled onto the slot's
//! calories. Slots are retried until calories and protein land inside the
//! tolerance band, days until their totals do. Running out of retries fails
//! the request with `InsufficientFoodOptions`; only the deadline ends the
//! search early with the best day found so far, see [`Termination`].

use std::time::{Duration, Instant};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::repo_types::{Meal, MealFood, MealPlan, MealType};
use crate::catalog::Food;
use crate::constraints::AdmissibleFoods;
use crate::error::PlannerError;
use crate::nutrition::{aggregate, Macro, MacroProfile, Nutrition};
use crate::profiles::MetabolicTargets;

pub const MAX_DAYS: u32 = 30;

const THREE_MEALS: [(MealType, f64); 3] = [
    (MealType::Breakfast, 0.25),
    (MealType::Lunch, 0.35),
    (MealType::Dinner, 0.40),
];

const WITH_SNACK: [(MealType, f64); 4] = [
    (MealType::Breakfast, 0.25),
    (MealType::Lunch, 0.30),
    (MealType::Dinner, 0.35),
    (MealType::Snack, 0.10),
];

// calories, protein, carbs, fat
const FIT_WEIGHTS: [f64; 4] = [2.0, 2.0, 1.0, 1.0];
const PORTION_SWEEPS: usize = 25;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    /// Relative band, e.g. 0.10 for ±10%.
    pub tolerance: f64,
    /// Attempts per slot and per day.
    pub max_retries: u32,
    pub timeout: Option<Duration>,
    pub include_snack: bool,
    pub max_foods_per_meal: usize,
    pub min_portion_grams: f64,
    pub max_portion_grams: f64,
    pub candidate_pool: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            tolerance: 0.10,
            max_retries: 12,
            timeout: Some(Duration::from_millis(2000)),
            include_snack: false,
            max_foods_per_meal: 4,
            min_portion_grams: 10.0,
            max_portion_grams: 500.0,
            candidate_pool: 3,
        }
    }
}

impl GeneratorSettings {
    pub fn slots(&self) -> &'static [(MealType, f64)] {
        if self.include_snack {
            &WITH_SNACK
        } else {
            &THREE_MEALS
        }
    }
}

/// How a successful search ended. Exhausted retries are an error, not a
/// termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    ToleranceMet,
    /// At least one day kept its best candidate when the deadline passed.
    TimedOut,
}

/// How close a generated plan came to `num_days × daily targets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFit {
    pub tolerance: f64,
    pub expected: Nutrition,
    pub actual: Nutrition,
    pub calories_within: bool,
    pub protein_within: bool,
    pub carbs_within: bool,
    pub fat_within: bool,
    pub termination: Termination,
}

pub struct GenerationRequest<'a> {
    pub user_id: Uuid,
    pub targets: &'a MetabolicTargets,
    pub foods: &'a AdmissibleFoods,
    pub num_days: i64,
    pub start_date: Option<Date>,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct GeneratedPlan {
    pub plan: MealPlan,
    pub fit: PlanFit,
}

#[derive(Debug, Clone)]
pub struct MealPlanGenerator {
    settings: GeneratorSettings,
}

struct Portion<'f> {
    food: &'f Food,
    grams: f64,
}

struct DayCandidate<'f> {
    slots: Vec<(MealType, Vec<Portion<'f>>)>,
    totals: Nutrition,
}

impl MealPlanGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self { settings }
    }

    pub fn generate(&self, request: &GenerationRequest<'_>) -> Result<GeneratedPlan, PlannerError> {
        let num_days = u32::try_from(request.num_days)
            .ok()
            .filter(|d| (1..=MAX_DAYS).contains(d))
            .ok_or_else(|| {
                PlannerError::InvalidRequest(format!(
                    "num_days must be between 1 and {MAX_DAYS}, got {}",
                    request.num_days
                ))
            })?;
        let daily = daily_target(request.targets)?;
        let end_date = match request.start_date {
            Some(start) => Some(
                start
                    .checked_add(time::Duration::days(request.num_days - 1))
                    .ok_or_else(|| {
                        PlannerError::InvalidRequest(format!("start_date {start} is out of range"))
                    })?,
            ),
            None => None,
        };

        let foods: Vec<&Food> = request
            .foods
            .iter()
            .filter(|f| f.per_100g.calories > 0.0)
            .collect();
        if foods.is_empty() {
            let reason = if request.foods.is_empty() {
                "no admissible foods".to_string()
            } else {
                "no admissible food provides calories".to_string()
            };
            return Err(PlannerError::InsufficientFoodOptions {
                day: 1,
                slot: self.settings.slots()[0].0,
                reason,
            });
        }
        self.check_protein_density(&daily, &foods)?;

        let mut rng = StdRng::seed_from_u64(request.seed);
        let deadline = self.settings.timeout.map(|t| Instant::now() + t);
        let mut termination = Termination::ToleranceMet;
        let mut meals = Vec::new();
        let mut actual = Nutrition::default();

        for day in 1..=num_days {
            let (candidate, outcome) = self.search_day(day, &daily, &foods, &mut rng, deadline)?;
            termination = termination.max(outcome);
            actual += candidate.totals;
            meals.extend(candidate.slots.into_iter().map(|(meal_type, portions)| Meal {
                id: Uuid::new_v4(),
                name: format!("{} Day {day}", meal_type.label()),
                meal_type,
                day,
                foods: portions
                    .into_iter()
                    .map(|p| MealFood {
                        food_id: p.food.id,
                        food_name: p.food.name.clone(),
                        quantity_grams: p.grams,
                        per_100g: p.food.per_100g,
                    })
                    .collect(),
            }));
        }

        let expected = daily.scaled(f64::from(num_days));
        let fit = self.fit(expected, actual, termination);
        debug!(
            user_id = %request.user_id,
            num_days,
            meals = meals.len(),
            termination = ?fit.termination,
            "meal plan generated"
        );

        Ok(GeneratedPlan {
            plan: MealPlan {
                id: Uuid::new_v4(),
                user_id: request.user_id,
                meals,
                start_date: request.start_date,
                end_date,
                created_at: OffsetDateTime::now_utc(),
            },
            fit,
        })
    }

    /// Retries a whole day, keeping the closest candidate when none fits.
    fn search_day<'f>(
        &self,
        day: u32,
        daily: &Nutrition,
        foods: &[&'f Food],
        rng: &mut StdRng,
        deadline: Option<Instant>,
    ) -> Result<(DayCandidate<'f>, Termination), PlannerError> {
        let mut best = self.build_day(day, daily, foods, rng)?;
        let mut best_score = deviation(&best.totals, daily);

        for attempt in 1..self.settings.max_retries.max(1) {
            if self.day_fits(&best.totals, daily) {
                return Ok((best, Termination::ToleranceMet));
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(day, attempt, "generation deadline reached, keeping best candidate");
                return Ok((best, Termination::TimedOut));
            }
            let candidate = self.build_day(day, daily, foods, rng)?;
            let score = deviation(&candidate.totals, daily);
            debug!(day, attempt, score, best_score, "day candidate");
            if score < best_score {
                best = candidate;
                best_score = score;
            }
        }

        if self.day_fits(&best.totals, daily) {
            return Ok((best, Termination::ToleranceMet));
        }
        Err(self.day_out_of_band(day, daily, &best))
    }

    /// Every slot is scaled onto its calorie share, so its protein can never
    /// exceed the densest food's protein share of those calories.
    fn check_protein_density(&self, daily: &Nutrition, foods: &[&Food]) -> Result<(), PlannerError> {
        if !(daily.protein > 0.0) {
            return Ok(());
        }
        let required = daily.protein * Macro::Protein.kcal_per_gram() / daily.calories
            * (1.0 - self.settings.tolerance);
        let densest = foods
            .iter()
            .map(|f| f.per_100g.calorie_share(Macro::Protein))
            .fold(0.0, f64::max);
        if densest < required {
            return Err(PlannerError::InsufficientFoodOptions {
                day: 1,
                slot: self.settings.slots()[0].0,
                reason: format!(
                    "protein target of {:.1} g is unreachable: the most protein-dense admissible \
                     food gets {:.1}% of its calories from protein, at least {:.1}% is needed",
                    daily.protein,
                    densest * 100.0,
                    required * 100.0
                ),
            });
        }
        Ok(())
    }

    /// Blames the slot whose protein is furthest from its share.
    fn day_out_of_band(&self, day: u32, daily: &Nutrition, best: &DayCandidate<'_>) -> PlannerError {
        let worst = self
            .settings
            .slots()
            .iter()
            .zip(&best.slots)
            .map(|(&(slot, share), (_, portions))| {
                (slot, daily.protein * share, portion_totals(portions).protein)
            })
            .max_by(|a, b| relative_error(a.2, a.1).total_cmp(&relative_error(b.2, b.1)));
        let (slot, target, actual) =
            worst.unwrap_or((self.settings.slots()[0].0, daily.protein, best.totals.protein));
        warn!(
            day,
            %slot,
            calories = best.totals.calories,
            protein = best.totals.protein,
            "no day candidate within tolerance"
        );
        PlannerError::InsufficientFoodOptions {
            day,
            slot,
            reason: format!(
                "after {} attempts the closest day had {:.0} kcal and {:.1} g protein against \
                 {:.0} kcal and {:.1} g; this slot reached {:.1} g of its {:.1} g protein \
                 target (±{:.0}%)",
                self.settings.max_retries.max(1),
                best.totals.calories,
                best.totals.protein,
                daily.calories,
                daily.protein,
                actual,
                target,
                self.settings.tolerance * 100.0
            ),
        }
    }

    fn build_day<'f>(
        &self,
        day: u32,
        daily: &Nutrition,
        foods: &[&'f Food],
        rng: &mut StdRng,
    ) -> Result<DayCandidate<'f>, PlannerError> {
        let mut slots = Vec::new();
        let mut totals = Nutrition::default();
        for &(slot, share) in self.settings.slots() {
            let portions = self.build_slot(day, slot, &daily.scaled(share), foods, rng)?;
            totals += portion_totals(&portions);
            slots.push((slot, portions));
        }
        Ok(DayCandidate { slots, totals })
    }

    fn build_slot<'f>(
        &self,
        day: u32,
        slot: MealType,
        target: &Nutrition,
        foods: &[&'f Food],
        rng: &mut StdRng,
    ) -> Result<Vec<Portion<'f>>, PlannerError> {
        // closest calorie-fitting composition when protein never fits
        let mut fallback: Option<(f64, Vec<Portion<'f>>)> = None;
        for attempt in 0..self.settings.max_retries.max(1) {
            let portions = self.compose(target, foods, rng);
            let totals = portion_totals(&portions);
            if !portions.is_empty() && self.within(totals.calories, target.calories) {
                if self.within(totals.protein, target.protein) {
                    return Ok(portions);
                }
                let score = deviation(&totals, target);
                if fallback.as_ref().map_or(true, |(best, _)| score < *best) {
                    fallback = Some((score, portions));
                }
            }
            debug!(
                day,
                %slot,
                attempt,
                calories = totals.calories,
                protein = totals.protein,
                target = target.calories,
                "slot outside tolerance"
            );
        }
        if let Some((_, portions)) = fallback {
            return Ok(portions);
        }
        Err(PlannerError::InsufficientFoodOptions {
            day,
            slot,
            reason: format!(
                "no combination of the {} admissible foods reaches {:.0} kcal within {:.0}%",
                foods.len(),
                target.calories,
                self.settings.tolerance * 100.0
            ),
        })
    }

    /// One randomized greedy pass for a single slot.
    fn compose<'f>(
        &self,
        target: &Nutrition,
        foods: &[&'f Food],
        rng: &mut StdRng,
    ) -> Vec<Portion<'f>> {
        let max = self.settings.max_portion_grams;
        let mut chosen: Vec<&'f Food> = Vec::new();
        let mut grams: Vec<f64> = Vec::new();

        while chosen.len() < self.settings.max_foods_per_meal {
            let current = totals_of(&chosen, &grams);
            let gap = largest_gap(&current, target);

            let mut candidates: Vec<&'f Food> = foods
                .iter()
                .copied()
                .filter(|f| !chosen.iter().any(|c| c.id == f.id))
                .collect();
            if candidates.is_empty() {
                break;
            }
            candidates.sort_by(|a, b| {
                b.per_100g
                    .calorie_share(gap)
                    .total_cmp(&a.per_100g.calorie_share(gap))
                    .then(a.id.cmp(&b.id))
            });
            let pool = self.settings.candidate_pool.clamp(1, candidates.len());
            let pick = candidates[rng.gen_range(0..pool)];

            let remaining = (target.calories - current.calories).max(0.0);
            chosen.push(pick);
            grams.push((remaining * 100.0 / pick.per_100g.calories).clamp(0.0, max));
            fit_portions(&chosen, &mut grams, target, max);

            let now = totals_of(&chosen, &grams);
            if self.within(now.calories, target.calories) && self.within(now.protein, target.protein)
            {
                break;
            }
        }

        if grams.iter().any(|g| *g < self.settings.min_portion_grams) {
            (chosen, grams) = chosen
                .into_iter()
                .zip(grams)
                .filter(|(_, g)| *g >= self.settings.min_portion_grams)
                .unzip();
            fit_portions(&chosen, &mut grams, target, max);
        }

        let calories = totals_of(&chosen, &grams).calories;
        if calories > 0.0 {
            let factor = target.calories / calories;
            for g in grams.iter_mut() {
                *g = (*g * factor).min(max);
            }
        }

        chosen
            .into_iter()
            .zip(grams)
            .map(|(food, g)| Portion {
                food,
                grams: (g * 10.0).round() / 10.0,
            })
            .filter(|p| p.grams > 0.0)
            .collect()
    }

    fn within(&self, actual: f64, target: f64) -> bool {
        relative_error(actual, target) <= self.settings.tolerance + 1e-9
    }

    fn day_fits(&self, totals: &Nutrition, daily: &Nutrition) -> bool {
        self.within(totals.calories, daily.calories) && self.within(totals.protein, daily.protein)
    }

    fn fit(&self, expected: Nutrition, actual: Nutrition, termination: Termination) -> PlanFit {
        PlanFit {
            tolerance: self.settings.tolerance,
            calories_within: self.within(actual.calories, expected.calories),
            protein_within: self.within(actual.protein, expected.protein),
            carbs_within: self.within(actual.carbs, expected.carbs),
            fat_within: self.within(actual.fat, expected.fat),
            expected,
            actual,
            termination,
        }
    }
}

fn daily_target(targets: &MetabolicTargets) -> Result<Nutrition, PlannerError> {
    if !(targets.calorie_target > 0.0) {
        return Err(PlannerError::InvalidRequest(format!(
            "calorie target must be positive, got {}",
            targets.calorie_target
        )));
    }
    for (name, grams) in [
        ("protein_target", targets.protein_target),
        ("carb_target", targets.carb_target),
        ("fat_target", targets.fat_target),
    ] {
        if !(grams >= 0.0) {
            return Err(PlannerError::InvalidRequest(format!(
                "{name} cannot be negative, got {grams}"
            )));
        }
    }
    Ok(Nutrition {
        calories: targets.calorie_target,
        protein: targets.protein_target,
        carbs: targets.carb_target,
        fat: targets.fat_target,
        ..Nutrition::default()
    })
}

fn relative_error(actual: f64, target: f64) -> f64 {
    if target > 0.0 {
        (actual - target).abs() / target
    } else {
        0.0
    }
}

fn dims(n: &Nutrition) -> [f64; 4] {
    [n.calories, n.protein, n.carbs, n.fat]
}

fn per_gram(p: &MacroProfile) -> [f64; 4] {
    [p.calories, p.protein, p.carbs, p.fat].map(|v| v / 100.0)
}

/// Weighted sum of squared relative errors.
fn deviation(actual: &Nutrition, target: &Nutrition) -> f64 {
    dims(actual)
        .into_iter()
        .zip(dims(target))
        .zip(FIT_WEIGHTS)
        .map(|((a, t), w)| w * relative_error(a, t).powi(2))
        .sum()
}

fn largest_gap(current: &Nutrition, target: &Nutrition) -> Macro {
    let mut best = Macro::Protein;
    let mut best_gap = f64::NEG_INFINITY;
    for m in Macro::ALL {
        let t = target.grams_of(m);
        if t <= 0.0 {
            continue;
        }
        let gap = (t - current.grams_of(m)) / t;
        if gap > best_gap {
            best = m;
            best_gap = gap;
        }
    }
    best
}

fn totals_of(foods: &[&Food], grams: &[f64]) -> Nutrition {
    aggregate(foods.iter().zip(grams).map(|(f, g)| (&f.per_100g, *g)))
}

fn portion_totals(portions: &[Portion<'_>]) -> Nutrition {
    aggregate(portions.iter().map(|p| (&p.food.per_100g, p.grams)))
}

/// Coordinate descent on the weighted relative squared error, each portion
/// kept inside `[0, max]`.
fn fit_portions(foods: &[&Food], grams: &mut [f64], target: &Nutrition, max: f64) {
    let coeffs: Vec<[f64; 4]> = foods.iter().map(|f| per_gram(&f.per_100g)).collect();
    let target = dims(target);

    for _ in 0..PORTION_SWEEPS {
        for j in 0..grams.len() {
            let mut num = 0.0;
            let mut den = 0.0;
            for k in 0..4 {
                let t = target[k];
                if t <= 0.0 {
                    continue;
                }
                let others: f64 = coeffs
                    .iter()
                    .zip(grams.iter())
                    .enumerate()
                    .filter(|(i, _)| *i != j)
                    .map(|(_, (a, g))| a[k] * g)
                    .sum();
                let a = coeffs[j][k];
                num += FIT_WEIGHTS[k] * a * (t - others) / (t * t);
                den += FIT_WEIGHTS[k] * a * a / (t * t);
            }
            if den > 0.0 {
                grams[j] = (num / den).clamp(0.0, max);
            }
        }
    }
}
