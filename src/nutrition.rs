use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Macronutrients that carry calories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Macro {
    Protein,
    Carbs,
    Fat,
}

impl Macro {
    pub const ALL: [Macro; 3] = [Macro::Protein, Macro::Carbs, Macro::Fat];

    pub const fn kcal_per_gram(self) -> f64 {
        match self {
            Macro::Protein | Macro::Carbs => 4.0,
            Macro::Fat => 9.0,
        }
    }
}

/// Nutrition of 100 g of a food.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroProfile {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default)]
    pub fiber: Option<f64>,
    #[serde(default)]
    pub sugar: Option<f64>,
}

impl MacroProfile {
    pub fn grams_of(&self, m: Macro) -> f64 {
        match m {
            Macro::Protein => self.protein,
            Macro::Carbs => self.carbs,
            Macro::Fat => self.fat,
        }
    }

    /// Fraction of the food's calories that come from `m`.
    ///
    /// Catalog figures are measured, not derived from 4/4/9, so the share can
    /// slightly exceed 1.0 for nearly pure foods.
    pub fn calorie_share(&self, m: Macro) -> f64 {
        if self.calories <= 0.0 {
            return 0.0;
        }
        self.grams_of(m) * m.kcal_per_gram() / self.calories
    }

    /// Checks the ranges accepted for catalog entries.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1000.0).contains(&self.calories) {
            return Err(format!("calories per 100g out of range: {}", self.calories));
        }
        for m in Macro::ALL {
            let grams = self.grams_of(m);
            if !(0.0..=100.0).contains(&grams) {
                return Err(format!("{m:?} per 100g out of range: {grams}"));
            }
        }
        for (label, value) in [("fiber", self.fiber), ("sugar", self.sugar)] {
            if let Some(v) = value {
                if !(v >= 0.0) {
                    return Err(format!("{label} per 100g cannot be negative: {v}"));
                }
            }
        }
        Ok(())
    }
}

/// Absolute nutrition totals for some amount of food.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
}

impl Nutrition {
    /// Contribution of `grams` of a food, scaled linearly from its per-100g profile.
    pub fn of(profile: &MacroProfile, grams: f64) -> Self {
        let factor = grams / 100.0;
        Self {
            calories: profile.calories * factor,
            protein: profile.protein * factor,
            carbs: profile.carbs * factor,
            fat: profile.fat * factor,
            fiber: profile.fiber.unwrap_or(0.0) * factor,
            sugar: profile.sugar.unwrap_or(0.0) * factor,
        }
    }

    pub fn grams_of(&self, m: Macro) -> f64 {
        match m {
            Macro::Protein => self.protein,
            Macro::Carbs => self.carbs,
            Macro::Fat => self.fat,
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein: self.protein * factor,
            carbs: self.carbs * factor,
            fat: self.fat * factor,
            fiber: self.fiber * factor,
            sugar: self.sugar * factor,
        }
    }

    #[cfg(test)]
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        (self.calories - other.calories).abs() <= eps
            && (self.protein - other.protein).abs() <= eps
            && (self.carbs - other.carbs).abs() <= eps
            && (self.fat - other.fat).abs() <= eps
            && (self.fiber - other.fiber).abs() <= eps
            && (self.sugar - other.sugar).abs() <= eps
    }
}

impl Add for Nutrition {
    type Output = Nutrition;

    fn add(mut self, rhs: Nutrition) -> Nutrition {
        self += rhs;
        self
    }
}

impl AddAssign for Nutrition {
    fn add_assign(&mut self, rhs: Nutrition) {
        self.calories += rhs.calories;
        self.protein += rhs.protein;
        self.carbs += rhs.carbs;
        self.fat += rhs.fat;
        self.fiber += rhs.fiber;
        self.sugar += rhs.sugar;
    }
}

impl Sum for Nutrition {
    fn sum<I: Iterator<Item = Nutrition>>(iter: I) -> Self {
        iter.fold(Nutrition::default(), Add::add)
    }
}

impl<'a> Sum<&'a Nutrition> for Nutrition {
    fn sum<I: Iterator<Item = &'a Nutrition>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Total nutrition of a collection of (profile, grams) entries.
pub fn aggregate<'a, I>(entries: I) -> Nutrition
where
    I: IntoIterator<Item = (&'a MacroProfile, f64)>,
{
    entries
        .into_iter()
        .map(|(profile, grams)| Nutrition::of(profile, grams))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apple() -> MacroProfile {
        MacroProfile {
            calories: 52.0,
            protein: 0.26,
            carbs: 14.0,
            fat: 0.17,
            fiber: Some(2.4),
            sugar: Some(10.4),
        }
    }

    fn olive_oil() -> MacroProfile {
        MacroProfile {
            calories: 884.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 100.0,
            fiber: None,
            sugar: None,
        }
    }

    #[test]
    fn scales_linearly_from_per_100g() {
        let n = Nutrition::of(&apple(), 150.0);
        assert!((n.calories - 78.0).abs() < 1e-9);
        assert!((n.carbs - 21.0).abs() < 1e-9);
        assert!((n.fiber - 3.6).abs() < 1e-9);
    }

    #[test]
    fn missing_fiber_counts_as_zero() {
        let n = Nutrition::of(&olive_oil(), 10.0);
        assert_eq!(n.fiber, 0.0);
        assert_eq!(n.sugar, 0.0);
        assert!((n.fat - 10.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_ignores_order() {
        let a = apple();
        let o = olive_oil();
        let forward = aggregate([(&a, 120.0), (&o, 15.0), (&a, 30.0)]);
        let backward = aggregate([(&a, 30.0), (&o, 15.0), (&a, 120.0)]);
        assert!(forward.approx_eq(&backward, 1e-9));
    }

    #[test]
    fn adding_an_entry_adds_its_contribution() {
        let a = apple();
        let o = olive_oil();
        let before = aggregate([(&a, 100.0)]);
        let after = aggregate([(&a, 100.0), (&o, 20.0)]);
        assert!(after.approx_eq(&(before + Nutrition::of(&o, 20.0)), 1e-9));
    }

    #[test]
    fn calorie_share_uses_macro_energy_density() {
        let o = olive_oil();
        assert!((o.calorie_share(Macro::Fat) - 900.0 / 884.0).abs() < 1e-9);
        assert_eq!(o.calorie_share(Macro::Protein), 0.0);
    }

    #[test]
    fn validate_rejects_negative_and_oversized_values() {
        let mut p = apple();
        p.protein = -1.0;
        assert!(p.validate().is_err());
        let mut p = apple();
        p.calories = 1200.0;
        assert!(p.validate().is_err());
        let mut p = apple();
        p.sugar = Some(-0.5);
        assert!(p.validate().is_err());
        assert!(apple().validate().is_ok());
    }
}
