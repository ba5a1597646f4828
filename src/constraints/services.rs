use std::collections::{BTreeMap, BTreeSet};

use regex::{Regex, RegexBuilder};

use super::dto::{ConstraintSummary, FoodAllowance};
use super::repo_types::UserConstraints;
use crate::catalog::{Food, FoodCatalog, FoodId};
use crate::error::PlannerError;

/// Foods a user may be served, ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdmissibleFoods {
    foods: BTreeMap<FoodId, Food>,
}

impl AdmissibleFoods {
    #[cfg(test)]
    pub fn contains(&self, id: FoodId) -> bool {
        self.foods.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Food> {
        self.foods.values()
    }

    #[cfg(test)]
    pub fn ids(&self) -> BTreeSet<FoodId> {
        self.foods.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }
}

impl FromIterator<Food> for AdmissibleFoods {
    fn from_iter<I: IntoIterator<Item = Food>>(iter: I) -> Self {
        Self {
            foods: iter.into_iter().map(|f| (f.id, f)).collect(),
        }
    }
}

/// Applies a user's dietary patterns, allergies and dislikes to a catalog
/// snapshot. Pure: no I/O, same inputs give the same answer.
pub struct ConstraintResolver<'a> {
    catalog: &'a FoodCatalog,
    constraints: &'a UserConstraints,
    // Parallel to `constraints.allergies`; set only for allergies without a linked food.
    allergen_matchers: Vec<Option<Regex>>,
}

impl<'a> ConstraintResolver<'a> {
    pub fn new(
        catalog: &'a FoodCatalog,
        constraints: &'a UserConstraints,
    ) -> Result<Self, PlannerError> {
        let mut seen_patterns = BTreeSet::new();
        for pref in &constraints.preferences {
            if !seen_patterns.insert(pref.pattern.id) {
                return Err(PlannerError::InvalidRequest(format!(
                    "dietary pattern '{}' is listed more than once",
                    pref.pattern.name
                )));
            }
            catalog.validate_pattern(&pref.pattern)?;
        }

        let allergen_matchers = constraints
            .allergies
            .iter()
            .map(|allergy| match allergy.food_id {
                Some(id) if catalog.food(id).is_none() => Err(PlannerError::InvalidRequest(
                    format!("allergy references unknown food {id}"),
                )),
                Some(_) => Ok(None),
                None => {
                    let name = allergy.allergen_name.trim();
                    if name.is_empty() {
                        return Err(PlannerError::InvalidRequest(
                            "allergy needs either a food or an allergen name".into(),
                        ));
                    }
                    RegexBuilder::new(&regex::escape(name))
                        .case_insensitive(true)
                        .build()
                        .map(Some)
                        .map_err(|e| {
                            PlannerError::InvalidRequest(format!("allergen '{name}': {e}"))
                        })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(dislike) = constraints
            .dislikes
            .iter()
            .find(|d| catalog.food(d.food_id).is_none())
        {
            return Err(PlannerError::InvalidRequest(format!(
                "dislike references unknown food {}",
                dislike.food_id
            )));
        }

        Ok(Self {
            catalog,
            constraints,
            allergen_matchers,
        })
    }

    /// Every rule the food breaks, in pattern, allergy, dislike order.
    pub fn exclusion_reasons(&self, food: &Food) -> Vec<String> {
        let mut reasons = Vec::new();

        for pref in &self.constraints.preferences {
            let conflicting: Vec<&str> = pref
                .pattern
                .excluded_categories
                .intersection(&food.categories)
                .filter_map(|id| self.catalog.category(*id))
                .map(|c| c.name.as_str())
                .collect();
            if !conflicting.is_empty() {
                reasons.push(format!(
                    "Violates {} diet (contains: {})",
                    pref.pattern.name,
                    conflicting.join(", ")
                ));
            }
        }

        for (allergy, matcher) in self
            .constraints
            .allergies
            .iter()
            .zip(&self.allergen_matchers)
        {
            match (allergy.food_id, matcher) {
                (Some(id), _) if id == food.id => reasons.push(format!(
                    "Allergic to {} (severity: {})",
                    food.name,
                    allergy.severity.label()
                )),
                (None, Some(re)) if re.is_match(&food.name) => reasons.push(format!(
                    "Contains allergen: {} (severity: {})",
                    allergy.allergen_name.trim(),
                    allergy.severity.label()
                )),
                _ => {}
            }
        }

        for dislike in self.constraints.dislikes.iter().filter(|d| d.food_id == food.id) {
            match dislike.reason.as_deref().map(str::trim) {
                Some(reason) if !reason.is_empty() => {
                    reasons.push(format!("User dislikes this food: {reason}"))
                }
                _ => reasons.push("User dislikes this food".to_string()),
            }
        }

        reasons
    }

    pub fn is_allowed(&self, food: &Food) -> bool {
        self.exclusion_reasons(food).is_empty()
    }

    pub fn admissible(&self) -> AdmissibleFoods {
        if self.constraints.is_empty() {
            return self.catalog.foods().cloned().collect();
        }
        self.catalog
            .foods()
            .filter(|f| self.is_allowed(f))
            .cloned()
            .collect()
    }

    pub fn check(&self, food_id: FoodId) -> Result<FoodAllowance, PlannerError> {
        let food = self
            .catalog
            .food(food_id)
            .ok_or_else(|| PlannerError::NotFound(format!("food {food_id}")))?;
        let exclusion_reasons = self.exclusion_reasons(food);
        Ok(FoodAllowance {
            food_id,
            food_name: food.name.clone(),
            is_allowed: exclusion_reasons.is_empty(),
            exclusion_reasons,
        })
    }

    pub fn summary(&self) -> ConstraintSummary {
        let food_name = |id: FoodId| {
            self.catalog
                .food(id)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| format!("food {id}"))
        };

        let dietary_patterns = self
            .constraints
            .preferences
            .iter()
            .map(|p| p.pattern.name.clone())
            .collect();

        let allergies = self
            .constraints
            .allergies
            .iter()
            .map(|a| {
                let subject = match a.food_id {
                    Some(id) => food_name(id),
                    None => a.allergen_name.trim().to_string(),
                };
                format!("{subject} ({})", a.severity.label())
            })
            .collect();

        let dislikes = self
            .constraints
            .dislikes
            .iter()
            .map(|d| match d.reason.as_deref().map(str::trim) {
                Some(reason) if !reason.is_empty() => format!("{}: {reason}", food_name(d.food_id)),
                _ => food_name(d.food_id),
            })
            .collect();

        let total_allowed_foods = self.admissible().len();
        ConstraintSummary {
            dietary_patterns,
            allergies,
            dislikes,
            total_allowed_foods,
            total_excluded_foods: self.catalog.len() - total_allowed_foods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{seed, FoodCategory};
    use crate::constraints::repo_types::{
        Severity, UserAllergy, UserDietaryPreference, UserFoodDislike,
    };
    use crate::nutrition::MacroProfile;

    fn prefer(name: &str) -> UserDietaryPreference {
        UserDietaryPreference {
            pattern: seed::pattern(name).expect("seed pattern"),
            custom_notes: None,
        }
    }

    fn allergy(name: &str, food_id: Option<FoodId>, severity: Severity) -> UserAllergy {
        UserAllergy {
            allergen_name: name.into(),
            food_id,
            severity,
            notes: None,
        }
    }

    fn dislike(food_id: FoodId, reason: Option<&str>) -> UserFoodDislike {
        UserFoodDislike {
            food_id,
            reason: reason.map(Into::into),
        }
    }

    #[test]
    fn no_constraints_admits_whole_catalog() {
        let catalog = seed::catalog();
        let constraints = UserConstraints::default();
        let resolver = ConstraintResolver::new(&catalog, &constraints).unwrap();
        assert_eq!(resolver.admissible().len(), catalog.len());
    }

    #[test]
    fn vegetarian_excludes_meat_and_fish() {
        let catalog = seed::catalog();
        let constraints = UserConstraints {
            preferences: vec![prefer("Vegetarian")],
            ..Default::default()
        };
        let admissible = ConstraintResolver::new(&catalog, &constraints)
            .unwrap()
            .admissible();
        for id in [1, 2, 5] {
            assert!(!admissible.contains(id));
        }
        assert!(admissible.contains(3));
        assert!(admissible.contains(4));
        assert_eq!(admissible.len(), 17);
    }

    #[test]
    fn resolution_is_idempotent() {
        let catalog = seed::catalog();
        let constraints = UserConstraints {
            preferences: vec![prefer("Dairy-Free"), prefer("Gluten-Free")],
            allergies: vec![allergy("almond", None, Severity::Severe)],
            dislikes: vec![dislike(12, None)],
        };
        let first = ConstraintResolver::new(&catalog, &constraints)
            .unwrap()
            .admissible();
        let second = ConstraintResolver::new(&catalog, &constraints)
            .unwrap()
            .admissible();
        assert_eq!(first, second);
    }

    #[test]
    fn adding_a_dislike_never_grows_the_admissible_set() {
        let catalog = seed::catalog();
        let mut constraints = UserConstraints {
            preferences: vec![prefer("Pescatarian")],
            ..Default::default()
        };
        let mut previous = ConstraintResolver::new(&catalog, &constraints)
            .unwrap()
            .admissible()
            .ids();
        for food in catalog.foods() {
            constraints.dislikes.push(dislike(food.id, None));
            let current = ConstraintResolver::new(&catalog, &constraints)
                .unwrap()
                .admissible()
                .ids();
            assert!(current.is_subset(&previous));
            assert!(!current.contains(&food.id));
            previous = current;
        }
        assert!(previous.is_empty());
    }

    #[test]
    fn reasons_accumulate_across_rules() {
        let catalog = seed::catalog();
        let constraints = UserConstraints {
            preferences: vec![prefer("Vegetarian")],
            allergies: vec![allergy("salmon", None, Severity::Mild)],
            dislikes: vec![dislike(2, Some("too fishy"))],
        };
        let resolver = ConstraintResolver::new(&catalog, &constraints).unwrap();
        let allowance = resolver.check(2).unwrap();
        assert!(!allowance.is_allowed);
        assert_eq!(
            allowance.exclusion_reasons,
            vec![
                "Violates Vegetarian diet (contains: Fish)".to_string(),
                "Contains allergen: salmon (severity: Mild)".to_string(),
                "User dislikes this food: too fishy".to_string(),
            ]
        );
        assert!(resolver.check(15).unwrap().is_allowed);
    }

    #[test]
    fn allergen_name_matches_case_insensitively() {
        let catalog = seed::catalog();
        let constraints = UserConstraints {
            allergies: vec![allergy("ALMOND", None, Severity::Mild)],
            ..Default::default()
        };
        let admissible = ConstraintResolver::new(&catalog, &constraints)
            .unwrap()
            .admissible();
        assert!(!admissible.contains(19));
        assert_eq!(admissible.len(), catalog.len() - 1);
    }

    #[test]
    fn linked_allergy_excludes_only_its_food() {
        let catalog = seed::catalog();
        let constraints = UserConstraints {
            allergies: vec![allergy("egg", Some(1), Severity::Severe)],
            ..Default::default()
        };
        let resolver = ConstraintResolver::new(&catalog, &constraints).unwrap();
        assert!(!resolver.check(1).unwrap().is_allowed);
        assert!(resolver.check(3).unwrap().is_allowed);
        assert_eq!(
            resolver.check(1).unwrap().exclusion_reasons,
            vec!["Allergic to Chicken Breast (cooked) (severity: Severe)".to_string()]
        );
    }

    #[test]
    fn excluding_every_category_leaves_nothing() {
        let categories = vec![
            FoodCategory {
                id: 1,
                name: "dairy".into(),
                description: None,
            },
            FoodCategory {
                id: 2,
                name: "meat".into(),
                description: None,
            },
        ];
        let profile = MacroProfile {
            calories: 150.0,
            protein: 20.0,
            carbs: 2.0,
            fat: 7.0,
            fiber: None,
            sugar: None,
        };
        let foods = vec![
            Food {
                id: 1,
                name: "Cheddar".into(),
                per_100g: profile,
                categories: [1].into_iter().collect(),
            },
            Food {
                id: 2,
                name: "Pork".into(),
                per_100g: profile,
                categories: [2].into_iter().collect(),
            },
        ];
        let catalog = FoodCatalog::new(categories, foods).unwrap();
        let constraints = UserConstraints {
            preferences: vec![UserDietaryPreference {
                pattern: crate::catalog::DietaryPattern {
                    id: 1,
                    name: "Plant-Based".into(),
                    description: None,
                    excluded_categories: [1, 2].into_iter().collect(),
                },
                custom_notes: None,
            }],
            ..Default::default()
        };
        let resolver = ConstraintResolver::new(&catalog, &constraints).unwrap();
        assert!(resolver.admissible().is_empty());
        let summary = resolver.summary();
        assert_eq!(summary.total_allowed_foods, 0);
        assert_eq!(summary.total_excluded_foods, 2);
    }

    #[test]
    fn summary_describes_each_constraint() {
        let catalog = seed::catalog();
        let constraints = UserConstraints {
            preferences: vec![prefer("Vegan")],
            allergies: vec![
                allergy("peanut", None, Severity::Severe),
                allergy("", Some(19), Severity::Moderate),
            ],
            dislikes: vec![dislike(11, Some("texture")), dislike(13, None)],
        };
        let summary = ConstraintResolver::new(&catalog, &constraints)
            .unwrap()
            .summary();
        assert_eq!(summary.dietary_patterns, vec!["Vegan".to_string()]);
        assert_eq!(
            summary.allergies,
            vec![
                "peanut (Severe)".to_string(),
                "Almonds (raw) (Moderate)".to_string()
            ]
        );
        assert_eq!(
            summary.dislikes,
            vec![
                "Broccoli (raw): texture".to_string(),
                "Carrots (raw)".to_string()
            ]
        );
        // vegan drops 1,2,3,4,5; the linked allergy drops 19; dislikes drop 11 and 13
        assert_eq!(summary.total_allowed_foods, 12);
        assert_eq!(summary.total_excluded_foods, 8);
    }

    #[test]
    fn rejects_dangling_references_and_duplicates() {
        let catalog = seed::catalog();
        let dangling = UserConstraints {
            dislikes: vec![dislike(999, None)],
            ..Default::default()
        };
        assert!(matches!(
            ConstraintResolver::new(&catalog, &dangling),
            Err(PlannerError::InvalidRequest(_))
        ));

        let duplicated = UserConstraints {
            preferences: vec![prefer("Vegan"), prefer("Vegan")],
            ..Default::default()
        };
        assert!(matches!(
            ConstraintResolver::new(&catalog, &duplicated),
            Err(PlannerError::InvalidRequest(_))
        ));

        let empty_allergy = UserConstraints {
            allergies: vec![allergy("  ", None, Severity::Mild)],
            ..Default::default()
        };
        assert!(matches!(
            ConstraintResolver::new(&catalog, &empty_allergy),
            Err(PlannerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn checking_unknown_food_is_not_found() {
        let catalog = seed::catalog();
        let constraints = UserConstraints::default();
        let resolver = ConstraintResolver::new(&catalog, &constraints).unwrap();
        assert!(matches!(resolver.check(404), Err(PlannerError::NotFound(_))));
    }
}
