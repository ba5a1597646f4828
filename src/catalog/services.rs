use std::collections::BTreeMap;

use super::repo_types::{CategoryId, DietaryPattern, Food, FoodCategory, FoodId};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate food id {0}")]
    DuplicateFood(FoodId),
    #[error("duplicate category id {0}")]
    DuplicateCategory(CategoryId),
    #[error("food {food} references unknown category {category}")]
    UnknownFoodCategory { food: FoodId, category: CategoryId },
    #[error("pattern '{pattern}' excludes unknown category {category}")]
    UnknownPatternCategory { pattern: String, category: CategoryId },
    #[error("food {food}: {reason}")]
    InvalidProfile { food: FoodId, reason: String },
}

/// Read-only snapshot of the foods catalog, ordered by food id.
#[derive(Debug, Clone, Default)]
pub struct FoodCatalog {
    foods: BTreeMap<FoodId, Food>,
    categories: BTreeMap<CategoryId, FoodCategory>,
}

impl FoodCatalog {
    pub fn new(categories: Vec<FoodCategory>, foods: Vec<Food>) -> Result<Self, CatalogError> {
        let mut by_category = BTreeMap::new();
        for category in categories {
            let id = category.id;
            if by_category.insert(id, category).is_some() {
                return Err(CatalogError::DuplicateCategory(id));
            }
        }

        let mut by_food = BTreeMap::new();
        for food in foods {
            food.per_100g
                .validate()
                .map_err(|reason| CatalogError::InvalidProfile { food: food.id, reason })?;
            if let Some(&category) = food
                .categories
                .iter()
                .find(|c| !by_category.contains_key(*c))
            {
                return Err(CatalogError::UnknownFoodCategory { food: food.id, category });
            }
            let id = food.id;
            if by_food.insert(id, food).is_some() {
                return Err(CatalogError::DuplicateFood(id));
            }
        }

        Ok(Self {
            foods: by_food,
            categories: by_category,
        })
    }

    pub fn food(&self, id: FoodId) -> Option<&Food> {
        self.foods.get(&id)
    }

    pub fn foods(&self) -> impl Iterator<Item = &Food> {
        self.foods.values()
    }

    pub fn category(&self, id: CategoryId) -> Option<&FoodCategory> {
        self.categories.get(&id)
    }

    pub fn categories(&self) -> impl Iterator<Item = &FoodCategory> {
        self.categories.values()
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    /// Excluded categories must all be known to this catalog.
    pub fn validate_pattern(&self, pattern: &DietaryPattern) -> Result<(), CatalogError> {
        match pattern
            .excluded_categories
            .iter()
            .find(|c| !self.categories.contains_key(*c))
        {
            Some(&category) => Err(CatalogError::UnknownPatternCategory {
                pattern: pattern.name.clone(),
                category,
            }),
            None => Ok(()),
        }
    }

    /// Case-insensitive name search; an empty query lists everything.
    pub fn search(&self, query: &str) -> Vec<&Food> {
        let needle = query.trim().to_lowercase();
        self.foods
            .values()
            .filter(|f| needle.is_empty() || f.name.to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::seed;
    use crate::nutrition::MacroProfile;

    fn profile() -> MacroProfile {
        MacroProfile {
            calories: 100.0,
            protein: 10.0,
            carbs: 10.0,
            fat: 2.0,
            fiber: None,
            sugar: None,
        }
    }

    fn category(id: CategoryId, name: &str) -> FoodCategory {
        FoodCategory {
            id,
            name: name.into(),
            description: None,
        }
    }

    #[test]
    fn rejects_unknown_food_category() {
        let food = Food {
            id: 1,
            name: "Tofu".into(),
            per_100g: profile(),
            categories: [9].into_iter().collect(),
        };
        let err = FoodCatalog::new(vec![category(1, "legumes")], vec![food]).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnknownFoodCategory { food: 1, category: 9 }
        ));
    }

    #[test]
    fn rejects_duplicate_food_ids() {
        let food = Food {
            id: 7,
            name: "Rice".into(),
            per_100g: profile(),
            categories: Default::default(),
        };
        let err = FoodCatalog::new(vec![], vec![food.clone(), food]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateFood(7)));
    }

    #[test]
    fn rejects_out_of_range_profiles() {
        let mut bad = profile();
        bad.fat = 140.0;
        let food = Food {
            id: 3,
            name: "Lard".into(),
            per_100g: bad,
            categories: Default::default(),
        };
        assert!(matches!(
            FoodCatalog::new(vec![], vec![food]),
            Err(CatalogError::InvalidProfile { food: 3, .. })
        ));
    }

    #[test]
    fn search_is_case_insensitive() {
        let catalog = seed::catalog();
        let hits: Vec<_> = catalog.search("BROWN").iter().map(|f| f.id).collect();
        assert_eq!(hits, vec![6]);
        assert_eq!(catalog.search("  ").len(), catalog.len());
    }

    #[test]
    fn pattern_with_unknown_category_is_rejected() {
        let catalog = seed::catalog();
        let pattern = DietaryPattern {
            id: 99,
            name: "Carnivore".into(),
            description: None,
            excluded_categories: [404].into_iter().collect(),
        };
        assert!(catalog.validate_pattern(&pattern).is_err());
        for p in seed::patterns() {
            assert!(catalog.validate_pattern(&p).is_ok());
        }
    }
}
