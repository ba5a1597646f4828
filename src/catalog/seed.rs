//! Built-in starter catalog: 20 common foods, their categories and a handful
//! of dietary patterns. Used by the in-memory store and by `SEED_CATALOG`.

use lazy_static::lazy_static;

use super::repo_types::{CategoryId, DietaryPattern, Food, FoodCategory};
use super::services::FoodCatalog;
use crate::nutrition::MacroProfile;

pub const MEAT: CategoryId = 1;
pub const FISH: CategoryId = 2;
pub const EGGS: CategoryId = 3;
pub const DAIRY: CategoryId = 4;
pub const GRAINS: CategoryId = 5;
pub const VEGETABLES: CategoryId = 6;
pub const FRUITS: CategoryId = 7;
pub const NUTS: CategoryId = 8;
pub const LEGUMES: CategoryId = 9;
pub const OILS: CategoryId = 10;
pub const GLUTEN: CategoryId = 11;

lazy_static! {
    static ref CATEGORIES: Vec<FoodCategory> = [
        (MEAT, "Meat", "Beef, pork, poultry"),
        (FISH, "Fish", "Fish and seafood"),
        (EGGS, "Eggs", "Whole eggs and egg products"),
        (DAIRY, "Dairy", "Milk, yogurt, cheese"),
        (GRAINS, "Grains", "Rice, oats, pasta and other cereals"),
        (VEGETABLES, "Vegetables", "Fresh and root vegetables"),
        (FRUITS, "Fruits", "Fresh fruit"),
        (NUTS, "Nuts", "Tree nuts"),
        (LEGUMES, "Legumes", "Beans, lentils, peas"),
        (OILS, "Oils", "Cooking oils and fats"),
        (GLUTEN, "Gluten", "Contains wheat, barley or rye gluten"),
    ]
    .into_iter()
    .map(|(id, name, description)| FoodCategory {
        id,
        name: name.into(),
        description: Some(description.into()),
    })
    .collect();

    static ref FOODS: Vec<Food> = {
        #[rustfmt::skip]
        let rows: [(i64, &str, f64, f64, f64, f64, Option<f64>, Option<f64>, &[CategoryId]); 20] = [
            (1, "Chicken Breast (cooked)", 165.0, 31.0, 0.0, 3.6, Some(0.0), Some(0.0), &[MEAT]),
            (2, "Salmon (cooked)", 206.0, 22.0, 0.0, 12.0, Some(0.0), Some(0.0), &[FISH]),
            (3, "Eggs (whole, cooked)", 155.0, 13.0, 1.1, 11.0, Some(0.0), Some(1.1), &[EGGS]),
            (4, "Greek Yogurt (plain, non-fat)", 59.0, 10.0, 3.6, 0.4, Some(0.0), Some(3.6), &[DAIRY]),
            (5, "Lean Ground Beef (cooked)", 250.0, 26.0, 0.0, 17.0, Some(0.0), Some(0.0), &[MEAT]),
            (6, "Brown Rice (cooked)", 111.0, 2.6, 23.0, 0.9, Some(1.8), Some(0.4), &[GRAINS]),
            (7, "Quinoa (cooked)", 120.0, 4.4, 22.0, 1.9, Some(2.8), Some(0.87), &[GRAINS]),
            (8, "Sweet Potato (baked)", 90.0, 2.0, 21.0, 0.15, Some(3.3), Some(6.5), &[VEGETABLES]),
            (9, "Whole Wheat Pasta (cooked)", 124.0, 5.0, 25.0, 1.1, Some(3.2), Some(0.56), &[GRAINS, GLUTEN]),
            (10, "Oats (dry)", 389.0, 16.9, 66.3, 6.9, Some(10.6), Some(0.99), &[GRAINS, GLUTEN]),
            (11, "Broccoli (raw)", 34.0, 2.8, 7.0, 0.4, Some(2.6), Some(1.5), &[VEGETABLES]),
            (12, "Spinach (raw)", 23.0, 2.9, 3.6, 0.4, Some(2.2), Some(0.4), &[VEGETABLES]),
            (13, "Carrots (raw)", 41.0, 0.93, 9.6, 0.24, Some(2.8), Some(4.7), &[VEGETABLES]),
            (14, "Banana", 89.0, 1.1, 23.0, 0.33, Some(2.6), Some(12.2), &[FRUITS]),
            (15, "Apple", 52.0, 0.26, 14.0, 0.17, Some(2.4), Some(10.4), &[FRUITS]),
            (16, "Blueberries", 57.0, 0.74, 14.5, 0.33, Some(2.4), Some(10.0), &[FRUITS]),
            (17, "Avocado", 160.0, 2.0, 8.5, 14.7, Some(6.7), Some(0.7), &[FRUITS]),
            (18, "Olive Oil", 884.0, 0.0, 0.0, 100.0, None, None, &[OILS]),
            (19, "Almonds (raw)", 579.0, 21.2, 21.6, 49.9, Some(12.5), Some(4.4), &[NUTS]),
            (20, "Black Beans (cooked)", 132.0, 8.86, 23.7, 0.54, Some(8.7), Some(0.32), &[LEGUMES]),
        ];
        rows.into_iter()
            .map(|(id, name, calories, protein, carbs, fat, fiber, sugar, cats)| Food {
                id,
                name: name.into(),
                per_100g: MacroProfile { calories, protein, carbs, fat, fiber, sugar },
                categories: cats.iter().copied().collect(),
            })
            .collect()
    };

    static ref PATTERNS: Vec<DietaryPattern> = [
        (1, "Vegetarian", "No meat or fish", &[MEAT, FISH][..]),
        (2, "Vegan", "No animal products", &[MEAT, FISH, EGGS, DAIRY][..]),
        (3, "Pescatarian", "Fish but no other meat", &[MEAT][..]),
        (4, "Dairy-Free", "No dairy products", &[DAIRY][..]),
        (5, "Gluten-Free", "No gluten-containing grains", &[GLUTEN][..]),
        (6, "Nut-Free", "No tree nuts", &[NUTS][..]),
    ]
    .into_iter()
    .map(|(id, name, description, excluded)| DietaryPattern {
        id,
        name: name.into(),
        description: Some(description.into()),
        excluded_categories: excluded.iter().copied().collect(),
    })
    .collect();

    static ref CATALOG: FoodCatalog =
        FoodCatalog::new(CATEGORIES.clone(), FOODS.clone()).expect("built-in catalog is valid");
}

pub fn categories() -> Vec<FoodCategory> {
    CATEGORIES.clone()
}

pub fn foods() -> Vec<Food> {
    FOODS.clone()
}

pub fn patterns() -> Vec<DietaryPattern> {
    PATTERNS.clone()
}

#[cfg(test)]
pub fn pattern(name: &str) -> Option<DietaryPattern> {
    PATTERNS.iter().find(|p| p.name.eq_ignore_ascii_case(name)).cloned()
}

pub fn catalog() -> FoodCatalog {
    CATALOG.clone()
}
