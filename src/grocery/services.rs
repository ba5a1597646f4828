use std::collections::BTreeMap;

use super::dto::{GroceryItem, GroceryList};
use crate::catalog::FoodId;
use crate::meal_plans::repo_types::{MealFood, MealPlan};
use crate::nutrition::aggregate;

/// Consolidates every meal food of a plan into one line per food.
///
/// Nutrition is summed from the frozen per-meal snapshots, so the items add up
/// to the plan's own total.
pub fn grocery_list(plan: &MealPlan) -> GroceryList {
    let mut by_food: BTreeMap<FoodId, Vec<&MealFood>> = BTreeMap::new();
    for food in plan.meal_foods() {
        by_food.entry(food.food_id).or_default().push(food);
    }

    let mut items: Vec<GroceryItem> = by_food
        .into_iter()
        .map(|(food_id, entries)| {
            let total: f64 = entries.iter().map(|f| f.quantity_grams).sum();
            GroceryItem {
                food_id,
                food_name: entries[0].food_name.clone(),
                total_quantity_grams: (total * 10.0).round() / 10.0,
                nutrition: aggregate(entries.iter().map(|f| (&f.per_100g, f.quantity_grams))),
            }
        })
        .collect();
    items.sort_by(|a, b| a.food_name.cmp(&b.food_name).then(a.food_id.cmp(&b.food_id)));

    GroceryList {
        meal_plan_id: plan.id,
        total_items: items.len(),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::seed;
    use crate::meal_plans::repo_types::{Meal, MealType};
    use crate::nutrition::Nutrition;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn meal_food(food_id: i64, grams: f64) -> MealFood {
        let food = seed::foods()
            .into_iter()
            .find(|f| f.id == food_id)
            .expect("seed food");
        MealFood {
            food_id,
            food_name: food.name,
            quantity_grams: grams,
            per_100g: food.per_100g,
        }
    }

    fn meal(meal_type: MealType, day: u32, foods: Vec<MealFood>) -> Meal {
        Meal {
            id: Uuid::new_v4(),
            name: format!("{} Day {day}", meal_type.label()),
            meal_type,
            day,
            foods,
        }
    }

    fn plan() -> MealPlan {
        MealPlan {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            meals: vec![
                meal(MealType::Breakfast, 1, vec![meal_food(10, 60.0), meal_food(14, 118.0)]),
                meal(MealType::Lunch, 1, vec![meal_food(1, 150.0), meal_food(6, 200.0)]),
                meal(MealType::Breakfast, 2, vec![meal_food(10, 55.5), meal_food(15, 150.0)]),
                meal(MealType::Dinner, 2, vec![meal_food(1, 180.0), meal_food(11, 90.0)]),
            ],
            start_date: None,
            end_date: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn merges_repeated_foods() {
        let plan = plan();
        let list = grocery_list(&plan);
        assert_eq!(list.meal_plan_id, plan.id);
        assert_eq!(list.total_items, 6);

        let chicken = list.items.iter().find(|i| i.food_id == 1).unwrap();
        assert!((chicken.total_quantity_grams - 330.0).abs() < 1e-9);
        let oats = list.items.iter().find(|i| i.food_id == 10).unwrap();
        assert!((oats.total_quantity_grams - 115.5).abs() < 1e-9);
    }

    #[test]
    fn items_are_sorted_by_name() {
        let names: Vec<String> = grocery_list(&plan())
            .items
            .into_iter()
            .map(|i| i.food_name)
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "Apple");
    }

    #[test]
    fn item_nutrition_adds_up_to_plan_total() {
        let plan = plan();
        let total: Nutrition = grocery_list(&plan).items.iter().map(|i| i.nutrition).sum();
        assert!(total.approx_eq(&plan.total_nutrition(), 1e-9));
    }

    #[test]
    fn apple_portion_contributes_exactly() {
        let list = grocery_list(&plan());
        let apple = list.items.iter().find(|i| i.food_id == 15).unwrap();
        assert!((apple.nutrition.calories - 78.0).abs() < 1e-9);
    }

    #[test]
    fn catalog_edits_do_not_touch_an_existing_plan() {
        use crate::catalog::FoodCatalog;
        use crate::constraints::{ConstraintResolver, UserConstraints};
        use crate::meal_plans::generator::{GenerationRequest, MealPlanGenerator};
        use crate::meal_plans::GeneratorSettings;
        use crate::profiles::services::macro_targets;
        use crate::profiles::MetabolicTargets;

        let catalog = seed::catalog();
        let admissible = ConstraintResolver::new(&catalog, &UserConstraints::default())
            .unwrap()
            .admissible();
        let (protein_target, carb_target, fat_target) = macro_targets(2200.0);
        let targets = MetabolicTargets {
            bmr: 1700.0,
            tdee: 2200.0,
            calorie_target: 2200.0,
            protein_target,
            carb_target,
            fat_target,
        };
        let plan = MealPlanGenerator::new(GeneratorSettings {
            timeout: None,
            ..GeneratorSettings::default()
        })
        .generate(&GenerationRequest {
            user_id: Uuid::new_v4(),
            targets: &targets,
            foods: &admissible,
            num_days: 2,
            start_date: None,
            seed: 21,
        })
        .unwrap()
        .plan;
        let total_before = plan.total_nutrition();
        let list_before = grocery_list(&plan);

        let edited_id = plan.meals[0].foods[0].food_id;
        let edited_foods = seed::foods()
            .into_iter()
            .map(|mut f| {
                if f.id == edited_id {
                    f.name = format!("{} (reformulated)", f.name);
                    f.per_100g.calories = (f.per_100g.calories * 1.5).min(1000.0);
                    f.per_100g.protein /= 2.0;
                }
                f
            })
            .collect();
        let edited = FoodCatalog::new(seed::categories(), edited_foods).unwrap();
        let live = edited.food(edited_id).unwrap();
        assert_ne!(live.per_100g, plan.meals[0].foods[0].per_100g);

        assert!(plan.total_nutrition().approx_eq(&total_before, 1e-9));
        let list_after = grocery_list(&plan);
        assert_eq!(list_after, list_before);
        let item = list_after.items.iter().find(|i| i.food_id == edited_id).unwrap();
        assert!(!item.food_name.contains("reformulated"));
        let summed: Nutrition = list_after.items.iter().map(|i| i.nutrition).sum();
        assert!(summed.approx_eq(&total_before, 1e-6));
    }

    #[test]
    fn empty_plan_has_no_items() {
        let mut plan = plan();
        plan.meals.clear();
        let list = grocery_list(&plan);
        assert!(list.items.is_empty());
        assert_eq!(list.total_items, 0);
    }
}
