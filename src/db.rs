//! Postgres-backed [`PlannerStore`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::catalog::{seed, CategoryId, DietaryPattern, Food, FoodCatalog, FoodCategory, FoodId};
use crate::config::AppConfig;
use crate::constraints::{UserAllergy, UserConstraints, UserDietaryPreference, UserFoodDislike};
use crate::meal_plans::{Meal, MealFood, MealPlan, MealPlanSummary};
use crate::nutrition::MacroProfile;
use crate::profiles::{MetabolicTargets, UserProfile};
use crate::storage::PlannerStore;

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

// ---- rows ----

#[derive(FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
}

#[derive(FromRow)]
struct FoodRow {
    id: i64,
    name: String,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    fiber: Option<f64>,
    sugar: Option<f64>,
}

#[derive(FromRow)]
struct ProfileRow {
    user_id: Uuid,
    age: i32,
    gender: String,
    height: f64,
    weight: f64,
    activity_level: String,
    weight_goal_type: String,
    goal_weight: Option<f64>,
    weight_change_per_week: Option<f64>,
    bmr: f64,
    tdee: f64,
    calorie_target: f64,
    protein_target: f64,
    carb_target: f64,
    fat_target: f64,
    weeks_to_goal: Option<f64>,
    updated_at: OffsetDateTime,
}

#[derive(FromRow)]
struct PreferenceRow {
    pattern_id: i64,
    name: String,
    description: Option<String>,
    custom_notes: Option<String>,
}

#[derive(FromRow)]
struct AllergyRow {
    allergen_name: String,
    food_id: Option<i64>,
    severity: String,
    notes: Option<String>,
}

#[derive(FromRow)]
struct DislikeRow {
    food_id: i64,
    reason: Option<String>,
}

#[derive(FromRow)]
struct PlanRow {
    id: Uuid,
    user_id: Uuid,
    start_date: Option<Date>,
    end_date: Option<Date>,
    created_at: OffsetDateTime,
}

#[derive(FromRow)]
struct PlanSummaryRow {
    id: Uuid,
    user_id: Uuid,
    start_date: Option<Date>,
    end_date: Option<Date>,
    created_at: OffsetDateTime,
    meal_count: i64,
}

#[derive(FromRow)]
struct MealRow {
    id: Uuid,
    name: String,
    meal_type: String,
    day: i32,
}

#[derive(FromRow)]
struct MealFoodRow {
    meal_id: Uuid,
    food_id: i64,
    food_name: String,
    quantity_grams: f64,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    fiber: Option<f64>,
    sugar: Option<f64>,
}

fn parse_text<T>(column: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| anyhow::anyhow!("column {column}: {e}"))
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL is required for the postgres backend")?;
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }

    /// Inserts the built-in catalog when the foods table is empty.
    /// Returns whether anything was written.
    pub async fn seed_catalog_if_empty(&self) -> anyhow::Result<bool> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM foods")
            .fetch_one(&self.db)
            .await
            .context("count foods")?;
        if count > 0 {
            return Ok(false);
        }

        let mut tx = self.db.begin().await.context("begin seed tx")?;
        for c in seed::categories() {
            sqlx::query(
                r#"
                INSERT INTO food_categories (id, name, description)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(c.id)
            .bind(&c.name)
            .bind(&c.description)
            .execute(&mut *tx)
            .await
            .context("insert category")?;
        }
        for f in seed::foods() {
            insert_food_tx(&mut tx, &f).await?;
        }
        for p in seed::patterns() {
            sqlx::query(
                r#"
                INSERT INTO dietary_patterns (id, name, description)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(p.id)
            .bind(&p.name)
            .bind(&p.description)
            .execute(&mut *tx)
            .await
            .context("insert dietary pattern")?;
            for category_id in &p.excluded_categories {
                sqlx::query(
                    r#"
                    INSERT INTO dietary_pattern_exclusions (pattern_id, category_id)
                    VALUES ($1, $2)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(p.id)
                .bind(category_id)
                .execute(&mut *tx)
                .await
                .context("insert pattern exclusion")?;
            }
        }
        tx.commit().await.context("commit seed tx")?;
        info!("built-in catalog seeded");
        Ok(true)
    }

    async fn excluded_categories(
        &self,
        pattern_ids: &[i64],
    ) -> anyhow::Result<HashMap<i64, BTreeSet<CategoryId>>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT pattern_id, category_id
              FROM dietary_pattern_exclusions
             WHERE pattern_id = ANY($1)
            "#,
        )
        .bind(pattern_ids)
        .fetch_all(&self.db)
        .await
        .context("load pattern exclusions")?;

        let mut by_pattern: HashMap<i64, BTreeSet<CategoryId>> = HashMap::new();
        for (pattern_id, category_id) in rows {
            by_pattern.entry(pattern_id).or_default().insert(category_id);
        }
        Ok(by_pattern)
    }
}

async fn insert_food_tx(tx: &mut Transaction<'_, Postgres>, food: &Food) -> anyhow::Result<()> {
    let p = &food.per_100g;
    sqlx::query(
        r#"
        INSERT INTO foods (id, name, calories, protein, carbs, fat, fiber, sugar)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(food.id)
    .bind(&food.name)
    .bind(p.calories)
    .bind(p.protein)
    .bind(p.carbs)
    .bind(p.fat)
    .bind(p.fiber)
    .bind(p.sugar)
    .execute(&mut **tx)
    .await
    .context("insert food")?;

    for category_id in &food.categories {
        sqlx::query(
            r#"
            INSERT INTO food_category_links (food_id, category_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(food.id)
        .bind(category_id)
        .execute(&mut **tx)
        .await
        .context("insert food category link")?;
    }
    Ok(())
}

async fn insert_meal_tx(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    position: usize,
    meal: &Meal,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO meals (id, meal_plan_id, name, meal_type, day, position)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(meal.id)
    .bind(plan_id)
    .bind(&meal.name)
    .bind(meal.meal_type.as_str())
    .bind(i32::try_from(meal.day).context("meal day")?)
    .bind(i32::try_from(position).context("meal position")?)
    .execute(&mut **tx)
    .await
    .context("insert meal")?;

    for (position, food) in meal.foods.iter().enumerate() {
        let p = &food.per_100g;
        sqlx::query(
            r#"
            INSERT INTO meal_foods
                (meal_id, food_id, food_name, quantity_grams,
                 calories, protein, carbs, fat, fiber, sugar, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(meal.id)
        .bind(food.food_id)
        .bind(&food.food_name)
        .bind(food.quantity_grams)
        .bind(p.calories)
        .bind(p.protein)
        .bind(p.carbs)
        .bind(p.fat)
        .bind(p.fiber)
        .bind(p.sugar)
        .bind(i32::try_from(position).context("meal food position")?)
        .execute(&mut **tx)
        .await
        .context("insert meal food")?;
    }
    Ok(())
}

#[async_trait]
impl PlannerStore for PgStore {
    async fn load_catalog(&self) -> anyhow::Result<FoodCatalog> {
        let categories = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description FROM food_categories ORDER BY id",
        )
        .fetch_all(&self.db)
        .await
        .context("load categories")?
        .into_iter()
        .map(|r| FoodCategory {
            id: r.id,
            name: r.name,
            description: r.description,
        })
        .collect();

        let links: Vec<(i64, i64)> =
            sqlx::query_as("SELECT food_id, category_id FROM food_category_links")
                .fetch_all(&self.db)
                .await
                .context("load food categories")?;
        let mut tags: HashMap<FoodId, BTreeSet<CategoryId>> = HashMap::new();
        for (food_id, category_id) in links {
            tags.entry(food_id).or_default().insert(category_id);
        }

        let foods = sqlx::query_as::<_, FoodRow>(
            r#"
            SELECT id, name, calories, protein, carbs, fat, fiber, sugar
              FROM foods
             ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("load foods")?
        .into_iter()
        .map(|r| Food {
            id: r.id,
            per_100g: MacroProfile {
                calories: r.calories,
                protein: r.protein,
                carbs: r.carbs,
                fat: r.fat,
                fiber: r.fiber,
                sugar: r.sugar,
            },
            categories: tags.remove(&r.id).unwrap_or_default(),
            name: r.name,
        })
        .collect();

        FoodCatalog::new(categories, foods).context("catalog in database is inconsistent")
    }

    async fn load_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, age, gender, height, weight, activity_level, weight_goal_type,
                   goal_weight, weight_change_per_week, bmr, tdee, calorie_target,
                   protein_target, carb_target, fat_target, weeks_to_goal, updated_at
              FROM user_profiles
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("load profile")?;

        let Some(r) = row else {
            return Ok(None);
        };
        Ok(Some(UserProfile {
            user_id: r.user_id,
            age: u32::try_from(r.age).context("profile age")?,
            gender: parse_text("gender", &r.gender)?,
            height: r.height,
            weight: r.weight,
            activity_level: parse_text("activity_level", &r.activity_level)?,
            weight_goal_type: parse_text("weight_goal_type", &r.weight_goal_type)?,
            goal_weight: r.goal_weight,
            weight_change_per_week: r.weight_change_per_week,
            targets: MetabolicTargets {
                bmr: r.bmr,
                tdee: r.tdee,
                calorie_target: r.calorie_target,
                protein_target: r.protein_target,
                carb_target: r.carb_target,
                fat_target: r.fat_target,
            },
            weeks_to_goal: r.weeks_to_goal,
            updated_at: r.updated_at,
        }))
    }

    async fn save_profile(&self, profile: &UserProfile) -> anyhow::Result<()> {
        let t = &profile.targets;
        sqlx::query(
            r#"
            INSERT INTO user_profiles
                (user_id, age, gender, height, weight, activity_level, weight_goal_type,
                 goal_weight, weight_change_per_week, bmr, tdee, calorie_target,
                 protein_target, carb_target, fat_target, weeks_to_goal, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (user_id) DO UPDATE SET
                age = EXCLUDED.age,
                gender = EXCLUDED.gender,
                height = EXCLUDED.height,
                weight = EXCLUDED.weight,
                activity_level = EXCLUDED.activity_level,
                weight_goal_type = EXCLUDED.weight_goal_type,
                goal_weight = EXCLUDED.goal_weight,
                weight_change_per_week = EXCLUDED.weight_change_per_week,
                bmr = EXCLUDED.bmr,
                tdee = EXCLUDED.tdee,
                calorie_target = EXCLUDED.calorie_target,
                protein_target = EXCLUDED.protein_target,
                carb_target = EXCLUDED.carb_target,
                fat_target = EXCLUDED.fat_target,
                weeks_to_goal = EXCLUDED.weeks_to_goal,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(profile.user_id)
        .bind(i32::try_from(profile.age).context("profile age")?)
        .bind(profile.gender.as_str())
        .bind(profile.height)
        .bind(profile.weight)
        .bind(profile.activity_level.as_str())
        .bind(profile.weight_goal_type.as_str())
        .bind(profile.goal_weight)
        .bind(profile.weight_change_per_week)
        .bind(t.bmr)
        .bind(t.tdee)
        .bind(t.calorie_target)
        .bind(t.protein_target)
        .bind(t.carb_target)
        .bind(t.fat_target)
        .bind(profile.weeks_to_goal)
        .bind(profile.updated_at)
        .execute(&self.db)
        .await
        .context("upsert profile")?;
        Ok(())
    }

    async fn load_constraints(&self, user_id: Uuid) -> anyhow::Result<UserConstraints> {
        let prefs = sqlx::query_as::<_, PreferenceRow>(
            r#"
            SELECT p.id AS pattern_id, p.name, p.description, u.custom_notes
              FROM user_dietary_preferences u
              JOIN dietary_patterns p ON p.id = u.pattern_id
             WHERE u.user_id = $1
             ORDER BY p.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("load dietary preferences")?;

        let pattern_ids: Vec<i64> = prefs.iter().map(|p| p.pattern_id).collect();
        let mut exclusions = if pattern_ids.is_empty() {
            HashMap::new()
        } else {
            self.excluded_categories(&pattern_ids).await?
        };
        let preferences = prefs
            .into_iter()
            .map(|r| UserDietaryPreference {
                pattern: DietaryPattern {
                    id: r.pattern_id,
                    name: r.name,
                    description: r.description,
                    excluded_categories: exclusions.remove(&r.pattern_id).unwrap_or_default(),
                },
                custom_notes: r.custom_notes,
            })
            .collect();

        let allergies = sqlx::query_as::<_, AllergyRow>(
            r#"
            SELECT allergen_name, food_id, severity, notes
              FROM user_allergies
             WHERE user_id = $1
             ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("load allergies")?
        .into_iter()
        .map(|r| {
            Ok(UserAllergy {
                allergen_name: r.allergen_name,
                food_id: r.food_id,
                severity: parse_text("severity", &r.severity)?,
                notes: r.notes,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

        let dislikes = sqlx::query_as::<_, DislikeRow>(
            r#"
            SELECT food_id, reason
              FROM user_food_dislikes
             WHERE user_id = $1
             ORDER BY food_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("load dislikes")?
        .into_iter()
        .map(|r| UserFoodDislike {
            food_id: r.food_id,
            reason: r.reason,
        })
        .collect();

        Ok(UserConstraints {
            preferences,
            allergies,
            dislikes,
        })
    }

    async fn save_meal_plan(&self, plan: &MealPlan) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin meal plan tx")?;
        sqlx::query(
            r#"
            INSERT INTO meal_plans (id, user_id, start_date, end_date, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(plan.id)
        .bind(plan.user_id)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(plan.created_at)
        .execute(&mut *tx)
        .await
        .context("insert meal plan")?;

        for (position, meal) in plan.meals.iter().enumerate() {
            insert_meal_tx(&mut tx, plan.id, position, meal).await?;
        }
        tx.commit().await.context("commit meal plan tx")?;
        Ok(())
    }

    async fn load_meal_plan(&self, id: Uuid) -> anyhow::Result<Option<MealPlan>> {
        let Some(row) = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, user_id, start_date, end_date, created_at
              FROM meal_plans
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("load meal plan")?
        else {
            return Ok(None);
        };

        let meal_rows = sqlx::query_as::<_, MealRow>(
            r#"
            SELECT id, name, meal_type, day
              FROM meals
             WHERE meal_plan_id = $1
             ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await
        .context("load meals")?;

        let food_rows = sqlx::query_as::<_, MealFoodRow>(
            r#"
            SELECT f.meal_id, f.food_id, f.food_name, f.quantity_grams,
                   f.calories, f.protein, f.carbs, f.fat, f.fiber, f.sugar
              FROM meal_foods f
              JOIN meals m ON m.id = f.meal_id
             WHERE m.meal_plan_id = $1
             ORDER BY f.meal_id, f.position
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await
        .context("load meal foods")?;

        let mut foods_by_meal: BTreeMap<Uuid, Vec<MealFood>> = BTreeMap::new();
        for r in food_rows {
            foods_by_meal.entry(r.meal_id).or_default().push(MealFood {
                food_id: r.food_id,
                food_name: r.food_name,
                quantity_grams: r.quantity_grams,
                per_100g: MacroProfile {
                    calories: r.calories,
                    protein: r.protein,
                    carbs: r.carbs,
                    fat: r.fat,
                    fiber: r.fiber,
                    sugar: r.sugar,
                },
            });
        }

        let meals = meal_rows
            .into_iter()
            .map(|m| {
                Ok(Meal {
                    foods: foods_by_meal.remove(&m.id).unwrap_or_default(),
                    id: m.id,
                    name: m.name,
                    meal_type: parse_text("meal_type", &m.meal_type)?,
                    day: u32::try_from(m.day).context("meal day")?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Some(MealPlan {
            id: row.id,
            user_id: row.user_id,
            meals,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
        }))
    }

    async fn list_meal_plans(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealPlanSummary>> {
        let rows = sqlx::query_as::<_, PlanSummaryRow>(
            r#"
            SELECT p.id, p.user_id, p.start_date, p.end_date, p.created_at,
                   COUNT(m.id) AS meal_count
              FROM meal_plans p
              LEFT JOIN meals m ON m.meal_plan_id = p.id
             WHERE p.user_id = $1
             GROUP BY p.id
             ORDER BY p.created_at DESC, p.id
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list meal plans")?;

        rows.into_iter()
            .map(|r| {
                Ok(MealPlanSummary {
                    id: r.id,
                    user_id: r.user_id,
                    start_date: r.start_date,
                    end_date: r.end_date,
                    created_at: r.created_at,
                    meal_count: usize::try_from(r.meal_count).context("meal count")?,
                })
            })
            .collect()
    }

    async fn delete_meal_plan(&self, id: Uuid) -> anyhow::Result<bool> {
        let done = sqlx::query("DELETE FROM meal_plans WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete meal plan")?;
        Ok(done.rows_affected() > 0)
    }
}
