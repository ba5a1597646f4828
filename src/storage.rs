use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog::{seed, FoodCatalog};
use crate::constraints::UserConstraints;
use crate::meal_plans::{MealPlan, MealPlanSummary};
use crate::profiles::UserProfile;

/// Everything the planner reads from or writes to its backing store.
#[async_trait]
pub trait PlannerStore: Send + Sync {
    /// Snapshot of the food catalog.
    async fn load_catalog(&self) -> anyhow::Result<FoodCatalog>;
    async fn load_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>>;
    async fn save_profile(&self, profile: &UserProfile) -> anyhow::Result<()>;
    /// Users without any stored constraints get an empty set.
    async fn load_constraints(&self, user_id: Uuid) -> anyhow::Result<UserConstraints>;
    /// Stores the plan with all its meals, or nothing.
    async fn save_meal_plan(&self, plan: &MealPlan) -> anyhow::Result<()>;
    async fn load_meal_plan(&self, id: Uuid) -> anyhow::Result<Option<MealPlan>>;
    /// Newest first.
    async fn list_meal_plans(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealPlanSummary>>;
    /// Returns whether a plan was removed.
    async fn delete_meal_plan(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, UserProfile>,
    constraints: HashMap<Uuid, UserConstraints>,
    plans: HashMap<Uuid, MealPlan>,
}

/// Process-local store used by `STORE_BACKEND=memory` and in tests.
pub struct MemoryStore {
    catalog: FoodCatalog,
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new(catalog: FoodCatalog) -> Self {
        Self {
            catalog,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Pre-loaded with the built-in catalog.
    pub fn seeded() -> Self {
        Self::new(seed::catalog())
    }

    #[cfg(test)]
    pub async fn put_constraints(&self, user_id: Uuid, constraints: UserConstraints) {
        self.tables
            .write()
            .await
            .constraints
            .insert(user_id, constraints);
    }
}

#[async_trait]
impl PlannerStore for MemoryStore {
    async fn load_catalog(&self) -> anyhow::Result<FoodCatalog> {
        Ok(self.catalog.clone())
    }

    async fn load_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> anyhow::Result<()> {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn load_constraints(&self, user_id: Uuid) -> anyhow::Result<UserConstraints> {
        Ok(self
            .tables
            .read()
            .await
            .constraints
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_meal_plan(&self, plan: &MealPlan) -> anyhow::Result<()> {
        if let Some(food) = plan.meal_foods().find(|f| !(f.quantity_grams > 0.0)) {
            anyhow::bail!(
                "meal food {} has non-positive quantity {}",
                food.food_id,
                food.quantity_grams
            );
        }
        let mut tables = self.tables.write().await;
        if tables.plans.contains_key(&plan.id) {
            anyhow::bail!("meal plan {} already exists", plan.id);
        }
        tables.plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn load_meal_plan(&self, id: Uuid) -> anyhow::Result<Option<MealPlan>> {
        Ok(self.tables.read().await.plans.get(&id).cloned())
    }

    async fn list_meal_plans(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealPlanSummary>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<MealPlanSummary> = tables
            .plans
            .values()
            .filter(|p| p.user_id == user_id)
            .map(MealPlanSummary::from)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(rows
            .into_iter()
            .skip(usize::try_from(offset)?)
            .take(usize::try_from(limit)?)
            .collect())
    }

    async fn delete_meal_plan(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.tables.write().await.plans.remove(&id).is_some())
    }
}
