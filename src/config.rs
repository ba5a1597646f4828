use std::{str::FromStr, time::Duration};

use serde::Deserialize;

use crate::meal_plans::GeneratorSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub seed_catalog: bool,
    /// Used when a generation request carries no seed.
    pub plan_seed: u64,
    pub planner: GeneratorSettings,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = match std::env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("postgres") | Err(_) => StoreBackend::Postgres,
            Ok(other) => anyhow::bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        let defaults = GeneratorSettings::default();
        let timeout_ms: u64 = env_or("PLAN_TIMEOUT_MS", 2000);
        let planner = GeneratorSettings {
            tolerance: env_or("PLAN_TOLERANCE", defaults.tolerance),
            max_retries: env_or("PLAN_MAX_RETRIES", defaults.max_retries).max(1),
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            include_snack: env_or("PLAN_INCLUDE_SNACK", defaults.include_snack),
            max_foods_per_meal: env_or("PLAN_MAX_FOODS_PER_MEAL", defaults.max_foods_per_meal)
                .max(1),
            min_portion_grams: env_or("PLAN_MIN_PORTION_GRAMS", defaults.min_portion_grams),
            max_portion_grams: env_or("PLAN_MAX_PORTION_GRAMS", defaults.max_portion_grams),
            candidate_pool: env_or("PLAN_CANDIDATE_POOL", defaults.candidate_pool).max(1),
        };
        if !(planner.tolerance > 0.0 && planner.tolerance < 1.0) {
            anyhow::bail!("PLAN_TOLERANCE must be in (0, 1), got {}", planner.tolerance);
        }
        if !(planner.min_portion_grams >= 0.0 && planner.min_portion_grams < planner.max_portion_grams)
        {
            anyhow::bail!(
                "PLAN_MIN_PORTION_GRAMS ({}) must be below PLAN_MAX_PORTION_GRAMS ({})",
                planner.min_portion_grams,
                planner.max_portion_grams
            );
        }

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
            store_backend,
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            seed_catalog: env_or("SEED_CATALOG", false),
            plan_seed: env_or("PLAN_SEED", 42),
            planner,
        })
    }

    /// In-memory configuration with no generation deadline.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 1,
            seed_catalog: false,
            plan_seed: 42,
            planner: GeneratorSettings {
                timeout: None,
                ..GeneratorSettings::default()
            },
        }
    }
}
