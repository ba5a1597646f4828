use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{AppConfig, StoreBackend};
use crate::db::PgStore;
use crate::storage::{MemoryStore, PlannerStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn PlannerStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.store_backend {
            StoreBackend::Postgres => {
                let pg = PgStore::connect(&config).await?;
                pg.migrate().await?;
                if config.seed_catalog && pg.seed_catalog_if_empty().await? {
                    info!("empty database seeded with the built-in catalog");
                }
                Arc::new(pg) as Arc<dyn PlannerStore>
            }
            StoreBackend::Memory => {
                info!("using in-memory store with the built-in catalog");
                Arc::new(MemoryStore::seeded()) as Arc<dyn PlannerStore>
            }
        };

        let catalog = store.load_catalog().await?;
        if catalog.is_empty() {
            warn!("food catalog is empty, meal plan generation will fail until foods are added");
        } else {
            info!(
                foods = catalog.len(),
                categories = catalog.categories().count(),
                "food catalog loaded"
            );
        }

        Ok(Self::from_parts(config, store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn PlannerStore>) -> Self {
        Self { config, store }
    }

    #[cfg(test)]
    pub fn with_store(store: Arc<dyn PlannerStore>) -> Self {
        Self::from_parts(Arc::new(AppConfig::for_tests()), store)
    }

    /// Seeded in-memory store, test configuration.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::with_store(Arc::new(MemoryStore::seeded()))
    }
}
