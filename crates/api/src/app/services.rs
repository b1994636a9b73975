//! Infrastructure wiring for the HTTP app.

use std::sync::Arc;

use trolley_catalog::ProductCatalog;
use trolley_core::StoreError;
use trolley_infra::sqlx::PgPool;
use trolley_infra::{
    CartEngine, CartStore, InMemoryCartStore, InMemoryCatalog, InMemorySessionStore,
    LifecycleSweeper, PostgresCartStore, SessionStore, SweeperConfig, SweeperHandle,
};

/// Engine over type-erased collaborators, so the same handlers serve the
/// in-memory and Postgres deployments.
pub type AppEngine =
    CartEngine<Arc<dyn CartStore>, Arc<dyn SessionStore>, Arc<dyn ProductCatalog>>;

pub struct AppServices {
    pub engine: AppEngine,
    store: Arc<dyn CartStore>,
    /// The catalog is an external system; this process carries a seedable
    /// in-memory stand-in.
    pub catalog: Arc<InMemoryCatalog>,
}

impl AppServices {
    /// Everything in memory: dev and tests.
    pub fn in_memory() -> Self {
        Self::assemble(Arc::new(InMemoryCartStore::new()))
    }

    /// Durable carts in Postgres; sessions stay boundary-local.
    pub async fn postgres(pool: PgPool) -> Result<Self, StoreError> {
        let store = PostgresCartStore::new(pool);
        store.init_schema().await?;
        Ok(Self::assemble(Arc::new(store)))
    }

    fn assemble(store: Arc<dyn CartStore>) -> Self {
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let engine = CartEngine::new(
            store.clone(),
            sessions,
            catalog.clone() as Arc<dyn ProductCatalog>,
        );
        Self {
            engine,
            store,
            catalog,
        }
    }

    /// Start the periodic lifecycle sweeper against this app's store.
    pub fn spawn_sweeper(&self, config: SweeperConfig) -> SweeperHandle {
        LifecycleSweeper::new(self.store.clone(), config).spawn()
    }
}
