use std::sync::Arc;

use sqlx::PgPool;

use stockroom_infra::{
    HistoryReader, InMemoryOrderStore, OrderStore, PlacementEngine, PostgresOrderStore,
    RetryPolicy, StoreError,
};
use stockroom_reporting::ReportClock;

/// Shared application services behind the HTTP layer.
///
/// The store is type-erased so the same wiring serves the in-memory backend
/// (dev, tests) and Postgres (production); handlers never know which one
/// they are talking to.
#[derive(Clone)]
pub struct AppServices {
    engine: PlacementEngine<Arc<dyn OrderStore>>,
    reader: HistoryReader<Arc<dyn OrderStore>>,
    store: Arc<dyn OrderStore>,
}

impl AppServices {
    /// Volatile in-memory backend.
    pub fn in_memory(clock: ReportClock, retry: RetryPolicy) -> Self {
        Self::with_store(Arc::new(InMemoryOrderStore::new()), clock, retry)
    }

    /// Postgres backend; creates the schema if missing.
    pub async fn postgres(
        pool: PgPool,
        clock: ReportClock,
        retry: RetryPolicy,
    ) -> Result<Self, StoreError> {
        let store = PostgresOrderStore::new(pool);
        store.ensure_schema().await?;
        Ok(Self::with_store(Arc::new(store), clock, retry))
    }

    pub fn with_store(
        store: Arc<dyn OrderStore>,
        clock: ReportClock,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            engine: PlacementEngine::new(store.clone()).with_retry(retry),
            reader: HistoryReader::new(store.clone(), clock),
            store,
        }
    }

    pub fn engine(&self) -> &PlacementEngine<Arc<dyn OrderStore>> {
        &self.engine
    }

    pub fn reader(&self) -> &HistoryReader<Arc<dyn OrderStore>> {
        &self.reader
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }
}
