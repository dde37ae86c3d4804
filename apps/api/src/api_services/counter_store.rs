use std::sync::Arc;

use vaultgate_application::{CounterSchema, LoginAttemptRepository, WriteWindowRepository};
use vaultgate_core::AppResult;
use vaultgate_infrastructure::{InMemoryCounterStore, PostgresCounterStore, RedisCounterStore};

use crate::api_config::CounterStoreConfig;
use crate::state::StoreProbe;

use super::database::connect_pool;
use super::redis::build_redis_client;

/// One counter store backend seen through each of its ports.
#[derive(Clone)]
pub struct CounterStore {
    pub schema: Arc<dyn CounterSchema>,
    pub login_attempts: Arc<dyn LoginAttemptRepository>,
    pub write_windows: Arc<dyn WriteWindowRepository>,
    pub probe: StoreProbe,
}

impl CounterStore {
    fn from_adapter<S>(store: S, probe: StoreProbe) -> Self
    where
        S: CounterSchema + LoginAttemptRepository + WriteWindowRepository + 'static,
    {
        let store = Arc::new(store);
        Self {
            schema: store.clone(),
            login_attempts: store.clone(),
            write_windows: store,
            probe,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_adapter(InMemoryCounterStore::new(), StoreProbe::Memory)
    }
}

pub async fn build_counter_store(
    config: &CounterStoreConfig,
    record_ttl_seconds: u64,
) -> AppResult<CounterStore> {
    match config {
        CounterStoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let pool = connect_pool(database_url, *max_connections).await?;
            Ok(CounterStore::from_adapter(
                PostgresCounterStore::new(pool.clone()),
                StoreProbe::Postgres(pool),
            ))
        }
        CounterStoreConfig::Redis {
            redis_url,
            key_prefix,
        } => {
            let client = build_redis_client(redis_url)?;
            Ok(CounterStore::from_adapter(
                RedisCounterStore::new(client.clone(), key_prefix.clone(), record_ttl_seconds),
                StoreProbe::Redis(client),
            ))
        }
        CounterStoreConfig::Memory => Ok(CounterStore::in_memory()),
    }
}
