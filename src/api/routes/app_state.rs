//! Application state management.
//!
//! Holds the storage backend and the settlement service shared across all
//! route handlers. Both are injected at construction; there is no global
//! connection state.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::services::gateway::{PaymentGateway, SimulatedGateway};
use crate::services::settlement::SettlementService;
use crate::storage::{PostgresBackend, SqliteBackend, StorageBackend, StorageError};

/// Application state shared across all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend (SQLite or PostgreSQL)
    pub storage: Arc<dyn StorageBackend>,
    /// The settlement coordinator
    pub settlement: Arc<SettlementService>,
}

impl AppState {
    /// Build state from explicit collaborators.
    pub fn new(storage: Arc<dyn StorageBackend>, gateway: Arc<dyn PaymentGateway>) -> Self {
        let settlement = Arc::new(SettlementService::new(storage.clone(), gateway));
        Self {
            storage,
            settlement,
        }
    }

    /// Initialize storage from environment configuration.
    ///
    /// Connects to PostgreSQL when DATABASE_URL is set, otherwise opens the
    /// SQLite file named by AIRLINE_DB (default `airline.sqlite`).
    pub async fn from_env() -> Result<Self, StorageError> {
        let storage: Arc<dyn StorageBackend> =
            if let Ok(database_url) = std::env::var("DATABASE_URL") {
                info!("Using PostgreSQL storage");
                Arc::new(PostgresBackend::connect(&database_url).await?)
            } else {
                let db_path =
                    std::env::var("AIRLINE_DB").unwrap_or_else(|_| "airline.sqlite".to_string());
                info!("Using SQLite storage at {}", db_path);
                let backend = SqliteBackend::open(Path::new(&db_path))?;
                backend.seed_demo_flights().await?;
                Arc::new(backend)
            };

        let delay_ms = std::env::var("GATEWAY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);
        let gateway = Arc::new(SimulatedGateway::new().with_delay(Duration::from_millis(delay_ms)));

        Ok(Self::new(storage, gateway))
    }
}
