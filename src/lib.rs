/// Public library interface for the Hydration Tracker server
///
/// This module exports the hydration core (data store, stats, backup,
/// reminders, flags) and the server that wires it to the MCP tool surface.

use std::path::PathBuf;
use thiserror::Error;

pub mod domain;
pub mod storage;
pub mod store;
pub mod retry;
pub mod flags;
pub mod analytics;
pub mod backup;
pub mod reminders;
pub mod tools;
pub mod mcp;

// Re-export public modules and types
pub use domain::*;
pub use storage::{KeyValueBackend, MemoryStorage, SqliteStorage, StorageError, StoreKey};
pub use store::{DataStore, Record, StoreEvent, Subscription, Topic};
pub use analytics::{AnalyticsEngine, PerfectDayRule, UserStats};
pub use backup::{BackupError, BackupSnapshot, RestoreSummary};
pub use flags::{CriticalFlag, FlagBackend, FlagError, FlagStore, SqliteFlagBackend};
pub use reminders::{
    InMemoryDispatcher, NotificationDispatcher, ReminderScheduler, ScheduleOutcome, SchedulerConfig,
    SchedulerError,
};

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    #[error("Flag error: {0}")]
    Flag(#[from] FlagError),

    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Hydration tracker server that implements the MCP protocol
///
/// Owns every core component; nothing is a global. Tools borrow the pieces
/// they need through the accessors below.
pub struct HydrationTrackerServer {
    store: DataStore<SqliteStorage>,
    flags: FlagStore<SqliteFlagBackend>,
    dispatcher: InMemoryDispatcher,
    scheduler: ReminderScheduler,
    analytics: AnalyticsEngine,
}

impl HydrationTrackerServer {
    /// Open (or create) the record and flag databases
    pub async fn new(db_path: PathBuf, flags_path: PathBuf) -> Result<Self, ServerError> {
        tracing::info!("Initializing Hydration Tracker with database: {:?}", db_path);
        tracing::info!("Critical flags database: {:?}", flags_path);

        let store = DataStore::new(SqliteStorage::new(db_path)?);
        let flags = FlagStore::new(SqliteFlagBackend::new(flags_path)?);
        Ok(Self::from_parts(store, flags))
    }

    /// Server over throwaway in-memory databases
    pub fn in_memory() -> Result<Self, ServerError> {
        let store = DataStore::new(SqliteStorage::in_memory()?);
        let flags = FlagStore::new(SqliteFlagBackend::in_memory()?);
        Ok(Self::from_parts(store, flags))
    }

    fn from_parts(store: DataStore<SqliteStorage>, flags: FlagStore<SqliteFlagBackend>) -> Self {
        Self {
            store,
            flags,
            dispatcher: InMemoryDispatcher::new(),
            scheduler: ReminderScheduler::default(),
            analytics: AnalyticsEngine::new(),
        }
    }

    /// Load flags and schedule reminders, as an app would at launch
    pub async fn start(&self) -> Result<(), ServerError> {
        self.flags.initialize().await;
        let outcome = self.scheduler.ensure_scheduled(&self.store, &self.dispatcher, false).await?;
        tracing::info!("Startup reminder scheduling: {:?}", outcome);
        Ok(())
    }

    /// Run the MCP server, handling JSON-RPC requests over stdin/stdout
    ///
    /// This method will block until stdin closes or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Starting MCP server...");

        self.start().await?;
        let history = self.store.load_history();
        tracing::info!("Server started successfully, found {} tracked days", history.len());

        let mut mcp_server = mcp::McpServer::new(self);
        mcp_server.run().await?;

        Ok(())
    }

    pub fn store(&self) -> &DataStore<SqliteStorage> {
        &self.store
    }

    pub fn flags(&self) -> &FlagStore<SqliteFlagBackend> {
        &self.flags
    }

    pub fn dispatcher(&self) -> &InMemoryDispatcher {
        &self.dispatcher
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    pub fn analytics(&self) -> &AnalyticsEngine {
        &self.analytics
    }
}
