use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::HushConfig;
use crate::config_schema::ConfigSchema;
use crate::directory::{Directory, SeaOrmDirectory};
use crate::message_store::{MessageStore, SeaOrmMessageStore};
use crate::shutdown::ShutdownCoordinator;
use crate::state::State;

/// Every long-lived resource the server's handlers reach into, wired once at
/// startup. Mirrors `warpgate-core::Services`: `Arc`-wrapped shared state
/// plus the background maintenance tasks that keep it healthy.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Mutex<HushConfig>>,
    pub config_schema: Arc<ConfigSchema>,
    pub directory: Arc<dyn Directory>,
    pub message_store: Arc<dyn MessageStore>,
    pub state: Arc<State>,
    pub shutdown: ShutdownCoordinator,
}

impl Services {
    pub async fn new(config: HushConfig) -> Result<Self> {
        let db = connect_to_db(&config.database_url)
            .await
            .context("connecting to the principal/message-cache database")?;
        hush_db_migrations::migrate_database(&db)
            .await
            .context("running database migrations")?;

        let directory: Arc<dyn Directory> = Arc::new(SeaOrmDirectory::new(db.clone()));
        let message_store: Arc<dyn MessageStore> = Arc::new(SeaOrmMessageStore::new(db));
        let state = Arc::new(State::new(config.max_connections));

        let services = Self {
            config: Arc::new(Mutex::new(config)),
            config_schema: Arc::new(ConfigSchema::new()),
            directory,
            message_store,
            state,
            shutdown: ShutdownCoordinator::new(),
        };

        services.spawn_pending_verification_sweeper();

        Ok(services)
    }

    /// Background task expiring stale login challenges every 30s, mirroring
    /// `warpgate-core::Services::new`'s periodic `tokio::spawn` maintenance
    /// loops.
    fn spawn_pending_verification_sweeper(&self) {
        let state = self.state.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(30)).await;
                let expired = state.expire_pending().await;
                if !expired.is_empty() {
                    info!(count = expired.len(), "expired stale login challenges");
                }
            }
        });
    }
}

async fn connect_to_db(url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(url.to_owned());
    options.sqlx_logging(false);
    if url.contains(":memory:") {
        warn!("using an in-memory database, all state is lost on restart");
    }
    Ok(Database::connect(options).await?)
}
