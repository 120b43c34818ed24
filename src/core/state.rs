//! Application state

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::bot::Bot;
use crate::config::Config;
use crate::db::{Database, SessionStore};
use crate::monitor::{GrandTrainSource, MonitorSettings, TicketSource, WatcherManager};
use crate::transport::Transport;
use crate::wizard::CityCatalog;

pub struct AppState {
    pub db: Database,
    pub store: SessionStore,
    pub cities: Arc<CityCatalog>,
    pub watchers: Arc<WatcherManager>,
    pub bot: Bot,
}

impl AppState {
    /// Wire every component around explicit collaborators
    pub fn new(
        db: Database,
        cities: CityCatalog,
        source: Arc<dyn TicketSource>,
        transport: Arc<dyn Transport>,
        settings: MonitorSettings,
    ) -> Self {
        let store = SessionStore::new(db.clone());
        let cities = Arc::new(cities);
        let watchers = Arc::new(WatcherManager::new(
            store.clone(),
            source,
            Arc::clone(&transport),
            Arc::clone(&cities),
            settings,
        ));
        let bot = Bot::new(
            store.clone(),
            Arc::clone(&cities),
            Arc::clone(&watchers),
            transport,
        );

        Self {
            db,
            store,
            cities,
            watchers,
            bot,
        }
    }

    /// Build the production wiring from a loaded config
    pub fn from_config(
        config: &Config,
        db: Database,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let cities = match config.resolve_cities_path()? {
            Some(path) => CityCatalog::from_file(path)?,
            None => CityCatalog::builtin()?,
        };
        let source = GrandTrainSource::new(config.source.url.clone(), config.source.timeout())
            .context("Failed to build ticket source HTTP client")?;
        let source = Arc::new(source);

        Ok(Self::new(
            db,
            cities,
            source,
            transport,
            config.monitor.settings(),
        ))
    }
}
