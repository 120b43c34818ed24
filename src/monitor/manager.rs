//! Watcher manager: owns every running watcher task
//!
//! One entry per `(conversation, form)` pair. Starting a watcher for a key
//! that already has one cancels the old task inside the same critical
//! section, so a duplicate start never leaks a poller. Start and stop hold
//! the transition lock across their store write and map update, so the
//! persisted `watching` flag always matches the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::source::{MonitorError, TicketQuery, TicketSource};
use super::state::{WatchExit, WatchKey};
use super::watcher::{WatchContext, Watcher};
use crate::db::{SessionStore, StoreError};
use crate::session::{ConversationId, Form, FormState, PRICE_NOT_FOUND};
use crate::transport::Transport;
use crate::wizard::CityCatalog;

/// Tunables of the monitoring engine
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    /// Watch every completed form, not only those with price tracking on
    pub track_all_forms: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            track_all_forms: false,
        }
    }
}

struct WatcherHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<WatchExit>,
}

impl WatcherHandle {
    fn cancel(&self) {
        // Receiver gone means the task already returned
        let _ = self.cancel.send(true);
    }
}

pub struct WatcherManager {
    ctx: Arc<WatchContext>,
    cities: Arc<CityCatalog>,
    settings: MonitorSettings,
    shutdown: watch::Sender<bool>,
    watchers: Mutex<HashMap<WatchKey, WatcherHandle>>,
    /// Serializes start and stop
    transitions: AsyncMutex<()>,
}

impl WatcherManager {
    pub fn new(
        store: SessionStore,
        source: Arc<dyn TicketSource>,
        transport: Arc<dyn Transport>,
        cities: Arc<CityCatalog>,
        settings: MonitorSettings,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let ctx = Arc::new(WatchContext {
            store,
            source,
            transport,
            poll_interval: settings.poll_interval,
        });

        Self {
            ctx,
            cities,
            settings,
            shutdown,
            watchers: Mutex::new(HashMap::new()),
            transitions: AsyncMutex::new(()),
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    fn watchers(&self) -> MutexGuard<'_, HashMap<WatchKey, WatcherHandle>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.watchers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether a completed form gets a watcher under the current policy
    pub fn should_watch(&self, form: &Form) -> bool {
        self.settings.track_all_forms || form.track_price_change == Some(true)
    }

    /// Start watching a completed form.
    ///
    /// Returns `Ok(false)` when the watch policy skips the form.
    pub async fn start(
        &self,
        conversation: ConversationId,
        form: Form,
    ) -> Result<bool, MonitorError> {
        if !form.is_complete() {
            return Err(MonitorError::IncompleteForm(form.id));
        }
        if !self.should_watch(&form) {
            debug!(conversation = %conversation, form_id = form.id, "Price tracking off, not watching");
            return Ok(false);
        }

        let query = TicketQuery::for_form(&form, &self.cities)?;
        let key = WatchKey::new(conversation, form.id);

        let _transition = self.transitions.lock().await;

        let date = query.date;
        self.ctx
            .store
            .modify(conversation, |session| match session.form_status_mut(form.id) {
                Some(state) => state.watching = true,
                None => session.upsert_form_status(FormState::new(form.id, date, PRICE_NOT_FOUND)),
            })
            .await?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let shutdown_rx = self.shutdown.subscribe();
        let watcher = Watcher::new(key, form, query, Arc::clone(&self.ctx));

        let mut watchers = self.watchers();
        if let Some(previous) = watchers.remove(&key) {
            info!(watch = %key, "Replacing running watcher");
            previous.cancel();
            previous.task.abort();
        }
        let task = tokio::spawn(watcher.run(cancel_rx, shutdown_rx));
        watchers.insert(
            key,
            WatcherHandle {
                cancel: cancel_tx,
                task,
            },
        );

        Ok(true)
    }

    /// Stop one watcher and record that the user no longer wants it.
    ///
    /// Returns false when neither a running task nor a status entry existed.
    pub async fn stop(
        &self,
        conversation: ConversationId,
        form_id: usize,
    ) -> Result<bool, StoreError> {
        let key = WatchKey::new(conversation, form_id);
        let _transition = self.transitions.lock().await;
        let handle = self.watchers().remove(&key);

        let was_running = match handle {
            Some(handle) => {
                handle.cancel();
                info!(watch = %key, "Stopping watcher");
                true
            }
            None => {
                debug!(watch = %key, "No active watcher");
                false
            }
        };

        let had_status = self.ctx.store.set_watching(conversation, form_id, false).await?;
        Ok(was_running || had_status)
    }

    /// Cancel every watcher; returns how many were running
    pub fn stop_all(&self) -> usize {
        let drained: Vec<(WatchKey, WatcherHandle)> = self.watchers().drain().collect();
        for (key, handle) in &drained {
            debug!(watch = %key, "Cancelling watcher");
            handle.cancel();
        }
        drained.len()
    }

    /// Signal every watcher to exit and wait for them, aborting stragglers
    pub async fn shutdown(&self, timeout: Duration) {
        let _ = self.shutdown.send(true);

        let handles: Vec<(WatchKey, WatcherHandle)> = self.watchers().drain().collect();
        if handles.is_empty() {
            return;
        }
        info!("Shutting down {} watchers", handles.len());

        let aborts: Vec<_> = handles.iter().map(|(_, h)| h.task.abort_handle()).collect();
        let tasks = handles.into_iter().map(|(_, h)| h.task);

        if tokio::time::timeout(timeout, futures::future::join_all(tasks))
            .await
            .is_err()
        {
            warn!("Watchers did not stop within {:?}, aborting", timeout);
            for abort in aborts {
                abort.abort();
            }
        }
    }

    /// Restart watchers that were running before the process restarted
    pub async fn resume(&self) -> Result<usize, StoreError> {
        let mut started = 0;

        for conversation in self.ctx.store.list_ids().await? {
            let session = match self.ctx.store.read(conversation).await {
                Ok(session) => session,
                Err(e) => {
                    warn!(conversation = %conversation, error = %e, "Skipping unreadable session");
                    continue;
                }
            };

            for state in session.forms_status.iter().filter(|s| s.watching) {
                let Some(form) = session.form(state.form_id) else {
                    warn!(conversation = %conversation, form_id = state.form_id, "Status for unknown form");
                    continue;
                };
                match self.start(conversation, form.clone()).await {
                    Ok(true) => started += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(conversation = %conversation, form_id = form.id, error = %e, "Failed to resume watcher")
                    }
                }
            }
        }

        info!("Resumed {} watchers", started);
        Ok(started)
    }

    pub fn is_watching(&self, conversation: ConversationId, form_id: usize) -> bool {
        self.watchers()
            .get(&WatchKey::new(conversation, form_id))
            .is_some_and(|h| !h.task.is_finished())
    }

    pub fn active_count(&self) -> usize {
        self.watchers()
            .values()
            .filter(|h| !h.task.is_finished())
            .count()
    }
}

impl Drop for WatcherManager {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
