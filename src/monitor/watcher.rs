//! Polling task for one watched form

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::source::{MonitorError, TicketQuery, TicketSource};
use super::state::{PriceDiff, WatchExit, WatchKey};
use crate::db::SessionStore;
use crate::session::{Form, PRICE_NOT_FOUND};
use crate::transport::{Outbound, Transport};
use crate::wizard::messages;

/// Collaborators shared by every watcher
pub struct WatchContext {
    pub store: SessionStore,
    pub source: Arc<dyn TicketSource>,
    pub transport: Arc<dyn Transport>,
    pub poll_interval: Duration,
}

pub struct Watcher {
    key: WatchKey,
    form: Form,
    query: TicketQuery,
    last_price: String,
    ctx: Arc<WatchContext>,
}

/// Resolves once the flag is raised or its sender is gone
async fn signalled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|raised| *raised).await;
}

impl Watcher {
    pub fn new(key: WatchKey, form: Form, query: TicketQuery, ctx: Arc<WatchContext>) -> Self {
        Self {
            key,
            form,
            query,
            last_price: PRICE_NOT_FOUND.to_string(),
            ctx,
        }
    }

    fn date(&self) -> NaiveDate {
        self.query.date
    }

    /// Fetch the page and extract the price for the watched date
    async fn observe(&self) -> Result<String, MonitorError> {
        let document = self.ctx.source.fetch_document(&self.query).await?;
        let price = self.ctx.source.extract_price(&document, self.date())?;
        Ok(price.unwrap_or_else(|| PRICE_NOT_FOUND.to_string()))
    }

    /// Establish the baseline, then poll until cancelled
    pub async fn run(
        mut self,
        mut cancel: watch::Receiver<bool>,
        mut shutdown: watch::Receiver<bool>,
    ) -> WatchExit {
        info!(watch = %self.key, route = %self.form.route(), date = %self.date(), "Watcher started");

        let baseline = tokio::select! {
            biased;
            _ = signalled(&mut cancel) => return self.exit(WatchExit::Stopped),
            _ = signalled(&mut shutdown) => return self.exit(WatchExit::Shutdown),
            observed = self.observe() => observed,
        };
        self.last_price = match baseline {
            Ok(price) => price,
            Err(e) => {
                warn!(watch = %self.key, error = %e, "Baseline fetch failed");
                PRICE_NOT_FOUND.to_string()
            }
        };
        self.persist().await;

        let period = self.ctx.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = signalled(&mut cancel) => return self.exit(WatchExit::Stopped),
                _ = signalled(&mut shutdown) => return self.exit(WatchExit::Shutdown),
                _ = ticker.tick() => {}
            }

            let observed = tokio::select! {
                biased;
                _ = signalled(&mut cancel) => return self.exit(WatchExit::Stopped),
                _ = signalled(&mut shutdown) => return self.exit(WatchExit::Shutdown),
                observed = self.observe() => observed,
            };

            match observed {
                Ok(price) => self.on_price(price).await,
                Err(e) => warn!(watch = %self.key, error = %e, "Poll failed, retrying next tick"),
            }
        }
    }

    async fn on_price(&mut self, price: String) {
        let PriceDiff::Changed { old, new } = PriceDiff::between(&self.last_price, &price) else {
            debug!(watch = %self.key, price = %price, "Price unchanged");
            return;
        };

        info!(watch = %self.key, old = %old, new = %new, "Price changed");
        self.last_price = new.clone();
        self.persist().await;

        let text = messages::price_changed(&self.form, self.date(), &old, &new);
        if let Err(e) = self
            .ctx
            .transport
            .send(self.key.conversation, Outbound::text(text))
            .await
        {
            warn!(watch = %self.key, error = %e, "Failed to send price notification");
        }
    }

    async fn persist(&self) {
        if let Err(e) = self
            .ctx
            .store
            .record_price(self.key.conversation, self.key.form_id, self.date(), &self.last_price)
            .await
        {
            warn!(watch = %self.key, error = %e, "Failed to persist form status");
        }
    }

    fn exit(&self, reason: WatchExit) -> WatchExit {
        info!(watch = %self.key, reason = ?reason, "Watcher stopped");
        reason
    }
}
