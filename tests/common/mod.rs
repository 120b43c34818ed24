// Shared fakes for the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

use trainwatch::db::{Database, SessionStore};
use trainwatch::monitor::{
    Document, MonitorError, MonitorSettings, TicketQuery, TicketSource, WatcherManager,
};
use trainwatch::session::{CarriageType, ConversationId, Form, ShelfType};
use trainwatch::transport::{Outbound, Transport, TransportError};
use trainwatch::wizard::CityCatalog;

pub const TICK: Duration = Duration::from_millis(20);

pub fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(db_path).unwrap();
    (db, temp_dir)
}

pub fn cities() -> Arc<CityCatalog> {
    Arc::new(catalog())
}

pub fn catalog() -> CityCatalog {
    CityCatalog::new([
        ("Moscow", "2000000"),
        ("Kazan", "2060615"),
        ("Kaliningrad", "2058000"),
        ("Kaluga", "2000080"),
        ("Saint Petersburg", "2004000"),
        ("Samara", "2024000"),
    ])
}

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
}

/// A finished Moscow to Kazan search
pub fn complete_form(id: usize, track_price: bool) -> Form {
    Form {
        id,
        departure_point: Some("Moscow".into()),
        arrival_point: Some("Kazan".into()),
        departure_date: Some(date()),
        carriage_type: Some(CarriageType::Couchette),
        passenger_count: Some(2),
        compartment_numbers: vec![1, 2, 3, 4, 5, 6, 7, 8, 9],
        shelf_type: Some(ShelfType::Any),
        top_shelf_passengers: 0,
        bottom_shelf_passengers: 0,
        track_price_change: Some(track_price),
        suggest_similar_seats: Some(false),
    }
}

enum Step {
    Price(Option<String>),
    Fail,
}

/// Ticket source that replays a fixed sequence of observations.
///
/// The last observation repeats once the script runs out.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Option<String>>,
    hang: bool,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn prices(prices: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(prices.iter().map(|p| Step::Price(Some(p.to_string()))).collect()),
            last: Mutex::new(None),
            hang: false,
            fetches: AtomicUsize::new(0),
        })
    }

    /// Fails the first `failures` fetches, then serves `price`
    pub fn failing_then(failures: usize, price: &str) -> Arc<Self> {
        let mut script: VecDeque<Step> = (0..failures).map(|_| Step::Fail).collect();
        script.push_back(Step::Price(Some(price.to_string())));
        Arc::new(Self {
            script: Mutex::new(script),
            last: Mutex::new(None),
            hang: false,
            fetches: AtomicUsize::new(0),
        })
    }

    /// Every fetch blocks forever
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            hang: true,
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketSource for ScriptedSource {
    async fn fetch_document(&self, _query: &TicketQuery) -> Result<Document, MonitorError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }

        let next = self.script.lock().unwrap().pop_front();
        let price = match next {
            Some(Step::Fail) => return Err(MonitorError::FetchFailed("scripted failure".into())),
            Some(Step::Price(price)) => {
                *self.last.lock().unwrap() = price.clone();
                price
            }
            None => self.last.lock().unwrap().clone(),
        };
        Ok(Document::new(price.unwrap_or_default()))
    }

    fn extract_price(
        &self,
        document: &Document,
        _date: NaiveDate,
    ) -> Result<Option<String>, MonitorError> {
        if document.body.is_empty() {
            Ok(None)
        } else {
            Ok(Some(document.body.clone()))
        }
    }
}

/// Transport that keeps every message it was asked to send
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ConversationId, Outbound)>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(ConversationId, Outbound)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, m)| m.body().to_string()).collect()
    }

    /// Messages sent since the last call
    pub fn take(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().drain(..).map(|(_, m)| m).collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.bodies().iter().filter(|b| b.contains(needle)).count()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, to: ConversationId, message: Outbound) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((to, message));
        Ok(())
    }
}

pub fn manager(
    store: &SessionStore,
    source: Arc<dyn TicketSource>,
    transport: Arc<dyn Transport>,
    track_all_forms: bool,
) -> WatcherManager {
    WatcherManager::new(
        store.clone(),
        source,
        transport,
        cities(),
        MonitorSettings {
            poll_interval: TICK,
            track_all_forms,
        },
    )
}

/// Poll `check` until it holds or `limit` elapses
pub async fn eventually<F: FnMut() -> bool>(mut check: F, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
