//! Price monitoring
//! One polling task per watched form, owned by the watcher manager

pub mod grandtrain;
pub mod manager;
pub mod source;
pub mod state;
pub mod watcher;

pub use grandtrain::GrandTrainSource;
pub use manager::{MonitorSettings, WatcherManager};
pub use source::{Document, MonitorError, TicketQuery, TicketSource};
pub use state::{PriceDiff, WatchExit, WatchKey};
pub use watcher::{WatchContext, Watcher};
