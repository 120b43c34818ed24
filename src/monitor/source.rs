//! Ticket source trait

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::StoreError;
use crate::session::Form;
use crate::wizard::CityCatalog;

/// Query sent to the ticket source for one form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketQuery {
    pub origin_code: String,
    pub destination_code: String,
    pub date: NaiveDate,
}

impl TicketQuery {
    /// Resolve the form's cities to station codes
    pub fn for_form(form: &Form, cities: &CityCatalog) -> Result<Self, MonitorError> {
        let (Some(origin), Some(destination), Some(date)) = (
            form.departure_point.as_deref(),
            form.arrival_point.as_deref(),
            form.departure_date,
        ) else {
            return Err(MonitorError::IncompleteForm(form.id));
        };

        let origin_code = cities
            .code(origin)
            .ok_or_else(|| MonitorError::UnknownCity(origin.to_string()))?;
        let destination_code = cities
            .code(destination)
            .ok_or_else(|| MonitorError::UnknownCity(destination.to_string()))?;

        Ok(Self {
            origin_code: origin_code.to_string(),
            destination_code: destination_code.to_string(),
            date,
        })
    }
}

/// Raw page returned by the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub body: String,
}

impl Document {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// Where the monitoring engine gets its prices from
#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn fetch_document(&self, query: &TicketQuery) -> Result<Document, MonitorError>;

    /// Price shown for `date`, or `None` when the page has no seats for it
    fn extract_price(
        &self,
        document: &Document,
        date: NaiveDate,
    ) -> Result<Option<String>, MonitorError>;
}

/// Errors that can occur during monitoring
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Extract failed: {0}")]
    ExtractFailed(String),

    #[error("Unknown city: {0}")]
    UnknownCity(String),

    #[error("Form {0} is not complete")]
    IncompleteForm(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}
