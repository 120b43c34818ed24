//! grandtrain.ru ticket source
//!
//! The search endpoint answers a form-encoded POST with an HTML fragment
//! listing neighbouring dates. Each date is an `<a data-thisdate="...">`
//! block whose `otherprices__detail-price` div holds one span per carriage
//! class; the couchette price is the span with `data-table="Плац"`.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use super::source::{Document, MonitorError, TicketQuery, TicketSource};

pub const DEFAULT_URL: &str = "https://grandtrain.ru/local/components/oscompany/train.select/ajax.php";

/// Carriage class whose price is reported
const PRICE_TABLE: &str = "Плац";

pub struct GrandTrainSource {
    client: Client,
    url: String,
}

impl GrandTrainSource {
    /// Build the HTTP client with the given request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

/// Form fields of a search request
pub fn form_params(query: &TicketQuery) -> Vec<(&'static str, String)> {
    vec![
        ("from", query.origin_code.clone()),
        ("to", query.destination_code.clone()),
        ("forward_date", query.date.format("%d.%m.%Y").to_string()),
        ("backward_date", String::new()),
        ("multimodal", "0".to_string()),
        ("pagestyle", "tav".to_string()),
        ("timeout", "10".to_string()),
    ]
}

#[async_trait]
impl TicketSource for GrandTrainSource {
    async fn fetch_document(&self, query: &TicketQuery) -> Result<Document, MonitorError> {
        debug!(
            from = %query.origin_code,
            to = %query.destination_code,
            date = %query.date,
            "Fetching prices"
        );

        let response = self
            .client
            .post(&self.url)
            .form(&form_params(query))
            .send()
            .await
            .map_err(|e| MonitorError::FetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MonitorError::FetchFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MonitorError::FetchFailed(e.to_string()))?;
        Ok(Document::new(body))
    }

    fn extract_price(
        &self,
        document: &Document,
        date: NaiveDate,
    ) -> Result<Option<String>, MonitorError> {
        extract_price(&document.body, date)
    }
}

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a>").expect("valid regex"))
}

fn price_div_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<div\b[^>]*class\s*=\s*["'][^"']*otherprices__detail-price[^"']*["'][^>]*>"#)
            .expect("valid regex")
    })
}

fn span_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<span\b([^>]*)>(.*?)</span>").expect("valid regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"))
}

fn has_attr(attrs: &str, name: &str, value: &str) -> bool {
    attrs.contains(&format!("{}=\"{}\"", name, value))
        || attrs.contains(&format!("{}='{}'", name, value))
}

/// Couchette price for `date` in a search result page
pub fn extract_price(html: &str, date: NaiveDate) -> Result<Option<String>, MonitorError> {
    if html.trim().is_empty() {
        return Err(MonitorError::ExtractFailed("empty document".to_string()));
    }

    let wanted = date.format("%Y-%m-%d").to_string();

    for anchor in anchor_re().captures_iter(html) {
        if !has_attr(&anchor[1], "data-thisdate", &wanted) {
            continue;
        }

        let body = &anchor[2];
        let Some(div) = price_div_re().find(body) else {
            continue;
        };

        for span in span_re().captures_iter(&body[div.end()..]) {
            if !has_attr(&span[1], "data-table", PRICE_TABLE) {
                continue;
            }
            let text = tag_re().replace_all(&span[2], "");
            let text = text.replace("&nbsp;", " ");
            let price = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if price.is_empty() {
                return Ok(None);
            }
            return Ok(Some(price));
        }
    }

    Ok(None)
}
