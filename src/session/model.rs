//! Session aggregate and ticket search forms

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::wizard::Step;

/// Lowest and highest passenger count a form accepts
pub const MIN_PASSENGERS: u8 = 1;
pub const MAX_PASSENGERS: u8 = 6;

/// Compartments are numbered 1..=9 in a couchette carriage
pub const MIN_COMPARTMENT: u8 = 1;
pub const MAX_COMPARTMENT: u8 = 9;

/// Price value meaning "no seats found for that date"
pub const PRICE_NOT_FOUND: &str = "-";

/// Opaque identity of one chat conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Flow the wizard is currently running for a conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    #[default]
    None,
    Start,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::None => "none",
            Command::Start => "start",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarriageType {
    Any,
    Couchette,
    Compartment,
}

impl CarriageType {
    pub const ALL: [CarriageType; 3] = [
        CarriageType::Any,
        CarriageType::Couchette,
        CarriageType::Compartment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CarriageType::Any => "any",
            CarriageType::Couchette => "couchette",
            CarriageType::Compartment => "compartment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CarriageType::Any => "Any",
            CarriageType::Couchette => "Couchette",
            CarriageType::Compartment => "Compartment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShelfType {
    Any,
    ChooseLower,
    ChooseUpper,
}

impl ShelfType {
    pub const ALL: [ShelfType; 3] = [
        ShelfType::Any,
        ShelfType::ChooseLower,
        ShelfType::ChooseUpper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShelfType::Any => "any",
            ShelfType::ChooseLower => "choose-lower",
            ShelfType::ChooseUpper => "choose-upper",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShelfType::Any => "Any berths",
            ShelfType::ChooseLower => "Choose lower berths",
            ShelfType::ChooseUpper => "Choose upper berths",
        }
    }
}

/// Invariant violations of a [`Form`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Missing field: {0}")]
    Missing(&'static str),

    #[error("Empty city name in {0}")]
    EmptyCity(&'static str),

    #[error("Passenger count {0} outside 1..=6")]
    PassengerCount(u8),

    #[error("Invalid compartment list: {0:?}")]
    Compartments(Vec<u8>),

    #[error("Shelf split {top}+{bottom} does not match {passengers} passengers")]
    ShelfSplit { top: u8, bottom: u8, passengers: u8 },
}

/// One ticket search request
///
/// Every field but `id` starts unset while the wizard is filling the form in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: usize,
    #[serde(default)]
    pub departure_point: Option<String>,
    #[serde(default)]
    pub arrival_point: Option<String>,
    #[serde(default)]
    pub departure_date: Option<NaiveDate>,
    #[serde(default)]
    pub carriage_type: Option<CarriageType>,
    #[serde(default)]
    pub passenger_count: Option<u8>,
    #[serde(default)]
    pub compartment_numbers: Vec<u8>,
    #[serde(default)]
    pub shelf_type: Option<ShelfType>,
    #[serde(default)]
    pub top_shelf_passengers: u8,
    #[serde(default)]
    pub bottom_shelf_passengers: u8,
    #[serde(default)]
    pub track_price_change: Option<bool>,
    #[serde(default)]
    pub suggest_similar_seats: Option<bool>,
}

impl Form {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// True once every field the terminal step requires is set
    pub fn is_complete(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), FormError> {
        let departure = self
            .departure_point
            .as_deref()
            .ok_or(FormError::Missing("departurePoint"))?;
        if departure.trim().is_empty() {
            return Err(FormError::EmptyCity("departurePoint"));
        }
        let arrival = self
            .arrival_point
            .as_deref()
            .ok_or(FormError::Missing("arrivalPoint"))?;
        if arrival.trim().is_empty() {
            return Err(FormError::EmptyCity("arrivalPoint"));
        }
        self.departure_date
            .ok_or(FormError::Missing("departureDate"))?;
        self.carriage_type.ok_or(FormError::Missing("carriageType"))?;

        let passengers = self
            .passenger_count
            .ok_or(FormError::Missing("passengerCount"))?;
        if !(MIN_PASSENGERS..=MAX_PASSENGERS).contains(&passengers) {
            return Err(FormError::PassengerCount(passengers));
        }

        if !compartments_valid(&self.compartment_numbers) {
            return Err(FormError::Compartments(self.compartment_numbers.clone()));
        }

        let shelf = self.shelf_type.ok_or(FormError::Missing("shelfType"))?;
        if shelf != ShelfType::Any
            && self.top_shelf_passengers + self.bottom_shelf_passengers != passengers
        {
            return Err(FormError::ShelfSplit {
                top: self.top_shelf_passengers,
                bottom: self.bottom_shelf_passengers,
                passengers,
            });
        }

        self.track_price_change
            .ok_or(FormError::Missing("trackPriceChange"))?;
        self.suggest_similar_seats
            .ok_or(FormError::Missing("suggestSimilarSeats"))?;
        Ok(())
    }

    /// "Moscow → Kazan", with placeholders for unset cities
    pub fn route(&self) -> String {
        format!(
            "{} → {}",
            self.departure_point.as_deref().unwrap_or("?"),
            self.arrival_point.as_deref().unwrap_or("?")
        )
    }
}

/// Non-empty, unique, every entry within 1..=9
pub fn compartments_valid(numbers: &[u8]) -> bool {
    if numbers.is_empty() || numbers.len() > MAX_COMPARTMENT as usize {
        return false;
    }
    let mut seen = HashSet::new();
    numbers
        .iter()
        .all(|n| (MIN_COMPARTMENT..=MAX_COMPARTMENT).contains(n) && seen.insert(*n))
}

/// Last observed external state of one watched form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    #[serde(default)]
    pub form_id: usize,
    pub date: NaiveDate,
    pub price: String,
    #[serde(default = "default_watching")]
    pub watching: bool,
    #[serde(default)]
    pub checked_at: Option<DateTime<Utc>>,
}

fn default_watching() -> bool {
    true
}

impl FormState {
    pub fn new(form_id: usize, date: NaiveDate, price: impl Into<String>) -> Self {
        Self {
            form_id,
            date,
            price: price.into(),
            watching: true,
            checked_at: Some(Utc::now()),
        }
    }

    pub fn price_found(&self) -> bool {
        self.price != PRICE_NOT_FOUND
    }
}

/// Per-conversation aggregate stored as one JSON document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub step: Step,
    pub command: Command,
    #[serde(default)]
    pub forms: Vec<Form>,
    #[serde(default)]
    pub forms_status: Vec<FormState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.command == Command::None
    }

    pub fn last_form(&self) -> Option<&Form> {
        self.forms.last()
    }

    pub fn last_form_mut(&mut self) -> Option<&mut Form> {
        self.forms.last_mut()
    }

    pub fn form(&self, id: usize) -> Option<&Form> {
        self.forms.iter().find(|f| f.id == id)
    }

    /// Forms the wizard has finished, in creation order
    pub fn complete_forms(&self) -> impl Iterator<Item = &Form> {
        self.forms.iter().filter(|f| f.is_complete())
    }

    /// Append a placeholder form whose id is its index
    pub fn push_empty_form(&mut self) -> usize {
        let id = self.forms.len();
        self.forms.push(Form::new(id));
        id
    }

    pub fn form_status(&self, form_id: usize) -> Option<&FormState> {
        self.forms_status.iter().find(|s| s.form_id == form_id)
    }

    pub fn form_status_mut(&mut self, form_id: usize) -> Option<&mut FormState> {
        self.forms_status.iter_mut().find(|s| s.form_id == form_id)
    }

    /// Replace the entry for the same form or append a new one
    pub fn upsert_form_status(&mut self, state: FormState) {
        match self.form_status_mut(state.form_id) {
            Some(existing) => *existing = state,
            None => self.forms_status.push(state),
        }
    }

    /// Return to idle; the step is meaningless without a command
    pub fn reset(&mut self) {
        self.command = Command::None;
        self.step = Step::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> Form {
        Form {
            id: 0,
            departure_point: Some("Moscow".into()),
            arrival_point: Some("Kazan".into()),
            departure_date: NaiveDate::from_ymd_opt(2025, 5, 1),
            carriage_type: Some(CarriageType::Any),
            passenger_count: Some(2),
            compartment_numbers: vec![1, 2, 3],
            shelf_type: Some(ShelfType::ChooseLower),
            top_shelf_passengers: 1,
            bottom_shelf_passengers: 1,
            track_price_change: Some(true),
            suggest_similar_seats: Some(false),
        }
    }

    #[test]
    fn test_complete_form_validates() {
        assert!(complete_form().is_complete());
        assert!(!Form::new(3).is_complete());
    }

    #[test]
    fn test_shelf_split_must_match_passengers() {
        let mut form = complete_form();
        form.top_shelf_passengers = 2;
        assert_eq!(
            form.validate(),
            Err(FormError::ShelfSplit { top: 2, bottom: 1, passengers: 2 })
        );

        form.shelf_type = Some(ShelfType::Any);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_compartments_valid() {
        assert!(compartments_valid(&[1, 9]));
        assert!(!compartments_valid(&[]));
        assert!(!compartments_valid(&[0]));
        assert!(!compartments_valid(&[10]));
        assert!(!compartments_valid(&[3, 3]));
    }

    #[test]
    fn test_session_json_uses_camel_case() {
        let mut session = Session::new();
        session.forms.push(complete_form());
        session
            .forms_status
            .push(FormState::new(0, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(), "1200₽"));

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["command"], "none");
        assert_eq!(json["step"], 0);
        assert_eq!(json["forms"][0]["departurePoint"], "Moscow");
        assert_eq!(json["forms"][0]["shelfType"], "choose-lower");
        assert_eq!(json["formsStatus"][0]["price"], "1200₽");
    }

    #[test]
    fn test_legacy_form_state_defaults() {
        let state: FormState =
            serde_json::from_str(r#"{"date":"2025-05-01","price":"-"}"#).unwrap();
        assert_eq!(state.form_id, 0);
        assert!(state.watching);
        assert!(!state.price_found());
    }

    #[test]
    fn test_upsert_form_status_replaces_by_form_id() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let mut session = Session::new();
        session.upsert_form_status(FormState::new(0, date, "100"));
        session.upsert_form_status(FormState::new(1, date, "200"));
        session.upsert_form_status(FormState::new(0, date, "150"));

        assert_eq!(session.forms_status.len(), 2);
        assert_eq!(session.form_status(0).unwrap().price, "150");
    }
}
