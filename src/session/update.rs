//! Partial updates applied through the store

use chrono::NaiveDate;

use super::model::{CarriageType, Command, Form, Session, ShelfType};
use crate::wizard::Step;

/// Fields to overwrite on a form; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormUpdate {
    pub departure_point: Option<String>,
    pub arrival_point: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub carriage_type: Option<CarriageType>,
    pub passenger_count: Option<u8>,
    pub compartment_numbers: Option<Vec<u8>>,
    pub shelf_type: Option<ShelfType>,
    pub top_shelf_passengers: Option<u8>,
    pub bottom_shelf_passengers: Option<u8>,
    pub track_price_change: Option<bool>,
    pub suggest_similar_seats: Option<bool>,
}

impl FormUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, form: &mut Form) {
        if let Some(v) = &self.departure_point {
            form.departure_point = Some(v.clone());
        }
        if let Some(v) = &self.arrival_point {
            form.arrival_point = Some(v.clone());
        }
        if let Some(v) = self.departure_date {
            form.departure_date = Some(v);
        }
        if let Some(v) = self.carriage_type {
            form.carriage_type = Some(v);
        }
        if let Some(v) = self.passenger_count {
            form.passenger_count = Some(v);
        }
        if let Some(v) = &self.compartment_numbers {
            form.compartment_numbers = v.clone();
        }
        if let Some(v) = self.shelf_type {
            form.shelf_type = Some(v);
        }
        if let Some(v) = self.top_shelf_passengers {
            form.top_shelf_passengers = v;
        }
        if let Some(v) = self.bottom_shelf_passengers {
            form.bottom_shelf_passengers = v;
        }
        if let Some(v) = self.track_price_change {
            form.track_price_change = Some(v);
        }
        if let Some(v) = self.suggest_similar_seats {
            form.suggest_similar_seats = Some(v);
        }
    }
}

/// Fields to overwrite on a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub step: Option<Step>,
    pub command: Option<Command>,
}

impl SessionUpdate {
    pub fn goto(step: Step) -> Self {
        Self {
            step: Some(step),
            ..Default::default()
        }
    }

    pub fn begin(command: Command) -> Self {
        Self {
            step: Some(Step::default()),
            command: Some(command),
        }
    }

    pub fn idle() -> Self {
        Self::begin(Command::None)
    }

    pub fn apply(&self, session: &mut Session) {
        if let Some(step) = self.step {
            session.step = step;
        }
        if let Some(command) = self.command {
            session.command = command;
        }
    }
}
