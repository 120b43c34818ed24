//! User-facing texts and prompt builders

use chrono::NaiveDate;

use super::parse::format_compartments;
use crate::session::{CarriageType, Form, FormState, ShelfType};
use crate::transport::{ChoiceOption, Outbound};

pub const HELP: &str = "Type /start to create a ticket search.\n\
/list shows your searches, /status the latest prices,\n\
/stop <number> stops watching a search, /cancel aborts the current one.";
pub const ASK_DEPARTURE: &str = "Where are you travelling from?";
pub const ASK_ARRIVAL: &str = "Choose your destination.";
pub const NOTHING_FOUND: &str = "Nothing found. Try again.";
pub const TOO_MANY_RESULTS: &str = "Too many results. Try again.";
pub const ASK_DATE: &str = "Choose the departure date.";
pub const ASK_CARRIAGE: &str = "Which carriage type suits you?";
pub const ASK_PASSENGERS: &str = "How many passengers?\n(Enter a number from 1 to 6)";
pub const PASSENGERS_HINT: &str = "(Enter a number from 1 to 6)";
pub const ASK_COMPARTMENT: &str = "Which compartments?";
pub const ASK_COMPARTMENT_LIST: &str = "List the compartment numbers separated by spaces (1-9)";
pub const ASK_SHELF: &str = "Which berths suit you?";
pub const ASK_TRACK_PRICE: &str = "Track price changes?";
pub const ASK_SUGGEST_SIMILAR: &str = "Suggest similar seats?";
pub const FORM_SAVED: &str = "Your request is saved! 🚆 I will let you know as soon as tickets \
matching it show up.\n\nUse /list to see the searches you are tracking.";
pub const NO_FORMS: &str = "No searches yet. Create one with /start.";
pub const NO_STATUS: &str = "None of your searches is being watched yet.";
pub const FLOW_IN_PROGRESS: &str = "Finish the current request first, or send /cancel.";
pub const CANCELLED: &str = "Request cancelled.";
pub const NOTHING_TO_CANCEL: &str = "There is no request in progress.";
pub const SOMETHING_WRONG: &str = "Something went wrong, try /start again.";
pub const STOP_USAGE: &str = "Usage: /stop <search number>";
pub const LIST_HEADER: &str = "All searches:";

pub const TOKEN_YES: &str = "yes";
pub const TOKEN_NO: &str = "no";
pub const TOKEN_ANY: &str = "any";
pub const TOKEN_NOT_SIDE: &str = "not-side";
pub const TOKEN_CHOOSE: &str = "choose";

pub fn results_for(query: &str) -> String {
    format!("Results for \"{}\":", query.trim())
}

pub fn route_chosen(departure: &str, arrival: &str) -> String {
    format!("Route chosen:\n{} → {}", departure, arrival)
}

pub fn date_chosen(date: NaiveDate) -> String {
    format!("You chose: {}", date.format("%Y-%m-%d"))
}

pub fn ask_berths(shelf: Option<ShelfType>, passengers: u8) -> String {
    let side = match shelf {
        Some(ShelfType::ChooseUpper) => "upper",
        _ => "lower",
    };
    format!(
        "How many passengers on {} berths?\n{}",
        side,
        berth_hint(passengers)
    )
}

pub fn berth_hint(passengers: u8) -> String {
    format!("(Enter a number from 0 to {})", passengers)
}

pub fn shelf_summary(lower: u8, upper: u8) -> String {
    format!("Lower berths: {}\nUpper berths: {}", lower, upper)
}

pub fn stopped(form_id: usize) -> String {
    format!("Stopped watching search #{}.", form_id)
}

pub fn not_watching(form_id: usize) -> String {
    format!("Search #{} is not being watched.", form_id)
}

pub fn price_changed(form: &Form, date: NaiveDate, old: &str, new: &str) -> String {
    format!(
        "Price change for search #{} ({}, {}):\n{} → {}",
        form.id,
        form.route(),
        date.format("%d.%m.%Y"),
        old,
        new
    )
}

pub fn yes_no() -> Vec<ChoiceOption> {
    vec![
        ChoiceOption::new("Yes", TOKEN_YES),
        ChoiceOption::new("No", TOKEN_NO),
    ]
}

pub fn carriage_options() -> Vec<ChoiceOption> {
    CarriageType::ALL
        .iter()
        .map(|c| ChoiceOption::new(c.label(), c.as_str()))
        .collect()
}

pub fn compartment_options() -> Vec<ChoiceOption> {
    vec![
        ChoiceOption::new("Any", TOKEN_ANY),
        ChoiceOption::new("Not side", TOKEN_NOT_SIDE),
        ChoiceOption::new("Choose", TOKEN_CHOOSE),
    ]
}

pub fn shelf_options() -> Vec<ChoiceOption> {
    ShelfType::ALL
        .iter()
        .map(|s| ChoiceOption::new(s.label(), s.as_str()))
        .collect()
}

pub fn city_options(cities: &[String]) -> Vec<ChoiceOption> {
    cities.iter().map(|c| ChoiceOption::plain(c.as_str())).collect()
}

/// Multi-line description used by `/list`
pub fn describe_form(form: &Form) -> String {
    let date = form
        .departure_date
        .map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|| "-".to_string());
    let carriage = form.carriage_type.map(|c| c.label()).unwrap_or("-");
    let passengers = form.passenger_count.unwrap_or(0);

    let seats = match form.shelf_type {
        Some(ShelfType::Any) | None => "Any seats".to_string(),
        Some(_) => shelf_summary(form.bottom_shelf_passengers, form.top_shelf_passengers),
    };

    let mut options = Vec::new();
    if form.track_price_change == Some(true) {
        options.push("Tracking price");
    }
    if form.suggest_similar_seats == Some(true) {
        options.push("Suggesting similar seats");
    } else {
        options.push("Only the chosen seats");
    }

    format!(
        "Route:\n{}\nDate: {}\nCarriage: {}\nPassengers: {}\nCompartments: {}\n{}\n{}\nSearch number: {}",
        form.route(),
        date,
        carriage,
        passengers,
        format_compartments(&form.compartment_numbers),
        seats,
        options.join(",\n"),
        form.id
    )
}

/// One `/status` line
pub fn describe_status(state: &FormState) -> String {
    let watching = if state.watching { "" } else { " (stopped)" };
    format!(
        "Search #{}{}: tickets on {}\nCouchette: {}",
        state.form_id,
        watching,
        state.date.format("%d.%m.%Y"),
        state.price
    )
}

pub fn text(message: &str) -> Outbound {
    Outbound::text(message)
}
