//! Step table for the `start` flow
//!
//! Each step has a prompt and an accept function. Accept functions are pure:
//! they look at the form under construction and the user's input and either
//! describe a transition or reject the input with a re-prompt.

use chrono::NaiveDate;

use super::cities::CityCatalog;
use super::messages::{self, text};
use super::parse::{
    parse_berth_count, parse_compartments, parse_passenger_count, ANY_COMPARTMENTS,
    NOT_SIDE_COMPARTMENTS,
};
use super::step::Step;
use crate::db::StoreError;
use crate::session::{CarriageType, Command, Form, FormError, FormUpdate, Session, ShelfType};
use crate::transport::Outbound;

/// Largest result list offered as buttons; anything above asks for a longer prefix
pub const MAX_CITY_CHOICES: usize = 5;

/// Inbound user reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Choice(String),
    Date(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Stay,
    Goto(Step),
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub update: FormUpdate,
    pub next: Next,
    pub replies: Vec<Outbound>,
}

impl Transition {
    fn goto(next: Step, update: FormUpdate) -> Self {
        Self {
            update,
            next: Next::Goto(next),
            replies: Vec::new(),
        }
    }

    fn stay(replies: Vec<Outbound>) -> Self {
        Self {
            update: FormUpdate::default(),
            next: Next::Stay,
            replies,
        }
    }

    fn with_reply(mut self, reply: Outbound) -> Self {
        self.replies.push(reply);
        self
    }
}

/// Input did not match the step's grammar; nothing changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub replies: Vec<Outbound>,
}

impl Rejection {
    fn hint(message: impl Into<String>) -> Self {
        Self {
            replies: vec![Outbound::text(message)],
        }
    }
}

type PromptFn = fn(&Form) -> Vec<Outbound>;
type AcceptFn = fn(&Form, &Input, &CityCatalog) -> Result<Transition, Rejection>;

struct StepEntry {
    step: Step,
    prompt: PromptFn,
    accept: AcceptFn,
}

static FLOW: [StepEntry; 10] = [
    StepEntry {
        step: Step::Departure,
        prompt: prompt_departure,
        accept: accept_departure,
    },
    StepEntry {
        step: Step::Arrival,
        prompt: prompt_arrival,
        accept: accept_arrival,
    },
    StepEntry {
        step: Step::Passengers,
        prompt: prompt_passengers,
        accept: accept_passengers,
    },
    StepEntry {
        step: Step::Compartments,
        prompt: prompt_compartments,
        accept: accept_compartments,
    },
    StepEntry {
        step: Step::ShelfSplit,
        prompt: prompt_shelf_split,
        accept: accept_shelf_split,
    },
    StepEntry {
        step: Step::TrackPrice,
        prompt: prompt_track_price,
        accept: accept_track_price,
    },
    StepEntry {
        step: Step::DepartureDate,
        prompt: prompt_date,
        accept: accept_date,
    },
    StepEntry {
        step: Step::CarriageType,
        prompt: prompt_carriage,
        accept: accept_carriage,
    },
    StepEntry {
        step: Step::ShelfType,
        prompt: prompt_shelf_type,
        accept: accept_shelf_type,
    },
    StepEntry {
        step: Step::SuggestSimilar,
        prompt: prompt_suggest,
        accept: accept_suggest,
    },
];

fn entry(step: Step) -> &'static StepEntry {
    // FLOW is indexed by step code
    let entry = &FLOW[step.code() as usize];
    debug_assert_eq!(entry.step, step);
    entry
}

/// Messages asking for the input `step` expects
pub fn prompt(step: Step, form: &Form) -> Vec<Outbound> {
    (entry(step).prompt)(form)
}

/// Run one transition of the step table without touching the session
pub fn advance(
    step: Step,
    form: &Form,
    input: &Input,
    cities: &CityCatalog,
) -> Result<Transition, Rejection> {
    let mut transition = (entry(step).accept)(form, input, cities)?;

    match transition.next {
        Next::Goto(next) => {
            let mut updated = form.clone();
            transition.update.apply(&mut updated);
            transition.replies.extend(prompt(next, &updated));
        }
        Next::Finish => transition.replies.push(text(messages::FORM_SAVED)),
        Next::Stay => {}
    }
    Ok(transition)
}

/// Why a wizard operation wrote nothing
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    /// Input did not fit the current step; answer with the re-prompt
    #[error("Input rejected")]
    Rejected(Rejection),

    #[error("No flow in progress")]
    Idle,

    #[error("A flow is already in progress")]
    Busy,

    #[error("Session has no form under construction")]
    NoActiveForm,

    #[error("Completed form is invalid: {0}")]
    InvalidForm(#[from] FormError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a transition applied to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub replies: Vec<Outbound>,
    /// Set when the flow reached its terminal step
    pub completed: Option<Form>,
}

/// Start the `start` flow: append a placeholder form and ask for the departure
pub fn begin(session: &mut Session) -> Result<Vec<Outbound>, WizardError> {
    if !session.is_idle() {
        return Err(WizardError::Busy);
    }
    session.command = Command::Start;
    session.step = Step::Departure;
    let id = session.push_empty_form();
    Ok(prompt(Step::Departure, &Form::new(id)))
}

/// Abort the running flow and drop its unfinished form
pub fn cancel(session: &mut Session) -> Result<(), WizardError> {
    if session.is_idle() {
        return Err(WizardError::Idle);
    }
    if session.last_form().is_some_and(|f| !f.is_complete()) {
        session.forms.pop();
    }
    session.reset();
    Ok(())
}

/// Feed one user reply into the session's running flow
pub fn apply_input(
    session: &mut Session,
    input: &Input,
    cities: &CityCatalog,
) -> Result<Applied, WizardError> {
    match session.command {
        Command::None => return Err(WizardError::Idle),
        Command::Start => {}
    }

    let step = session.step;
    let form = session.last_form().ok_or(WizardError::NoActiveForm)?;
    let transition = advance(step, form, input, cities).map_err(WizardError::Rejected)?;

    let form = session.last_form_mut().ok_or(WizardError::NoActiveForm)?;
    transition.update.apply(form);

    let mut completed = None;
    match transition.next {
        Next::Stay => {}
        Next::Goto(next) => session.step = next,
        Next::Finish => {
            form.validate()?;
            completed = Some(form.clone());
            session.reset();
        }
    }

    Ok(Applied {
        replies: transition.replies,
        completed,
    })
}

fn reprompt(step: Step, form: &Form) -> Rejection {
    Rejection {
        replies: prompt(step, form),
    }
}

enum CityPick {
    Picked(String),
    Offer(Vec<Outbound>),
}

/// Shared grammar of the departure and arrival steps
fn pick_city(
    step: Step,
    form: &Form,
    input: &Input,
    cities: &CityCatalog,
    exclude: Option<&str>,
) -> Result<CityPick, Rejection> {
    match input {
        Input::Text(query) => {
            let mut found = cities.search(query);
            // Too many results is judged before the excluded city drops out
            if found.len() > MAX_CITY_CHOICES {
                return Err(Rejection::hint(messages::TOO_MANY_RESULTS));
            }
            found.retain(|c| Some(c.as_str()) != exclude);
            match found.len() {
                0 => Err(Rejection::hint(messages::NOTHING_FOUND)),
                1 => Ok(CityPick::Picked(found[0].clone())),
                _ => Ok(CityPick::Offer(vec![Outbound::choices(
                    messages::results_for(query),
                    messages::city_options(&found),
                )])),
            }
        }
        Input::Choice(token) if cities.contains(token) && Some(token.as_str()) != exclude => {
            Ok(CityPick::Picked(token.clone()))
        }
        _ => Err(reprompt(step, form)),
    }
}

fn yes_no(step: Step, form: &Form, input: &Input) -> Result<bool, Rejection> {
    match input {
        Input::Choice(token) if token == messages::TOKEN_YES => Ok(true),
        Input::Choice(token) if token == messages::TOKEN_NO => Ok(false),
        _ => Err(reprompt(step, form)),
    }
}

fn prompt_departure(_: &Form) -> Vec<Outbound> {
    vec![text(messages::ASK_DEPARTURE)]
}

fn accept_departure(
    form: &Form,
    input: &Input,
    cities: &CityCatalog,
) -> Result<Transition, Rejection> {
    match pick_city(Step::Departure, form, input, cities, None)? {
        CityPick::Offer(replies) => Ok(Transition::stay(replies)),
        CityPick::Picked(city) => Ok(Transition::goto(
            Step::Arrival,
            FormUpdate {
                departure_point: Some(city),
                ..Default::default()
            },
        )),
    }
}

fn prompt_arrival(_: &Form) -> Vec<Outbound> {
    vec![text(messages::ASK_ARRIVAL)]
}

fn accept_arrival(
    form: &Form,
    input: &Input,
    cities: &CityCatalog,
) -> Result<Transition, Rejection> {
    let departure = form.departure_point.as_deref();
    match pick_city(Step::Arrival, form, input, cities, departure)? {
        CityPick::Offer(replies) => Ok(Transition::stay(replies)),
        CityPick::Picked(city) => {
            let route = messages::route_chosen(departure.unwrap_or("?"), &city);
            Ok(Transition::goto(
                Step::DepartureDate,
                FormUpdate {
                    arrival_point: Some(city),
                    ..Default::default()
                },
            )
            .with_reply(text(&route)))
        }
    }
}

fn prompt_date(_: &Form) -> Vec<Outbound> {
    vec![Outbound::date_picker(messages::ASK_DATE)]
}

fn accept_date(form: &Form, input: &Input, _: &CityCatalog) -> Result<Transition, Rejection> {
    match input {
        Input::Date(date) => Ok(Transition::goto(
            Step::CarriageType,
            FormUpdate {
                departure_date: Some(*date),
                ..Default::default()
            },
        )
        .with_reply(text(&messages::date_chosen(*date)))),
        _ => Err(reprompt(Step::DepartureDate, form)),
    }
}

fn prompt_carriage(_: &Form) -> Vec<Outbound> {
    vec![Outbound::choices(messages::ASK_CARRIAGE, messages::carriage_options())]
}

fn accept_carriage(form: &Form, input: &Input, _: &CityCatalog) -> Result<Transition, Rejection> {
    match input {
        Input::Choice(token) => match CarriageType::from_str(token) {
            Some(carriage) => Ok(Transition::goto(
                Step::Passengers,
                FormUpdate {
                    carriage_type: Some(carriage),
                    ..Default::default()
                },
            )),
            None => Err(reprompt(Step::CarriageType, form)),
        },
        _ => Err(reprompt(Step::CarriageType, form)),
    }
}

fn prompt_passengers(_: &Form) -> Vec<Outbound> {
    vec![text(messages::ASK_PASSENGERS)]
}

fn accept_passengers(_: &Form, input: &Input, _: &CityCatalog) -> Result<Transition, Rejection> {
    let count = match input {
        Input::Text(raw) => parse_passenger_count(raw),
        _ => None,
    };
    match count {
        Some(n) => Ok(Transition::goto(
            Step::Compartments,
            FormUpdate {
                passenger_count: Some(n),
                ..Default::default()
            },
        )),
        None => Err(Rejection::hint(messages::PASSENGERS_HINT)),
    }
}

fn prompt_compartments(_: &Form) -> Vec<Outbound> {
    vec![Outbound::choices(
        messages::ASK_COMPARTMENT,
        messages::compartment_options(),
    )]
}

fn accept_compartments(
    form: &Form,
    input: &Input,
    _: &CityCatalog,
) -> Result<Transition, Rejection> {
    let numbers = match input {
        Input::Choice(token) if token == messages::TOKEN_ANY => ANY_COMPARTMENTS.to_vec(),
        Input::Choice(token) if token == messages::TOKEN_NOT_SIDE => NOT_SIDE_COMPARTMENTS.to_vec(),
        Input::Choice(token) if token == messages::TOKEN_CHOOSE => {
            return Ok(Transition::stay(vec![text(messages::ASK_COMPARTMENT_LIST)]));
        }
        Input::Text(raw) => {
            parse_compartments(raw).ok_or_else(|| Rejection::hint(messages::ASK_COMPARTMENT_LIST))?
        }
        _ => return Err(reprompt(Step::Compartments, form)),
    };

    Ok(Transition::goto(
        Step::ShelfType,
        FormUpdate {
            compartment_numbers: Some(numbers),
            ..Default::default()
        },
    ))
}

fn prompt_shelf_type(_: &Form) -> Vec<Outbound> {
    vec![Outbound::choices(messages::ASK_SHELF, messages::shelf_options())]
}

fn accept_shelf_type(form: &Form, input: &Input, _: &CityCatalog) -> Result<Transition, Rejection> {
    let shelf = match input {
        Input::Choice(token) => ShelfType::from_str(token),
        _ => None,
    }
    .ok_or_else(|| reprompt(Step::ShelfType, form))?;

    if shelf == ShelfType::Any {
        return Ok(Transition::goto(
            Step::TrackPrice,
            FormUpdate {
                shelf_type: Some(shelf),
                top_shelf_passengers: Some(0),
                bottom_shelf_passengers: Some(0),
                ..Default::default()
            },
        ));
    }

    Ok(Transition::goto(
        Step::ShelfSplit,
        FormUpdate {
            shelf_type: Some(shelf),
            ..Default::default()
        },
    ))
}

fn prompt_shelf_split(form: &Form) -> Vec<Outbound> {
    vec![text(&messages::ask_berths(
        form.shelf_type,
        form.passenger_count.unwrap_or(0),
    ))]
}

fn accept_shelf_split(
    form: &Form,
    input: &Input,
    _: &CityCatalog,
) -> Result<Transition, Rejection> {
    let passengers = form
        .passenger_count
        .ok_or_else(|| Rejection::hint(messages::SOMETHING_WRONG))?;

    let count = match input {
        Input::Text(raw) => parse_berth_count(raw, passengers),
        _ => None,
    }
    .ok_or_else(|| Rejection::hint(messages::berth_hint(passengers)))?;

    let (bottom, top) = match form.shelf_type {
        Some(ShelfType::ChooseUpper) => (passengers - count, count),
        _ => (count, passengers - count),
    };

    Ok(Transition::goto(
        Step::TrackPrice,
        FormUpdate {
            top_shelf_passengers: Some(top),
            bottom_shelf_passengers: Some(bottom),
            ..Default::default()
        },
    )
    .with_reply(text(&messages::shelf_summary(bottom, top))))
}

fn prompt_track_price(_: &Form) -> Vec<Outbound> {
    vec![Outbound::choices(messages::ASK_TRACK_PRICE, messages::yes_no())]
}

fn accept_track_price(
    form: &Form,
    input: &Input,
    _: &CityCatalog,
) -> Result<Transition, Rejection> {
    let track = yes_no(Step::TrackPrice, form, input)?;
    Ok(Transition::goto(
        Step::SuggestSimilar,
        FormUpdate {
            track_price_change: Some(track),
            ..Default::default()
        },
    ))
}

fn prompt_suggest(_: &Form) -> Vec<Outbound> {
    vec![Outbound::choices(messages::ASK_SUGGEST_SIMILAR, messages::yes_no())]
}

fn accept_suggest(form: &Form, input: &Input, _: &CityCatalog) -> Result<Transition, Rejection> {
    let suggest = yes_no(Step::SuggestSimilar, form, input)?;
    Ok(Transition {
        update: FormUpdate {
            suggest_similar_seats: Some(suggest),
            ..Default::default()
        },
        next: Next::Finish,
        replies: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cities() -> CityCatalog {
        CityCatalog::new([
            ("Moscow", "2000000"),
            ("Kazan", "2060615"),
            ("Kaliningrad", "2058000"),
            ("Kaluga", "2000300"),
        ])
    }

    fn session_at(step: Step, form: Form) -> Session {
        let mut session = Session::new();
        session.command = Command::Start;
        session.step = step;
        session.forms.push(form);
        session
    }

    fn text_input(s: &str) -> Input {
        Input::Text(s.to_string())
    }

    fn choice(s: &str) -> Input {
        Input::Choice(s.to_string())
    }

    #[test]
    fn test_flow_table_is_indexed_by_code() {
        for step in Step::ALL {
            assert_eq!(FLOW[step.code() as usize].step, step);
        }
    }

    #[test]
    fn test_single_match_bypasses_choice() {
        let mut session = session_at(Step::Departure, Form::new(0));
        let applied = apply_input(&mut session, &text_input("mos"), &cities()).unwrap();

        assert_eq!(session.step, Step::Arrival);
        assert_eq!(session.forms[0].departure_point.as_deref(), Some("Moscow"));
        assert_eq!(applied.replies, vec![text(messages::ASK_ARRIVAL)]);
    }

    #[test]
    fn test_several_matches_offer_choices_without_advancing() {
        let mut session = session_at(Step::Departure, Form::new(0));
        let applied = apply_input(&mut session, &text_input("ka"), &cities()).unwrap();

        assert_eq!(session.step, Step::Departure);
        assert_eq!(session.forms[0].departure_point, None);
        match &applied.replies[0] {
            Outbound::Choices { options, .. } => assert_eq!(options.len(), 3),
            other => panic!("expected choices, got {:?}", other),
        }

        apply_input(&mut session, &choice("Kazan"), &cities()).unwrap();
        assert_eq!(session.step, Step::Arrival);
        assert_eq!(session.forms[0].departure_point.as_deref(), Some("Kazan"));
    }

    #[test]
    fn test_no_match_rejects() {
        let mut session = session_at(Step::Departure, Form::new(0));
        let err = apply_input(&mut session, &text_input("zzz"), &cities()).unwrap_err();
        match err {
            WizardError::Rejected(r) => assert_eq!(r.replies, vec![text(messages::NOTHING_FOUND)]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_arrival_excludes_departure() {
        let mut form = Form::new(0);
        form.departure_point = Some("Kazan".into());
        let mut session = session_at(Step::Arrival, form);

        assert!(matches!(
            apply_input(&mut session, &choice("Kazan"), &cities()),
            Err(WizardError::Rejected(_))
        ));

        // "kaz" only matches the departure city itself
        assert!(matches!(
            apply_input(&mut session, &text_input("kaz"), &cities()),
            Err(WizardError::Rejected(_))
        ));

        let applied = apply_input(&mut session, &text_input("mosc"), &cities()).unwrap();
        assert_eq!(session.step, Step::DepartureDate);
        assert_eq!(applied.replies.len(), 2);
        assert!(matches!(applied.replies[1], Outbound::DatePicker { .. }));
    }

    #[test]
    fn test_too_many_counts_departure_city() {
        let catalog = CityCatalog::new([
            ("Kazan", "1"),
            ("Kaliningrad", "2"),
            ("Kaluga", "3"),
            ("Kamensk", "4"),
            ("Kansk", "5"),
            ("Kartaly", "6"),
        ]);
        let mut form = Form::new(0);
        form.departure_point = Some("Kazan".into());
        let mut session = session_at(Step::Arrival, form);

        // six matches, five once the departure drops out
        let err = apply_input(&mut session, &text_input("ka"), &catalog).unwrap_err();
        match err {
            WizardError::Rejected(r) => {
                assert_eq!(r.replies, vec![text(messages::TOO_MANY_RESULTS)])
            }
            other => panic!("unexpected {:?}", other),
        }

        let applied = apply_input(&mut session, &text_input("kal"), &catalog).unwrap();
        assert_eq!(session.step, Step::Arrival);
        match &applied.replies[0] {
            Outbound::Choices { options, .. } => assert_eq!(options.len(), 2),
            other => panic!("expected choices, got {:?}", other),
        }
    }

    #[test]
    fn test_passenger_step_grammar() {
        for n in 1..=6u8 {
            let mut session = session_at(Step::Passengers, Form::new(0));
            apply_input(&mut session, &text_input(&n.to_string()), &cities()).unwrap();
            assert_eq!(session.forms[0].passenger_count, Some(n));
            assert_eq!(session.step, Step::Compartments);
            assert_eq!(session.step.code(), 3);
        }

        for bad in ["0", "7", "abc", "", "-2"] {
            let mut session = session_at(Step::Passengers, Form::new(0));
            let before = session.clone();
            assert!(apply_input(&mut session, &text_input(bad), &cities()).is_err());
            assert_eq!(session, before);
        }
    }

    #[test]
    fn test_stale_choice_is_rejected_on_text_step() {
        let mut session = session_at(Step::Passengers, Form::new(0));
        assert!(matches!(
            apply_input(&mut session, &choice("any"), &cities()),
            Err(WizardError::Rejected(_))
        ));
        assert_eq!(session.step, Step::Passengers);
    }

    #[test]
    fn test_compartment_choose_then_manual_list() {
        let mut session = session_at(Step::Compartments, Form::new(0));
        let applied = apply_input(&mut session, &choice("choose"), &cities()).unwrap();
        assert_eq!(session.step, Step::Compartments);
        assert_eq!(applied.replies, vec![text(messages::ASK_COMPARTMENT_LIST)]);

        assert!(apply_input(&mut session, &text_input("1 1"), &cities()).is_err());
        assert!(apply_input(&mut session, &text_input("0 4"), &cities()).is_err());
        assert_eq!(session.step, Step::Compartments);

        apply_input(&mut session, &text_input("2 4"), &cities()).unwrap();
        assert_eq!(session.forms[0].compartment_numbers, vec![2, 4]);
        assert_eq!(session.step, Step::ShelfType);
    }

    #[test]
    fn test_shelf_any_skips_split() {
        let mut form = Form::new(0);
        form.passenger_count = Some(2);
        let mut session = session_at(Step::ShelfType, form);

        apply_input(&mut session, &choice("any"), &cities()).unwrap();
        assert_eq!(session.step, Step::TrackPrice);
    }

    #[test]
    fn test_shelf_split_upper_fills_remainder() {
        let mut form = Form::new(0);
        form.passenger_count = Some(3);
        let mut session = session_at(Step::ShelfType, form);

        apply_input(&mut session, &choice("choose-upper"), &cities()).unwrap();
        assert_eq!(session.step, Step::ShelfSplit);

        assert!(apply_input(&mut session, &text_input("4"), &cities()).is_err());
        apply_input(&mut session, &text_input("1"), &cities()).unwrap();

        let form = &session.forms[0];
        assert_eq!(form.top_shelf_passengers, 1);
        assert_eq!(form.bottom_shelf_passengers, 2);
        assert_eq!(session.step, Step::TrackPrice);
    }

    #[test]
    fn test_begin_refuses_while_busy() {
        let mut session = Session::new();
        begin(&mut session).unwrap();
        assert_eq!(session.forms.len(), 1);
        assert!(matches!(begin(&mut session), Err(WizardError::Busy)));
        assert_eq!(session.forms.len(), 1);
    }

    #[test]
    fn test_cancel_drops_placeholder() {
        let mut session = Session::new();
        begin(&mut session).unwrap();
        cancel(&mut session).unwrap();
        assert!(session.forms.is_empty());
        assert!(session.is_idle());
        assert!(matches!(cancel(&mut session), Err(WizardError::Idle)));
    }

    #[test]
    fn test_idle_session_rejects_input() {
        let mut session = Session::new();
        assert!(matches!(
            apply_input(&mut session, &text_input("Moscow"), &cities()),
            Err(WizardError::Idle)
        ));
    }
}
