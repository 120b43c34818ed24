//! Conversational wizard that fills in a ticket search form step by step

pub mod cities;
pub mod machine;
pub mod messages;
pub mod parse;
pub mod step;

pub use cities::CityCatalog;
pub use machine::{
    advance, apply_input, begin, cancel, prompt, Applied, Input, Next, Rejection, Transition,
    WizardError,
};
pub use parse::{format_compartments, parse_compartments, parse_passenger_count};
pub use step::Step;
