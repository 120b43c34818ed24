//! Session aggregate: wizard position plus every ticket search form

pub mod model;
pub mod update;

pub use model::{
    compartments_valid, CarriageType, Command, ConversationId, Form, FormError, FormState,
    Session, ShelfType, PRICE_NOT_FOUND,
};
pub use update::{FormUpdate, SessionUpdate};
