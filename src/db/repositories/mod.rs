//! Repositories over the database handle

pub mod session;
