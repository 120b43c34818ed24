//! Trainwatch - conversational train ticket search with price monitoring

pub mod bot;
pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod monitor;
pub mod session;
pub mod transport;
pub mod wizard;
