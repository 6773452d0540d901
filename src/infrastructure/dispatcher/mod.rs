//! Downstream build dispatch

pub mod command;

pub use command::{outcome_from_status, CommandDispatcher};
