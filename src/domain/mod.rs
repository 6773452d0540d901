//! Domain layer for Bisector
//!
//! This module contains the bisection data model, errors, and the ports the
//! orchestration engine is written against.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
