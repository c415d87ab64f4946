//! Core types shared by the chime trigger service.
//!
//! This crate provides the strongly-typed identifiers for triggers and
//! event logs, plus the `Result` alias used where errors are composed
//! with rootcause.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{EventLogId, ParseIdError, TriggerId};
