//! Database-backed storage for the chime server.
//!
//! This module provides the PostgreSQL implementation of
//! [`TriggerStore`](chime_scheduler::TriggerStore).

pub mod trigger;

pub use trigger::PgTriggerStore;
