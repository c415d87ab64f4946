//! Trigger scheduling and execution core.
//!
//! This crate provides:
//!
//! - **Trigger Registry**: creation and lookup of trigger definitions
//! - **Timer Set**: one-shot, in-memory timers for scheduled triggers
//! - **Event Recorder**: the append-only event log written on every firing
//! - **Trigger Service**: the facade the HTTP layer calls into
//!
//! Storage sits behind the [`TriggerStore`] trait; an in-memory
//! implementation is provided in [`memory`].

pub mod error;
pub mod memory;
pub mod recorder;
pub mod registry;
pub mod service;
pub mod store;
pub mod timer;
pub mod trigger;

pub use error::{ScheduleError, SchedulerError, TriggerError};
pub use memory::InMemoryTriggerStore;
pub use recorder::{CompletionOutcome, EventRecorder};
pub use registry::TriggerRegistry;
pub use service::{HealthStatus, TriggerService};
pub use store::TriggerStore;
pub use timer::{FireHandler, TimerSet};
pub use trigger::{EventLog, EventStatus, NewTrigger, Trigger, TriggerKind};
