//! Error types for the scheduler crate.
//!
//! - `TriggerError`: registry, recorder and storage failures
//! - `ScheduleError`: failures arming a timer
//! - `SchedulerError`: what the service facade returns, keeping "not saved"
//!   apart from "saved but not scheduled"

use chime_core::TriggerId;
use std::fmt;

/// Errors from trigger and event log operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// Trigger not found.
    NotFound { id: TriggerId },
    /// A record with this ID already exists.
    AlreadyExists { id: String },
    /// Storage operation failed.
    StorageFailed { reason: String },
    /// Input rejected before any write.
    Validation { reason: String },
}

impl fmt::Display for TriggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "trigger not found: {id}"),
            Self::AlreadyExists { id } => write!(f, "record already exists: {id}"),
            Self::StorageFailed { reason } => write!(f, "storage failed: {reason}"),
            Self::Validation { reason } => write!(f, "invalid trigger: {reason}"),
        }
    }
}

impl std::error::Error for TriggerError {}

/// Errors from arming a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A timer is already armed for this trigger.
    AlreadyArmed { trigger_id: TriggerId },
    /// The timer set has been shut down.
    ShutDown,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyArmed { trigger_id } => {
                write!(f, "timer already armed for {trigger_id}")
            }
            Self::ShutDown => write!(f, "scheduler is shut down"),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Errors returned by the trigger service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The trigger operation itself failed; nothing was scheduled.
    Trigger(TriggerError),
    /// The trigger was saved but its timer could not be armed.
    NotScheduled {
        trigger_id: TriggerId,
        source: ScheduleError,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger(err) => err.fmt(f),
            Self::NotScheduled { trigger_id, source } => {
                write!(f, "trigger {trigger_id} saved but not scheduled: {source}")
            }
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Trigger(err) => Some(err),
            Self::NotScheduled { source, .. } => Some(source),
        }
    }
}

impl From<TriggerError> for SchedulerError {
    fn from(err: TriggerError) -> Self {
        Self::Trigger(err)
    }
}
