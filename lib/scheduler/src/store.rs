//! Persistence interface for triggers and event logs.

use crate::error::TriggerError;
use crate::trigger::{EventLog, Trigger};
use async_trait::async_trait;
use chime_core::TriggerId;

/// Durable storage for triggers and event logs.
///
/// Implementations acquire a connection for the duration of each call and
/// release it on every exit path. Callers must not hold in-process locks
/// across these calls.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Persists a new trigger.
    async fn insert_trigger(&self, trigger: &Trigger) -> Result<(), TriggerError>;

    /// Looks up a trigger by ID.
    async fn get_trigger(&self, id: TriggerId) -> Result<Option<Trigger>, TriggerError>;

    /// Returns every stored trigger. Order is unspecified.
    async fn list_triggers(&self) -> Result<Vec<Trigger>, TriggerError>;

    /// Persists a new event log.
    async fn insert_event_log(&self, log: &EventLog) -> Result<(), TriggerError>;

    /// Persists a trigger and its event log together.
    ///
    /// Neither record may become visible unless both are written.
    async fn insert_trigger_with_event(
        &self,
        trigger: &Trigger,
        log: &EventLog,
    ) -> Result<(), TriggerError>;

    /// Returns every stored event log. Order is unspecified.
    async fn list_event_logs(&self) -> Result<Vec<EventLog>, TriggerError>;

    /// Returns scheduled triggers with a fire time and no completed event log.
    async fn list_unfired_scheduled(&self) -> Result<Vec<Trigger>, TriggerError>;

    /// Issues a trivial round trip to check reachability.
    async fn ping(&self) -> Result<(), TriggerError>;
}
