//! In-memory `TriggerStore` for tests and local experiments.

use crate::error::TriggerError;
use crate::store::TriggerStore;
use crate::trigger::{EventLog, EventStatus, Trigger, TriggerKind};
use async_trait::async_trait;
use chime_core::TriggerId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Tables {
    triggers: Vec<Trigger>,
    event_logs: Vec<EventLog>,
}

/// A `TriggerStore` backed by process memory.
///
/// Writes are applied under a single lock, so a trigger and its event log
/// written together are never observed apart. The store can be flipped to
/// unavailable to exercise storage failure paths.
#[derive(Default)]
pub struct InMemoryTriggerStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryTriggerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, TriggerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TriggerError::StorageFailed {
                reason: "store unavailable".to_string(),
            });
        }
        Ok(self.tables.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn ensure_trigger_absent(tables: &Tables, trigger: &Trigger) -> Result<(), TriggerError> {
    if tables.triggers.iter().any(|t| t.id == trigger.id) {
        return Err(TriggerError::AlreadyExists {
            id: trigger.id.to_string(),
        });
    }
    Ok(())
}

fn ensure_log_absent(tables: &Tables, log: &EventLog) -> Result<(), TriggerError> {
    if tables.event_logs.iter().any(|l| l.id == log.id) {
        return Err(TriggerError::AlreadyExists {
            id: log.id.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl TriggerStore for InMemoryTriggerStore {
    async fn insert_trigger(&self, trigger: &Trigger) -> Result<(), TriggerError> {
        let mut tables = self.tables()?;
        ensure_trigger_absent(&tables, trigger)?;
        tables.triggers.push(trigger.clone());
        Ok(())
    }

    async fn get_trigger(&self, id: TriggerId) -> Result<Option<Trigger>, TriggerError> {
        let tables = self.tables()?;
        Ok(tables.triggers.iter().find(|t| t.id == id).cloned())
    }

    async fn list_triggers(&self) -> Result<Vec<Trigger>, TriggerError> {
        Ok(self.tables()?.triggers.clone())
    }

    async fn insert_event_log(&self, log: &EventLog) -> Result<(), TriggerError> {
        let mut tables = self.tables()?;
        ensure_log_absent(&tables, log)?;
        tables.event_logs.push(log.clone());
        Ok(())
    }

    async fn insert_trigger_with_event(
        &self,
        trigger: &Trigger,
        log: &EventLog,
    ) -> Result<(), TriggerError> {
        let mut tables = self.tables()?;
        ensure_trigger_absent(&tables, trigger)?;
        ensure_log_absent(&tables, log)?;
        tables.triggers.push(trigger.clone());
        tables.event_logs.push(log.clone());
        Ok(())
    }

    async fn list_event_logs(&self) -> Result<Vec<EventLog>, TriggerError> {
        Ok(self.tables()?.event_logs.clone())
    }

    async fn list_unfired_scheduled(&self) -> Result<Vec<Trigger>, TriggerError> {
        let tables = self.tables()?;
        let unfired = tables
            .triggers
            .iter()
            .filter(|t| t.kind == TriggerKind::Scheduled && t.fire_at.is_some())
            .filter(|t| {
                !tables
                    .event_logs
                    .iter()
                    .any(|l| l.trigger_id == t.id && l.status == EventStatus::Completed)
            })
            .cloned()
            .collect();
        Ok(unfired)
    }

    async fn ping(&self) -> Result<(), TriggerError> {
        self.tables().map(|_| ())
    }
}
