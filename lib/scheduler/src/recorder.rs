//! Event recorder: appends one event log per firing.

use crate::error::TriggerError;
use crate::registry::validate;
use crate::store::TriggerStore;
use crate::timer::FireHandler;
use crate::trigger::{EventLog, EventStatus, NewTrigger, Trigger, TriggerKind};
use async_trait::async_trait;
use chime_core::TriggerId;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

/// Result of recording a scheduled firing.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// An event log was written.
    Recorded(EventLog),
    /// The trigger no longer exists; nothing was written.
    TriggerMissing,
}

/// Writes event logs for scheduled and immediate firings.
pub struct EventRecorder {
    store: Arc<dyn TriggerStore>,
    missing_triggers: AtomicU64,
}

impl EventRecorder {
    /// Creates a recorder over the given store.
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        Self {
            store,
            missing_triggers: AtomicU64::new(0),
        }
    }

    /// Records the completion of a scheduled trigger.
    ///
    /// A trigger that cannot be found is not an error: the firing is
    /// dropped and counted in [`Self::missing_trigger_count`].
    pub async fn record_completion(
        &self,
        trigger_id: TriggerId,
    ) -> Result<CompletionOutcome, TriggerError> {
        let Some(trigger) = self.store.get_trigger(trigger_id).await? else {
            self.missing_triggers.fetch_add(1, Ordering::Relaxed);
            warn!(%trigger_id, "fired trigger no longer exists, no event recorded");
            return Ok(CompletionOutcome::TriggerMissing);
        };

        let log = EventLog::for_trigger(&trigger, EventStatus::Completed);
        self.store.insert_event_log(&log).await?;

        info!(
            %trigger_id,
            event_id = %log.id,
            name = %trigger.name,
            "recorded completed event"
        );
        Ok(CompletionOutcome::Recorded(log))
    }

    /// Creates an API trigger and its `active` event log in one unit.
    pub async fn record_immediate(
        &self,
        name: String,
        payload: Option<JsonValue>,
    ) -> Result<(Trigger, EventLog), TriggerError> {
        let input = NewTrigger {
            name,
            kind: TriggerKind::Api,
            fire_at: None,
            payload,
        };
        validate(&input)?;

        let trigger = Trigger::new(input);
        let log = EventLog::for_trigger(&trigger, EventStatus::Active);
        self.store.insert_trigger_with_event(&trigger, &log).await?;

        info!(
            trigger_id = %trigger.id,
            event_id = %log.id,
            "executed api trigger"
        );
        Ok((trigger, log))
    }

    /// Number of firings dropped because their trigger was missing.
    #[must_use]
    pub fn missing_trigger_count(&self) -> u64 {
        self.missing_triggers.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FireHandler for EventRecorder {
    async fn fire(&self, trigger_id: TriggerId) {
        if let Err(e) = self.record_completion(trigger_id).await {
            error!(%trigger_id, error = %e, "failed to record completed event");
        }
    }
}
