//! Trigger service: the request-facing entry points.
//!
//! Composes the registry, the recorder and the timer set over one injected
//! store. Scheduled triggers are armed only after they are persisted; API
//! triggers bypass the timer set entirely.

use crate::error::{ScheduleError, SchedulerError, TriggerError};
use crate::recorder::EventRecorder;
use crate::registry::TriggerRegistry;
use crate::store::TriggerStore;
use crate::timer::{FireHandler, TimerSet};
use crate::trigger::{EventLog, NewTrigger, Trigger};
use chrono::{DateTime, Utc};
use chime_core::TriggerId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a successful health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: String,
    /// Store reachability.
    pub database: String,
    /// When the check ran.
    pub timestamp: DateTime<Utc>,
}

/// Entry points for creating, firing and listing triggers.
pub struct TriggerService {
    store: Arc<dyn TriggerStore>,
    registry: TriggerRegistry,
    recorder: Arc<EventRecorder>,
    timers: TimerSet,
}

impl TriggerService {
    /// Creates a service over the given store with an empty timer set.
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        Self {
            registry: TriggerRegistry::new(store.clone()),
            recorder: Arc::new(EventRecorder::new(store.clone())),
            timers: TimerSet::new(),
            store,
        }
    }

    /// Returns the timer set.
    #[must_use]
    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    fn arm(&self, trigger_id: TriggerId, fire_at: DateTime<Utc>) -> Result<(), ScheduleError> {
        let handler: Arc<dyn FireHandler> = self.recorder.clone();
        self.timers.arm(trigger_id, fire_at, handler)
    }

    /// Persists a trigger and, for a scheduled trigger with a fire time,
    /// arms its timer.
    ///
    /// A trigger that was saved but could not be armed is reported as
    /// [`SchedulerError::NotScheduled`]; the stored record is left in place.
    pub async fn create_trigger(&self, input: NewTrigger) -> Result<Trigger, SchedulerError> {
        let trigger = self.registry.create(input).await?;

        if let Some(fire_at) = trigger.arm_at() {
            self.arm(trigger.id, fire_at)
                .map_err(|source| SchedulerError::NotScheduled {
                    trigger_id: trigger.id,
                    source,
                })?;
            info!(trigger_id = %trigger.id, %fire_at, "scheduled trigger");
        }

        Ok(trigger)
    }

    /// Creates an API trigger and records its firing immediately.
    pub async fn create_api_trigger(
        &self,
        name: String,
        payload: Option<JsonValue>,
    ) -> Result<(Trigger, EventLog), SchedulerError> {
        Ok(self.recorder.record_immediate(name, payload).await?)
    }

    /// Lists every trigger.
    pub async fn list_triggers(&self) -> Result<Vec<Trigger>, SchedulerError> {
        Ok(self.registry.list().await?)
    }

    /// Lists every event log.
    pub async fn list_logs(&self) -> Result<Vec<EventLog>, SchedulerError> {
        Ok(self.store.list_event_logs().await?)
    }

    /// Checks that the store answers a round trip.
    pub async fn health_check(&self) -> Result<HealthStatus, TriggerError> {
        self.store.ping().await?;
        Ok(HealthStatus {
            status: "healthy".to_string(),
            database: "connected".to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Re-arms stored scheduled triggers that have not fired yet.
    ///
    /// Meant to run once at startup, since timers do not survive a restart.
    /// Returns the number of timers armed.
    pub async fn reconcile(&self) -> Result<usize, SchedulerError> {
        let pending = self.store.list_unfired_scheduled().await?;

        let mut armed = 0;
        for trigger in pending {
            let Some(fire_at) = trigger.arm_at() else {
                continue;
            };
            match self.arm(trigger.id, fire_at) {
                Ok(()) => armed += 1,
                Err(ScheduleError::AlreadyArmed { trigger_id }) => {
                    warn!(%trigger_id, "trigger already armed, skipping");
                }
                Err(source) => {
                    return Err(SchedulerError::NotScheduled {
                        trigger_id: trigger.id,
                        source,
                    });
                }
            }
        }

        info!(armed, "reconciled scheduled triggers");
        Ok(armed)
    }

    /// Aborts pending timers; later scheduled creations are saved but not
    /// armed.
    pub fn shutdown(&self) -> usize {
        self.timers.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTriggerStore;
    use crate::trigger::{EventStatus, TriggerKind};
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;

    fn service() -> (TriggerService, Arc<InMemoryTriggerStore>) {
        let store = Arc::new(InMemoryTriggerStore::new());
        (TriggerService::new(store.clone()), store)
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_trigger_logs_completion_after_fire_time() {
        let (service, _) = service();
        let fire_at = Utc::now() + ChronoDuration::seconds(2);

        let trigger = service
            .create_trigger(NewTrigger::scheduled("later", Some(fire_at)))
            .await
            .unwrap();
        assert!(service.timers().is_armed(trigger.id));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(service.list_logs().await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let logs = service.list_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].trigger_id, trigger.id);
        assert_eq!(logs[0].status, EventStatus::Completed);
        assert_eq!(logs[0].name, "later");
    }

    #[tokio::test(start_paused = true)]
    async fn past_scheduled_trigger_fires_promptly() {
        let (service, _) = service();
        let fire_at = Utc::now() - ChronoDuration::minutes(10);

        service
            .create_trigger(NewTrigger::scheduled("overdue", Some(fire_at)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(service.list_logs().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_trigger_without_time_never_fires() {
        let (service, _) = service();

        let trigger = service
            .create_trigger(NewTrigger::scheduled("someday", None))
            .await
            .unwrap();

        assert!(!service.timers().is_armed(trigger.id));
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(service.list_logs().await.unwrap().is_empty());
        assert_eq!(service.list_triggers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn api_trigger_is_logged_immediately() {
        let (service, _) = service();

        let (trigger, log) = service
            .create_api_trigger("ping".to_string(), Some(json!({"x": 1})))
            .await
            .unwrap();

        assert_eq!(service.timers().armed_count(), 0);
        assert_eq!(service.list_triggers().await.unwrap(), vec![trigger]);
        let logs = service.list_logs().await.unwrap();
        assert_eq!(logs, vec![log]);
        assert_eq!(logs[0].status, EventStatus::Active);
        assert_eq!(logs[0].payload, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn api_kind_through_create_is_stored_without_firing() {
        let (service, _) = service();

        let trigger = service
            .create_trigger(NewTrigger::api("stored-only"))
            .await
            .unwrap();

        assert_eq!(trigger.kind, TriggerKind::Api);
        assert!(service.list_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_not_a_scheduling_failure() {
        let (service, store) = service();
        store.set_unavailable(true);

        let err = service
            .create_trigger(NewTrigger::scheduled("later", Some(Utc::now())))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SchedulerError::Trigger(TriggerError::StorageFailed { .. })
        ));
        assert_eq!(service.timers().armed_count(), 0);
    }

    #[tokio::test]
    async fn arming_after_shutdown_reports_saved_but_not_scheduled() {
        let (service, store) = service();
        service.shutdown();

        let err = service
            .create_trigger(NewTrigger::scheduled(
                "late",
                Some(Utc::now() + ChronoDuration::seconds(5)),
            ))
            .await
            .unwrap_err();

        let SchedulerError::NotScheduled { trigger_id, source } = err else {
            panic!("expected NotScheduled");
        };
        assert_eq!(source, ScheduleError::ShutDown);
        assert!(store.get_trigger(trigger_id).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_rearms_unfired_scheduled_triggers() {
        let store = Arc::new(InMemoryTriggerStore::new());
        let fire_at = Utc::now() + ChronoDuration::seconds(5);

        // Created by a previous process whose timers are gone.
        let earlier = TriggerService::new(store.clone());
        let pending = earlier
            .create_trigger(NewTrigger::scheduled("pending", Some(fire_at)))
            .await
            .unwrap();
        earlier.shutdown();

        let service = TriggerService::new(store.clone());
        assert_eq!(service.reconcile().await.unwrap(), 1);
        assert!(service.timers().is_armed(pending.id));

        tokio::time::sleep(Duration::from_secs(6)).await;
        let logs = service.list_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].trigger_id, pending.id);

        // Already fired: nothing left to re-arm.
        assert_eq!(service.reconcile().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn health_check_reports_unreachable_store() {
        let (service, store) = service();

        let status = service.health_check().await.unwrap();
        assert_eq!(status.status, "healthy");
        assert_eq!(status.database, "connected");

        store.set_unavailable(true);
        assert!(service.health_check().await.is_err());
    }

    #[tokio::test]
    async fn lists_reflect_all_prior_writes() {
        let (service, _) = service();
        for i in 0..5 {
            service
                .create_api_trigger(format!("t{i}"), None)
                .await
                .unwrap();
            service
                .create_trigger(NewTrigger::scheduled(format!("s{i}"), None))
                .await
                .unwrap();
        }

        assert_eq!(service.list_triggers().await.unwrap().len(), 10);
        assert_eq!(service.list_logs().await.unwrap().len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers_never_see_api_trigger_without_log() {
        const WRITERS: usize = 32;
        let (service, _) = service();
        let service = Arc::new(service);

        let writers: Vec<_> = (0..WRITERS)
            .map(|i| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .create_api_trigger(format!("t{i}"), Some(json!({"n": i})))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    for _ in 0..50 {
                        // Triggers first: a log written after this snapshot
                        // still shows up in the later one.
                        let triggers = service.list_triggers().await.unwrap();
                        let logs = service.list_logs().await.unwrap();
                        let logged: HashSet<TriggerId> =
                            logs.iter().map(|log| log.trigger_id).collect();
                        for trigger in &triggers {
                            assert!(
                                logged.contains(&trigger.id),
                                "trigger {} listed without its log",
                                trigger.id
                            );
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        let mut created = HashSet::new();
        for writer in writers {
            let (trigger, log) = writer.await.unwrap();
            assert_eq!(log.trigger_id, trigger.id);
            created.insert(trigger.id);
        }
        for reader in readers {
            reader.await.unwrap();
        }

        let triggers = service.list_triggers().await.unwrap();
        let logs = service.list_logs().await.unwrap();
        assert_eq!(created.len(), WRITERS);
        assert_eq!(triggers.len(), WRITERS);
        assert_eq!(logs.len(), WRITERS);
        assert!(triggers.iter().all(|trigger| created.contains(&trigger.id)));
    }
}
