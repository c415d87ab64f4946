//! Trigger registry: create and read trigger definitions.

use crate::error::TriggerError;
use crate::store::TriggerStore;
use crate::trigger::{NewTrigger, Trigger};
use chime_core::TriggerId;
use std::sync::Arc;
use tracing::{debug, info};

/// Rejects a trigger input before anything is written.
///
/// Only the name is checked; the kind is enforced by its type, and a
/// scheduled trigger without a fire time is accepted.
pub fn validate(input: &NewTrigger) -> Result<(), TriggerError> {
    if input.name.trim().is_empty() {
        return Err(TriggerError::Validation {
            reason: "name must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Create/read operations over stored triggers.
#[derive(Clone)]
pub struct TriggerRegistry {
    store: Arc<dyn TriggerStore>,
}

impl TriggerRegistry {
    /// Creates a registry over the given store.
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        Self { store }
    }

    /// Validates and persists a new trigger with a fresh ID.
    pub async fn create(&self, input: NewTrigger) -> Result<Trigger, TriggerError> {
        validate(&input)?;

        let trigger = Trigger::new(input);
        self.store.insert_trigger(&trigger).await?;

        info!(
            trigger_id = %trigger.id,
            kind = %trigger.kind,
            fire_at = ?trigger.fire_at,
            "created trigger"
        );
        Ok(trigger)
    }

    /// Looks up a trigger by ID.
    pub async fn get(&self, id: TriggerId) -> Result<Trigger, TriggerError> {
        self.store
            .get_trigger(id)
            .await?
            .ok_or(TriggerError::NotFound { id })
    }

    /// Lists every trigger.
    pub async fn list(&self) -> Result<Vec<Trigger>, TriggerError> {
        let triggers = self.store.list_triggers().await?;
        debug!(count = triggers.len(), "listed triggers");
        Ok(triggers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTriggerStore;
    use crate::trigger::TriggerKind;
    use serde_json::json;

    fn registry() -> (TriggerRegistry, Arc<InMemoryTriggerStore>) {
        let store = Arc::new(InMemoryTriggerStore::new());
        (TriggerRegistry::new(store.clone()), store)
    }

    #[tokio::test]
    async fn create_persists_and_returns_trigger() {
        let (registry, store) = registry();

        let trigger = registry
            .create(NewTrigger::api("ping").with_payload(json!({"x": 1})))
            .await
            .unwrap();

        let stored = store.get_trigger(trigger.id).await.unwrap();
        assert_eq!(stored, Some(trigger.clone()));
        assert_eq!(registry.get(trigger.id).await.unwrap(), trigger);
    }

    #[tokio::test]
    async fn create_rejects_blank_name_before_writing() {
        let (registry, store) = registry();

        let err = registry.create(NewTrigger::api("   ")).await.unwrap_err();

        assert!(matches!(err, TriggerError::Validation { .. }));
        assert!(store.list_triggers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_accepts_scheduled_without_time() {
        let (registry, _) = registry();

        let trigger = registry
            .create(NewTrigger::scheduled("someday", None))
            .await
            .unwrap();

        assert_eq!(trigger.kind, TriggerKind::Scheduled);
        assert_eq!(trigger.fire_at, None);
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let (registry, _) = registry();
        let id = TriggerId::new();

        let err = registry.get(id).await.unwrap_err();
        assert_eq!(err, TriggerError::NotFound { id });
    }

    #[tokio::test]
    async fn create_surfaces_storage_failure() {
        let (registry, store) = registry();
        store.set_unavailable(true);

        let err = registry.create(NewTrigger::api("ping")).await.unwrap_err();
        assert!(matches!(err, TriggerError::StorageFailed { .. }));
    }

    #[tokio::test]
    async fn list_returns_all_created() {
        let (registry, _) = registry();
        for name in ["a", "b", "c"] {
            registry.create(NewTrigger::api(name)).await.unwrap();
        }

        assert_eq!(registry.list().await.unwrap().len(), 3);
    }
}
