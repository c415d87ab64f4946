//! Trigger and event log records.
//!
//! Both records are append-only: a trigger is written once at creation and
//! never mutated, and an event log is written once per firing.

use chrono::{DateTime, NaiveDateTime, Utc};
use chime_core::{EventLogId, TriggerId};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// How a trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Fires once at `fire_at` via the timer set.
    Scheduled,
    /// Fires immediately when created through the API path.
    Api,
}

impl TriggerKind {
    /// Returns the persisted string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "api" => Ok(Self::Api),
            other => Err(format!("unknown trigger kind '{other}'")),
        }
    }
}

/// Outcome recorded on an event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Logged synchronously by an API trigger.
    Active,
    /// Logged when a scheduled trigger's timer fired.
    Completed,
    /// Retained for historical records; never written by the service itself.
    Archived,
}

impl EventStatus {
    /// Returns the persisted string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown event status '{other}'")),
        }
    }
}

/// Input for creating a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrigger {
    /// Human-readable label.
    pub name: String,
    /// How the trigger fires.
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    /// When a scheduled trigger should fire.
    #[serde(
        rename = "one_time_datetime",
        default,
        deserialize_with = "deserialize_fire_time"
    )]
    pub fire_at: Option<DateTime<Utc>>,
    /// Opaque document passed through to event logs.
    #[serde(default)]
    pub payload: Option<JsonValue>,
}

/// Parses a fire time, reading a timestamp without an offset as UTC.
fn parse_fire_time(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::from_str(raw).map(|at| at.and_utc()))
}

fn deserialize_fire_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_fire_time(&raw)
        .map(Some)
        .map_err(|e| de::Error::custom(format!("invalid one_time_datetime '{raw}': {e}")))
}

impl NewTrigger {
    /// Creates a scheduled trigger input.
    #[must_use]
    pub fn scheduled(name: impl Into<String>, fire_at: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            kind: TriggerKind::Scheduled,
            fire_at,
            payload: None,
        }
    }

    /// Creates an API trigger input.
    #[must_use]
    pub fn api(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TriggerKind::Api,
            fire_at: None,
            payload: None,
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// A stored trigger definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Unique identifier.
    pub id: TriggerId,
    /// Human-readable label.
    pub name: String,
    /// How the trigger fires.
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    /// When a scheduled trigger should fire.
    #[serde(rename = "one_time_datetime")]
    pub fire_at: Option<DateTime<Utc>>,
    /// Opaque document passed through to event logs.
    pub payload: Option<JsonValue>,
    /// When the trigger was created.
    pub created_at: DateTime<Utc>,
}

impl Trigger {
    /// Creates a trigger with a fresh ID, stamped with the current time.
    #[must_use]
    pub fn new(input: NewTrigger) -> Self {
        Self {
            id: TriggerId::new(),
            name: input.name,
            kind: input.kind,
            fire_at: input.fire_at,
            payload: input.payload,
            created_at: Utc::now(),
        }
    }

    /// Returns the time a timer should be armed for, if any.
    ///
    /// A scheduled trigger without `fire_at` is stored but never armed.
    #[must_use]
    pub fn arm_at(&self) -> Option<DateTime<Utc>> {
        match self.kind {
            TriggerKind::Scheduled => self.fire_at,
            TriggerKind::Api => None,
        }
    }
}

/// An immutable record of one firing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    /// Unique identifier.
    pub id: EventLogId,
    /// The trigger that fired.
    pub trigger_id: TriggerId,
    /// Trigger name at fire time.
    pub name: String,
    /// Trigger kind at fire time.
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    /// When the firing happened.
    pub executed_at: DateTime<Utc>,
    /// Snapshot of the trigger payload.
    pub payload: Option<JsonValue>,
    /// Outcome of the firing.
    pub status: EventStatus,
}

impl EventLog {
    /// Creates an event log for a firing of `trigger`, executed now.
    #[must_use]
    pub fn for_trigger(trigger: &Trigger, status: EventStatus) -> Self {
        Self {
            id: EventLogId::new(),
            trigger_id: trigger.id,
            name: trigger.name.clone(),
            kind: trigger.kind,
            executed_at: Utc::now(),
            payload: trigger.payload.clone(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn scheduled_trigger_arms_at_fire_time() {
        let fire_at = Utc::now() + Duration::seconds(30);
        let trigger = Trigger::new(NewTrigger::scheduled("later", Some(fire_at)));

        assert_eq!(trigger.kind, TriggerKind::Scheduled);
        assert_eq!(trigger.arm_at(), Some(fire_at));
    }

    #[test]
    fn scheduled_trigger_without_time_never_arms() {
        let trigger = Trigger::new(NewTrigger::scheduled("orphan", None));
        assert_eq!(trigger.arm_at(), None);
    }

    #[test]
    fn api_trigger_ignores_fire_time() {
        let mut input = NewTrigger::api("ping");
        input.fire_at = Some(Utc::now());

        let trigger = Trigger::new(input);
        assert_eq!(trigger.arm_at(), None);
    }

    #[test]
    fn event_log_copies_trigger_fields() {
        let trigger = Trigger::new(NewTrigger::api("ping").with_payload(json!({"x": 1})));
        let log = EventLog::for_trigger(&trigger, EventStatus::Active);

        assert_eq!(log.trigger_id, trigger.id);
        assert_eq!(log.name, "ping");
        assert_eq!(log.kind, TriggerKind::Api);
        assert_eq!(log.payload, Some(json!({"x": 1})));
        assert_eq!(log.status, EventStatus::Active);
    }

    #[test]
    fn kind_and_status_parse_their_persisted_form() {
        for kind in [TriggerKind::Scheduled, TriggerKind::Api] {
            assert_eq!(kind.as_str().parse::<TriggerKind>(), Ok(kind));
        }
        for status in [
            EventStatus::Active,
            EventStatus::Completed,
            EventStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<EventStatus>(), Ok(status));
        }
        assert!("cron".parse::<TriggerKind>().is_err());
    }

    #[test]
    fn trigger_uses_wire_field_names() {
        let fire_at = Utc::now();
        let trigger = Trigger::new(NewTrigger::scheduled("later", Some(fire_at)));
        let value = serde_json::to_value(&trigger).expect("serialize");

        assert_eq!(value["type"], "scheduled");
        assert!(value.get("one_time_datetime").is_some());
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn new_trigger_accepts_minimal_body() {
        let input: NewTrigger =
            serde_json::from_value(json!({"name": "ping", "type": "api"})).expect("deserialize");

        assert_eq!(input.kind, TriggerKind::Api);
        assert_eq!(input.fire_at, None);
        assert_eq!(input.payload, None);
    }

    #[test]
    fn fire_time_accepts_offset_and_naive_forms() {
        let expected = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);

        for raw in [
            "2025-03-01T10:00:00Z",
            "2025-03-01T12:00:00+02:00",
            "2025-03-01T10:00:00",
        ] {
            let input: NewTrigger = serde_json::from_value(json!({
                "name": "later",
                "type": "scheduled",
                "one_time_datetime": raw,
            }))
            .expect("deserialize");
            assert_eq!(input.fire_at, Some(expected), "{raw}");
        }
    }

    #[test]
    fn fire_time_keeps_fractional_seconds_and_null() {
        let at = parse_fire_time("2025-03-01T10:00:00.250").expect("naive with fraction");
        assert_eq!(at.timestamp_subsec_millis(), 250);

        let input: NewTrigger = serde_json::from_value(json!({
            "name": "someday",
            "type": "scheduled",
            "one_time_datetime": null,
        }))
        .expect("deserialize");
        assert_eq!(input.fire_at, None);
    }

    #[test]
    fn fire_time_rejects_garbage() {
        let result = serde_json::from_value::<NewTrigger>(json!({
            "name": "later",
            "type": "scheduled",
            "one_time_datetime": "next tuesday",
        }));
        assert!(result.is_err());
    }
}
