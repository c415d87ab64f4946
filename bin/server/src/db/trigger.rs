//! PostgreSQL storage for triggers and event logs.

use async_trait::async_trait;
use chime_core::{EventLogId, TriggerId};
use chime_scheduler::{EventLog, EventStatus, Trigger, TriggerError, TriggerKind, TriggerStore};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::{FromRow, PgPool};
use std::fmt::Display;
use std::str::FromStr;
use tracing::instrument;

fn decode_error(what: &str, value: &str, reason: impl Display) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid {what} '{value}': {reason}"),
    )))
}

/// Maps a driver error, treating unique violations as duplicate `id`.
fn storage_error(err: sqlx::Error, id: impl Display) -> TriggerError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return TriggerError::AlreadyExists { id: id.to_string() };
        }
    }
    TriggerError::StorageFailed {
        reason: err.to_string(),
    }
}

fn read_error(err: sqlx::Error) -> TriggerError {
    TriggerError::StorageFailed {
        reason: err.to_string(),
    }
}

/// Row type for trigger queries.
#[derive(FromRow)]
struct TriggerRow {
    id: String,
    name: String,
    kind: String,
    fire_at: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TriggerRow {
    fn try_into_trigger(self) -> Result<Trigger, sqlx::Error> {
        let id = TriggerId::from_str(&self.id)
            .map_err(|e| decode_error("trigger id", &self.id, e))?;
        let kind = TriggerKind::from_str(&self.kind)
            .map_err(|e| decode_error("trigger kind", &self.kind, e))?;

        Ok(Trigger {
            id,
            name: self.name,
            kind,
            fire_at: self.fire_at,
            payload: self.payload,
            created_at: self.created_at,
        })
    }
}

/// Row type for event log queries.
#[derive(FromRow)]
struct EventLogRow {
    id: String,
    trigger_id: String,
    name: String,
    kind: String,
    executed_at: DateTime<Utc>,
    payload: Option<serde_json::Value>,
    status: String,
}

impl EventLogRow {
    fn try_into_event_log(self) -> Result<EventLog, sqlx::Error> {
        let id = EventLogId::from_str(&self.id)
            .map_err(|e| decode_error("event log id", &self.id, e))?;
        let trigger_id = TriggerId::from_str(&self.trigger_id)
            .map_err(|e| decode_error("trigger id", &self.trigger_id, e))?;
        let kind = TriggerKind::from_str(&self.kind)
            .map_err(|e| decode_error("trigger kind", &self.kind, e))?;
        let status = EventStatus::from_str(&self.status)
            .map_err(|e| decode_error("event status", &self.status, e))?;

        Ok(EventLog {
            id,
            trigger_id,
            name: self.name,
            kind,
            executed_at: self.executed_at,
            payload: self.payload,
            status,
        })
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

const INSERT_TRIGGER: &str = r#"
    INSERT INTO triggers (id, name, kind, fire_at, payload, created_at)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

const INSERT_EVENT_LOG: &str = r#"
    INSERT INTO event_logs (id, trigger_id, name, kind, executed_at, payload, status)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

fn insert_trigger_query(trigger: &Trigger) -> PgQuery<'_> {
    sqlx::query(INSERT_TRIGGER)
        .bind(trigger.id.to_string())
        .bind(&trigger.name)
        .bind(trigger.kind.as_str())
        .bind(trigger.fire_at)
        .bind(&trigger.payload)
        .bind(trigger.created_at)
}

fn insert_event_log_query(log: &EventLog) -> PgQuery<'_> {
    sqlx::query(INSERT_EVENT_LOG)
        .bind(log.id.to_string())
        .bind(log.trigger_id.to_string())
        .bind(&log.name)
        .bind(log.kind.as_str())
        .bind(log.executed_at)
        .bind(&log.payload)
        .bind(log.status.as_str())
}

/// `TriggerStore` backed by a PostgreSQL connection pool.
///
/// Every call checks a connection out of the pool for its duration only.
#[derive(Clone)]
pub struct PgTriggerStore {
    pool: PgPool,
}

impl PgTriggerStore {
    /// Creates a new store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TriggerStore for PgTriggerStore {
    #[instrument(skip(self, trigger), fields(trigger_id = %trigger.id))]
    async fn insert_trigger(&self, trigger: &Trigger) -> Result<(), TriggerError> {
        insert_trigger_query(trigger)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(e, trigger.id))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_trigger(&self, id: TriggerId) -> Result<Option<Trigger>, TriggerError> {
        let row: Option<TriggerRow> = sqlx::query_as(
            r#"
            SELECT id, name, kind, fire_at, payload, created_at
            FROM triggers
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(read_error)?;

        row.map(TriggerRow::try_into_trigger)
            .transpose()
            .map_err(read_error)
    }

    #[instrument(skip(self))]
    async fn list_triggers(&self) -> Result<Vec<Trigger>, TriggerError> {
        let rows: Vec<TriggerRow> = sqlx::query_as(
            r#"
            SELECT id, name, kind, fire_at, payload, created_at
            FROM triggers
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        rows.into_iter()
            .map(|r| r.try_into_trigger().map_err(read_error))
            .collect()
    }

    #[instrument(skip(self, log), fields(event_id = %log.id, trigger_id = %log.trigger_id))]
    async fn insert_event_log(&self, log: &EventLog) -> Result<(), TriggerError> {
        insert_event_log_query(log)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(e, log.id))?;
        Ok(())
    }

    #[instrument(skip(self, trigger, log), fields(trigger_id = %trigger.id, event_id = %log.id))]
    async fn insert_trigger_with_event(
        &self,
        trigger: &Trigger,
        log: &EventLog,
    ) -> Result<(), TriggerError> {
        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.pool.begin().await.map_err(read_error)?;

        insert_trigger_query(trigger)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error(e, trigger.id))?;
        insert_event_log_query(log)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error(e, log.id))?;

        tx.commit().await.map_err(read_error)
    }

    #[instrument(skip(self))]
    async fn list_event_logs(&self) -> Result<Vec<EventLog>, TriggerError> {
        let rows: Vec<EventLogRow> = sqlx::query_as(
            r#"
            SELECT id, trigger_id, name, kind, executed_at, payload, status
            FROM event_logs
            ORDER BY executed_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        rows.into_iter()
            .map(|r| r.try_into_event_log().map_err(read_error))
            .collect()
    }

    #[instrument(skip(self))]
    async fn list_unfired_scheduled(&self) -> Result<Vec<Trigger>, TriggerError> {
        let rows: Vec<TriggerRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.name, t.kind, t.fire_at, t.payload, t.created_at
            FROM triggers t
            WHERE t.kind = 'scheduled'
              AND t.fire_at IS NOT NULL
              AND NOT EXISTS (
                  SELECT 1 FROM event_logs l
                  WHERE l.trigger_id = t.id AND l.status = 'completed'
              )
            ORDER BY t.fire_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        rows.into_iter()
            .map(|r| r.try_into_trigger().map_err(read_error))
            .collect()
    }

    async fn ping(&self) -> Result<(), TriggerError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(read_error)?;
        Ok(())
    }
}
