use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use crate::models::{EntryId, FollowupEntry, StoredEntry};
use crate::store::{LogStore, StoreError};

/// `followup_dashboard.followup_log`, keyed by a `BIGSERIAL` surrogate id.
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds the pool without touching the network; only a malformed URL fails here.
    pub fn connect_lazy(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .context("DATABASE_URL is not a valid Postgres connection string")?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn init(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("follow-up schema ready");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<StoredEntry>, StoreError> {
        let records = sqlx::query(
            "SELECT id, log_date, group_name, member, incident_number, \
             tech_followup, custom_followup, score \
             FROM followup_dashboard.followup_log \
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(records.len());
        for row in records {
            entries.push(StoredEntry {
                id: EntryId(row.try_get("id")?),
                date: row.try_get("log_date")?,
                group: text(&row, "group_name")?,
                member: text(&row, "member")?,
                incident_number: text(&row, "incident_number")?,
                tech_followup: text(&row, "tech_followup")?,
                custom_followup: text(&row, "custom_followup")?,
                score: row.try_get("score")?,
            });
        }

        debug!(rows = entries.len(), "loaded follow-up log");
        Ok(entries)
    }

    async fn append(&self, entry: &FollowupEntry) -> Result<EntryId, StoreError> {
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO followup_dashboard.followup_log
            (log_date, group_name, member, incident_number, tech_followup, custom_followup, score)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(entry.date)
        .bind(&entry.group)
        .bind(&entry.member)
        .bind(&entry.incident_number)
        .bind(entry.tech_followup.label())
        .bind(entry.custom_followup.label())
        .bind(entry.score())
        .fetch_one(&self.pool)
        .await?
        .try_get("id")?;

        Ok(EntryId(id))
    }

    async fn delete(&self, id: EntryId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM followup_dashboard.followup_log WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn text(row: &sqlx::postgres::PgRow, column: &str) -> Result<String, sqlx::Error> {
    let value: Option<String> = row.try_get(column)?;
    Ok(value.unwrap_or_default())
}
