use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::trace;
use waypoint_core::{AccessEvent, AccessSink, SinkError, StorageError};

use crate::mysql::map_sqlx_error;

/// Appends access events to the `link_access` table.
#[derive(Debug, Clone)]
pub struct MySqlAccessSink {
    pool: MySqlPool,
}

impl MySqlAccessSink {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessSink for MySqlAccessSink {
    async fn record(&self, event: &AccessEvent) -> Result<(), SinkError> {
        trace!(key = %event.short_key, "Writing access event to MySQL");

        sqlx::query(
            r#"
            INSERT INTO link_access
                (short_key, destination_url, referrer, user_agent, client_addr, accessed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.short_key.as_str())
        .bind(&event.destination_url)
        .bind(event.referrer.as_deref())
        .bind(event.user_agent.as_deref())
        .bind(event.client_addr.as_deref())
        .bind(event.accessed_at.as_millisecond())
        .execute(&self.pool)
        .await
        .map_err(|err| match map_sqlx_error(err) {
            StorageError::Unavailable(message) | StorageError::Timeout(message) => {
                SinkError::Unavailable(message)
            }
            other => SinkError::Rejected(other.to_string()),
        })?;

        Ok(())
    }
}
