use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use waypoint_core::repository::{LinkRepository, LinkStore, Result, ShortLinkRecord};
use waypoint_core::{ShortKey, StorageError};

/// MySQL implementation of the store traits.
///
/// Timestamps are stored as Unix milliseconds. The unique index on
/// `short_key` is what enforces key uniqueness across all writers; see
/// `ddl/mysql/short_links.sql`.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn now_unix_millis() -> i64 {
    Timestamp::now().as_millisecond()
}

fn parse_timestamp(column: &str, millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{millis}': {e}"))
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn record_from_row(row: &MySqlRow) -> Result<ShortLinkRecord> {
    let short_key: String = row.try_get("short_key").map_err(map_sqlx_error)?;
    let short_key = ShortKey::new(short_key)
        .map_err(|e| StorageError::InvalidData(e.to_string()))?;
    let destination_url: String = row.try_get("destination_url").map_err(map_sqlx_error)?;
    let owner_id: String = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;

    Ok(ShortLinkRecord {
        short_key,
        destination_url,
        owner_id,
        created_at: parse_timestamp("created_at", created_at)?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
    })
}

#[async_trait]
impl LinkStore for MySqlRepository {
    async fn find_by_key(&self, key: &ShortKey) -> Result<Option<ShortLinkRecord>> {
        let row = sqlx::query(
            r#"
            SELECT short_key, destination_url, owner_id, created_at, updated_at
            FROM short_links
            WHERE short_key = ?
            LIMIT 1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }
}

#[async_trait]
impl LinkRepository for MySqlRepository {
    async fn insert(&self, record: ShortLinkRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_links (short_key, destination_url, owner_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.short_key.as_str())
        .bind(&record.destination_url)
        .bind(&record.owner_id)
        .bind(record.created_at.as_millisecond())
        .bind(record.updated_at.as_millisecond())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.short_key.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn update_destination(
        &self,
        key: &ShortKey,
        destination_url: &str,
    ) -> Result<ShortLinkRecord> {
        sqlx::query(
            r#"
            UPDATE short_links
            SET destination_url = ?, updated_at = ?
            WHERE short_key = ?
            "#,
        )
        .bind(destination_url)
        .bind(now_unix_millis())
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.find_by_key(key)
            .await?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn rename(&self, from: &ShortKey, to: &ShortKey) -> Result<ShortLinkRecord> {
        let result = sqlx::query(
            r#"
            UPDATE short_links
            SET short_key = ?, updated_at = ?
            WHERE short_key = ?
            "#,
        )
        .bind(to.as_str())
        .bind(now_unix_millis())
        .bind(from.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(StorageError::Conflict(to.to_string()))
            }
            Err(err) => return Err(map_sqlx_error(err)),
        }

        self.find_by_key(to)
            .await?
            .ok_or_else(|| StorageError::NotFound(from.to_string()))
    }

    async fn delete(&self, key: &ShortKey) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM short_links
            WHERE short_key = ?
            "#,
        )
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
