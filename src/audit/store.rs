//! SQLite-backed audit storage.
//!
//! Pool initialization enables WAL mode for concurrent access, schema comes
//! from the `migrations/` directory, and all statements are parameterized.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::{error, info};
use sqlx::{Pool, Row, Sqlite, SqlitePool};

use crate::config::DB_PATH;
use crate::error_handling::DatabaseError;

use super::{AuditPage, AuditQuery, AuditRecord, AuditSink, LogType};

/// Initializes a pool at the default path, or the `GEO_GATE_DB_PATH`
/// environment variable when set.
pub async fn init_db_pool() -> Result<Arc<Pool<Sqlite>>, DatabaseError> {
    let db_path = std::env::var("GEO_GATE_DB_PATH").unwrap_or_else(|_| DB_PATH.to_string());
    init_db_pool_with_path(std::path::Path::new(&db_path)).await
}

/// Initializes a pool with an explicit database path, creating the file if
/// needed and enabling WAL mode.
pub async fn init_db_pool_with_path(
    db_path: &std::path::Path,
) -> Result<Arc<Pool<Sqlite>>, DatabaseError> {
    let db_path_str = db_path.to_string_lossy().to_string();
    match OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&db_path_str)
    {
        Ok(_) => info!("Audit database file created."),
        Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
            info!("Audit database file already exists.")
        }
        Err(e) => {
            error!("Failed to create audit database file: {e}");
            return Err(DatabaseError::FileCreationError(e.to_string()));
        }
    }

    let pool = SqlitePool::connect(&format!("sqlite:{}", db_path_str))
        .await
        .map_err(|e| {
            error!("Failed to connect to audit database: {e}");
            DatabaseError::SqlError(e)
        })?;

    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await
        .map_err(|e| {
            error!("Failed to set WAL mode: {e}");
            DatabaseError::SqlError(e)
        })?;

    Ok(Arc::new(pool))
}

/// Runs SQLx migrations located in the `migrations/` directory.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), DatabaseError> {
    let migrations_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir.as_path())
        .await
        .map_err(DatabaseError::MigrationError)?;
    migrator
        .run(pool)
        .await
        .map_err(DatabaseError::MigrationError)?;
    Ok(())
}

/// Audit storage over a SQLite pool: insert, filtered retrieval, clear.
pub struct SqliteAuditStore {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteAuditStore {
    pub fn new(pool: Arc<Pool<Sqlite>>) -> Self {
        Self { pool }
    }

    /// Retrieves one page of records matching `query`, newest first.
    ///
    /// `page` is 1-based; `per_page` of 0 falls back to 20.
    pub async fn query(
        &self,
        query: &AuditQuery,
        page: u32,
        per_page: u32,
    ) -> Result<AuditPage, DatabaseError> {
        let per_page = if per_page == 0 { 20 } else { per_page };
        let page = page.max(1);

        let (where_clause, binds) = build_filter(query);

        let count_sql = format!("SELECT COUNT(*) AS n FROM access_log{where_clause}");
        let mut count_query = sqlx::query(&count_sql);
        for bind in &binds {
            count_query = count_query.bind(bind);
        }
        let total: i64 = count_query
            .fetch_one(&*self.pool)
            .await
            .map_err(DatabaseError::SqlError)?
            .get("n");

        let select_sql = format!(
            "SELECT id, timestamp_ms, ip_address, country_code, country_name, \
             region_code, region_name, city, zip, status, reason, form_id, log_type \
             FROM access_log{where_clause} \
             ORDER BY timestamp_ms DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut select_query = sqlx::query(&select_sql);
        for bind in &binds {
            select_query = select_query.bind(bind);
        }
        let offset = i64::from(page - 1) * i64::from(per_page);
        let rows = select_query
            .bind(i64::from(per_page))
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(DatabaseError::SqlError)?;

        let records = rows.iter().map(row_to_record).collect();

        Ok(AuditPage {
            records,
            total,
            page,
            per_page,
        })
    }

    /// Deletes every audit record. Returns the number of rows removed.
    pub async fn clear(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM access_log")
            .execute(&*self.pool)
            .await
            .map_err(DatabaseError::SqlError)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AuditSink for SqliteAuditStore {
    async fn record(&self, record: AuditRecord) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO access_log \
             (timestamp_ms, ip_address, country_code, country_name, region_code, \
              region_name, city, zip, status, reason, form_id, log_type) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.timestamp.timestamp_millis())
        .bind(&record.ip_address)
        .bind(&record.country_code)
        .bind(&record.country_name)
        .bind(&record.region_code)
        .bind(&record.region_name)
        .bind(&record.city)
        .bind(&record.zip)
        .bind(&record.status)
        .bind(&record.reason)
        .bind(&record.form_id)
        .bind(record.log_type.as_str())
        .execute(&*self.pool)
        .await
        .map_err(DatabaseError::SqlError)?;
        Ok(())
    }
}

/// Builds the WHERE clause and its positional bind values for a filter.
fn build_filter(query: &AuditQuery) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    if let Some(from) = query.from {
        clauses.push("timestamp_ms >= ?".to_string());
        binds.push(from.timestamp_millis().to_string());
    }
    if let Some(to) = query.to {
        clauses.push("timestamp_ms <= ?".to_string());
        binds.push(to.timestamp_millis().to_string());
    }
    if let Some(ip) = &query.ip_contains {
        clauses.push("ip_address LIKE ?".to_string());
        binds.push(format!("%{ip}%"));
    }
    if let Some(country) = &query.country_code {
        clauses.push("country_code = ?".to_string());
        binds.push(country.clone());
    }
    if let Some(region) = &query.region_code {
        clauses.push("region_code = ?".to_string());
        binds.push(region.clone());
    }
    if let Some(status) = &query.status {
        clauses.push("status = ?".to_string());
        binds.push(status.clone());
    }
    if let Some(reason) = &query.reason_contains {
        clauses.push("reason LIKE ?".to_string());
        binds.push(format!("%{reason}%"));
    }
    if let Some(log_type) = query.log_type {
        clauses.push("log_type = ?".to_string());
        binds.push(log_type.as_str().to_string());
    }

    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), binds)
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> AuditRecord {
    let millis: i64 = row.get("timestamp_ms");
    let log_type: String = row.get("log_type");
    AuditRecord {
        id: Some(row.get("id")),
        timestamp: Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC),
        ip_address: row.get("ip_address"),
        country_code: row.get("country_code"),
        country_name: row.get("country_name"),
        region_code: row.get("region_code"),
        region_name: row.get("region_name"),
        city: row.get("city"),
        zip: row.get("zip"),
        status: row.get("status"),
        reason: row.get("reason"),
        form_id: row.get("form_id"),
        log_type: LogType::parse(&log_type).unwrap_or(LogType::LocationCheck),
    }
}
