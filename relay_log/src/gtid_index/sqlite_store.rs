//! SQLite-backed [`GtidIndexStore`], spec.md §6: a single file
//! `<binlogdir>/gtid_maps.db` holding
//! `gtid_maps(id PK AUTOINC, rep_domain, server_id, sequence, binlog_file,
//! start_pos, end_pos)` with `UNIQUE(rep_domain, server_id, sequence,
//! binlog_file)`.

use async_trait::async_trait;
use binlog::mariadb::gtid::MariadbGtid;
use common::err::decode_error::ReError;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use super::{GtidIndexEntry, GtidIndexStore};

pub struct SqliteGtidStore {
    pool: SqlitePool,
}

impl SqliteGtidStore {
    /// Opens (creating if absent) `<binlogdir>/gtid_maps.db` and ensures the
    /// `gtid_maps` table exists.
    pub async fn open(db_path: &str) -> Result<Self, ReError> {
        let url = format!("sqlite://{}?mode=rwc", db_path);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .map_err(|e| ReError::GtidIndexErr(format!("opening {}: {}", db_path, e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS gtid_maps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rep_domain INTEGER NOT NULL,
                server_id INTEGER NOT NULL,
                sequence INTEGER NOT NULL,
                binlog_file TEXT NOT NULL,
                start_pos INTEGER NOT NULL,
                end_pos INTEGER NOT NULL,
                UNIQUE(rep_domain, server_id, sequence, binlog_file)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| ReError::GtidIndexErr(format!("creating gtid_maps: {}", e)))?;

        Ok(SqliteGtidStore { pool })
    }
}

#[async_trait]
impl GtidIndexStore for SqliteGtidStore {
    async fn upsert(
        &self,
        gtid: MariadbGtid,
        binlog_file: &str,
        start_pos: u64,
        end_pos: u64,
    ) -> Result<(), ReError> {
        // Insert first; a UNIQUE-constraint hit falls back to an update of
        // the existing row's byte range (spec.md §3 "insert, with fallback
        // update on constraint").
        let inserted = sqlx::query(
            "INSERT INTO gtid_maps (rep_domain, server_id, sequence, binlog_file, start_pos, end_pos) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(gtid.domain_id as i64)
        .bind(gtid.server_id as i64)
        .bind(gtid.sequence as i64)
        .bind(binlog_file)
        .bind(start_pos as i64)
        .bind(end_pos as i64)
        .execute(&self.pool)
        .await;

        if inserted.is_err() {
            sqlx::query(
                "UPDATE gtid_maps SET start_pos = ?, end_pos = ? \
                 WHERE rep_domain = ? AND server_id = ? AND sequence = ? AND binlog_file = ?",
            )
            .bind(start_pos as i64)
            .bind(end_pos as i64)
            .bind(gtid.domain_id as i64)
            .bind(gtid.server_id as i64)
            .bind(gtid.sequence as i64)
            .bind(binlog_file)
            .execute(&self.pool)
            .await
            .map_err(|e| ReError::GtidIndexErr(format!("updating gtid_maps: {}", e)))?;
        }
        Ok(())
    }

    async fn lookup(&self, gtid: MariadbGtid, binlog_file: &str) -> Result<Option<GtidIndexEntry>, ReError> {
        let row: Option<(i64, i64, i64, i64, String, i64, i64)> = sqlx::query_as(
            "SELECT id, rep_domain, server_id, sequence, binlog_file, start_pos, end_pos \
             FROM gtid_maps WHERE rep_domain = ? AND server_id = ? AND sequence = ? AND binlog_file = ?",
        )
        .bind(gtid.domain_id as i64)
        .bind(gtid.server_id as i64)
        .bind(gtid.sequence as i64)
        .bind(binlog_file)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ReError::GtidIndexErr(format!("looking up gtid_maps: {}", e)))?;

        Ok(row.map(row_to_entry))
    }

    async fn last_entry(&self) -> Result<Option<GtidIndexEntry>, ReError> {
        let row: Option<(i64, i64, i64, i64, String, i64, i64)> = sqlx::query_as(
            "SELECT id, rep_domain, server_id, sequence, binlog_file, start_pos, end_pos \
             FROM gtid_maps ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ReError::GtidIndexErr(format!("reading last gtid_maps row: {}", e)))?;

        Ok(row.map(row_to_entry))
    }

    async fn scan_domain(&self, domain_id: u32) -> Result<Vec<GtidIndexEntry>, ReError> {
        let rows: Vec<(i64, i64, i64, i64, String, i64, i64)> = sqlx::query_as(
            "SELECT id, rep_domain, server_id, sequence, binlog_file, start_pos, end_pos \
             FROM gtid_maps WHERE rep_domain = ? ORDER BY id ASC",
        )
        .bind(domain_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReError::GtidIndexErr(format!("scanning gtid_maps: {}", e)))?;

        Ok(rows.into_iter().map(row_to_entry).collect())
    }
}

fn row_to_entry(row: (i64, i64, i64, i64, String, i64, i64)) -> GtidIndexEntry {
    let (id, domain, server_id, sequence, binlog_file, start_pos, end_pos) = row;
    GtidIndexEntry {
        id,
        gtid: MariadbGtid::new(domain as u32, server_id as u32, sequence as u64),
        binlog_file,
        start_pos: start_pos as u64,
        end_pos: end_pos as u64,
    }
}
