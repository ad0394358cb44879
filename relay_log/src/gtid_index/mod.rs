//! GTID index: `(domain, server_id, sequence, file) -> (start_pos, end_pos)`,
//! spec.md §3 "GTID index", §6 "GTID index: a single SQLite file".
//!
//! The concrete store (SQLite) is named in spec.md §1 as one of the
//! enclosing proxy framework's external collaborators, so the router talks
//! to it only through [`GtidIndexStore`] — see design note §9 "SQLite GTID
//! store: replaceable with an embedded key-value store, provided it
//! supports atomic upserts ... and ordered scans by a monotonically
//! increasing id".

pub mod sqlite_store;

use async_trait::async_trait;
use binlog::mariadb::gtid::MariadbGtid;
use common::err::decode_error::ReError;

pub use sqlite_store::SqliteGtidStore;

/// One row of the GTID index: a GTID and the file byte range it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtidIndexEntry {
    pub id: i64,
    pub gtid: MariadbGtid,
    pub binlog_file: String,
    pub start_pos: u64,
    pub end_pos: u64,
}

#[async_trait]
pub trait GtidIndexStore: Send + Sync {
    /// Inserts `(domain, server_id, sequence, file)` with its byte range;
    /// if the key already exists, updates `start_pos`/`end_pos` instead
    /// (spec.md §3 "write-once per key; subsequent matching rows update").
    async fn upsert(
        &self,
        gtid: MariadbGtid,
        binlog_file: &str,
        start_pos: u64,
        end_pos: u64,
    ) -> Result<(), ReError>;

    /// Returns the entry for `gtid` in `binlog_file`, if any.
    async fn lookup(&self, gtid: MariadbGtid, binlog_file: &str) -> Result<Option<GtidIndexEntry>, ReError>;

    /// Returns the most recently inserted/updated row (highest `id`), used
    /// by `init` to locate the last-written file after a restart in
    /// MariaDB-GTID-master mode (spec.md §4.2 "init").
    async fn last_entry(&self) -> Result<Option<GtidIndexEntry>, ReError>;

    /// Ordered scan of every entry for `domain_id`, ascending by `id`.
    async fn scan_domain(&self, domain_id: u32) -> Result<Vec<GtidIndexEntry>, ReError>;
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory stand-in used to unit-test code that only needs the
    /// trait's contract, without pulling SQLite into the test binary.
    #[derive(Default)]
    struct MemStore {
        rows: Mutex<BTreeMap<(u32, u32, u64, String), GtidIndexEntry>>,
        next_id: Mutex<i64>,
    }

    #[async_trait]
    impl GtidIndexStore for MemStore {
        async fn upsert(
            &self,
            gtid: MariadbGtid,
            binlog_file: &str,
            start_pos: u64,
            end_pos: u64,
        ) -> Result<(), ReError> {
            let key = (gtid.domain_id, gtid.server_id, gtid.sequence, binlog_file.to_string());
            let mut rows = self.rows.lock().unwrap();
            if let Some(existing) = rows.get_mut(&key) {
                existing.start_pos = start_pos;
                existing.end_pos = end_pos;
            } else {
                let mut next_id = self.next_id.lock().unwrap();
                *next_id += 1;
                rows.insert(
                    key,
                    GtidIndexEntry {
                        id: *next_id,
                        gtid,
                        binlog_file: binlog_file.to_string(),
                        start_pos,
                        end_pos,
                    },
                );
            }
            Ok(())
        }

        async fn lookup(&self, gtid: MariadbGtid, binlog_file: &str) -> Result<Option<GtidIndexEntry>, ReError> {
            let key = (gtid.domain_id, gtid.server_id, gtid.sequence, binlog_file.to_string());
            Ok(self.rows.lock().unwrap().get(&key).cloned())
        }

        async fn last_entry(&self) -> Result<Option<GtidIndexEntry>, ReError> {
            Ok(self.rows.lock().unwrap().values().max_by_key(|e| e.id).cloned())
        }

        async fn scan_domain(&self, domain_id: u32) -> Result<Vec<GtidIndexEntry>, ReError> {
            let mut out: Vec<GtidIndexEntry> = self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|e| e.gtid.domain_id == domain_id)
                .cloned()
                .collect();
            out.sort_by_key(|e| e.id);
            Ok(out)
        }
    }

    #[tokio::test]
    async fn upsert_is_insert_then_update_on_matching_key() {
        let store = MemStore::default();
        let gtid = MariadbGtid::new(0, 1, 100);
        store.upsert(gtid, "mysql-bin.000001", 4, 200).await.unwrap();
        store.upsert(gtid, "mysql-bin.000001", 4, 350).await.unwrap();

        let entries = store.scan_domain(0).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].end_pos, 350);
    }

    #[tokio::test]
    async fn last_entry_tracks_most_recently_inserted_row() {
        let store = MemStore::default();
        store
            .upsert(MariadbGtid::new(0, 1, 1), "mysql-bin.000001", 4, 100)
            .await
            .unwrap();
        store
            .upsert(MariadbGtid::new(0, 1, 2), "mysql-bin.000001", 100, 200)
            .await
            .unwrap();

        let last = store.last_entry().await.unwrap().unwrap();
        assert_eq!(last.gtid.sequence, 2);
    }
}
