//! Event handling → file & state updates, spec.md §4.5.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use binlog::mariadb::gtid::MariadbGtid;
use binlog::mariadb::gtid_event::{GtidListEvent, MariadbGtidEvent};
use binlog::router_event::{event_type, RawEvent};
use common::err::decode_error::ReError;
use relay_log::binlog_file::BinlogFileManager;
use relay_log::gtid_index::GtidIndexStore;

use crate::fanout::SlaveFanout;
use crate::instance::MasterInstance;
use crate::trx::PendingTransaction;

pub struct EventPipeline {
    pub file_manager: BinlogFileManager,
    pub gtid_store: Arc<dyn GtidIndexStore>,
    pub fanout: Arc<SlaveFanout>,
    pub trx: PendingTransaction,
    pub transaction_safety: bool,
}

/// A ROTATE_EVENT body is an 8-byte little-endian position followed by the
/// next file's name (no length prefix — it runs to the end of the event,
/// short of the trailing checksum the caller has already stripped).
fn parse_rotate_target(body: &[u8]) -> Option<(u64, String)> {
    if body.len() < 8 {
        return None;
    }
    let pos = u64::from_le_bytes(body[0..8].try_into().ok()?);
    let name = String::from_utf8_lossy(&body[8..]).into_owned();
    Some((pos, name))
}

/// Pulls the trailing `.NNNNNN` sequence number out of a binlog file name.
fn file_sequence(name: &str) -> Option<u32> {
    let suffix = name.rsplit('.').next()?;
    suffix.parse().ok()
}

fn query_payload_is(body: &[u8], needle: &str) -> bool {
    // QUERY_EVENT's SQL text follows a variable-length status block whose
    // exact layout the router doesn't need; a substring probe on the tail
    // is enough to recognize BEGIN/COMMIT markers (spec.md §4.5 step 5).
    let text = String::from_utf8_lossy(body);
    text.trim_start().to_ascii_uppercase().starts_with(needle)
}

impl EventPipeline {
    pub fn new(
        file_manager: BinlogFileManager,
        gtid_store: Arc<dyn GtidIndexStore>,
        fanout: Arc<SlaveFanout>,
        transaction_safety: bool,
    ) -> Self {
        EventPipeline {
            file_manager,
            gtid_store,
            fanout,
            trx: PendingTransaction::default(),
            transaction_safety,
        }
    }

    /// Processes one fully reassembled, decrypted event against `instance`,
    /// per spec.md §4.5 steps 1-7 (semi-sync ACK is the caller's
    /// responsibility once this returns, since it needs the wire
    /// connection). Returns any wire-only bytes the caller must forward to
    /// slaves directly — artificial events are never written to file, so
    /// they can't reach slaves through a file-based read-and-forward path.
    pub async fn handle_event(
        &mut self,
        instance: &mut MasterInstance,
        raw: RawEvent,
        event_bytes: Vec<u8>,
    ) -> Result<Vec<Vec<u8>>, ReError> {
        instance.stats.record(raw.total_len() as u64);

        if raw.event_type() == event_type::HEARTBEAT_LOG_EVENT {
            instance.last_reply = Some(std::time::Instant::now());
            return Ok(Vec::new());
        }

        let flags = raw.flags();
        if flags.is_artificial() {
            // Artificial events aren't written, but a fake ROTATE still
            // advances the router to the new file, filling any skipped file
            // numbers with empty magic-only files (spec.md §8 scenario 1).
            // A fake GTID_LIST_EVENT travels alongside it so a reconnecting
            // slave can re-derive the router's GTID position without having
            // read the file the ROTATE just moved away from.
            if raw.event_type() == event_type::ROTATE_EVENT {
                let target = parse_rotate_target(&raw.body)
                    .and_then(|(_, name)| file_sequence(&name))
                    .unwrap_or(self.file_manager.current_index() + 1);
                self.file_manager.rotate_to(target)?;
                instance.current_file = self.file_manager.current_path().to_string_lossy().to_string();
                instance.current_pos = self.file_manager.current_pos();

                let gtid_list_body = GtidListEvent {
                    list: instance.last_mariadb_gtid.clone(),
                }
                .serialize();
                let gtid_list_bytes = RawEvent::build(
                    0,
                    event_type::GTID_LIST_EVENT,
                    raw.header.server_id,
                    instance.current_pos as u32,
                    0x20, // LOG_EVENT_ARTIFICIAL_F
                    gtid_list_body,
                );
                return Ok(vec![event_bytes, gtid_list_bytes]);
            }
            return Ok(Vec::new());
        }

        if binlog::crc::verify(&event_bytes).is_err() {
            instance.n_badcrc.fetch_add(1, Ordering::Relaxed);
            return Err(ReError::ChecksumMismatch(format!(
                "event at {} failed crc32 verification",
                raw.header.get_log_pos()
            )));
        }

        self.file_manager
            .write_event(event_bytes, raw.event_type(), raw.header.get_log_pos() as u64)?;
        instance.current_pos = self.file_manager.current_pos();

        if self.transaction_safety {
            self.track_transaction(instance, &raw).await?;
        }

        Ok(Vec::new())
    }

    async fn track_transaction(&mut self, instance: &mut MasterInstance, raw: &RawEvent) -> Result<(), ReError> {
        match raw.event_type() {
            t if t == event_type::GTID_EVENT => {
                let ev = MariadbGtidEvent::parse(&raw.body, raw.header.server_id, None)?;
                self.trx.open_gtid(instance.current_pos, ev.gtid, ev.is_standalone());
            }
            t if t == event_type::QUERY_EVENT => {
                if query_payload_is(&raw.body, "BEGIN") || query_payload_is(&raw.body, "START TRANSACTION") {
                    self.trx.open_query(instance.current_pos);
                } else if query_payload_is(&raw.body, "COMMIT") {
                    self.trx.mark_commit_seen();
                }
            }
            t if t == event_type::XID_EVENT => {
                self.trx.mark_xid_seen(instance.current_pos);
            }
            _ => {}
        }

        if self.trx.is_closed() {
            self.promote_closed_transaction(instance).await?;
        }
        Ok(())
    }

    /// spec.md §4.5 step 6: promote `binlog_position`, update
    /// `last_mariadb_gtid`, upsert the GTID index, notify slaves.
    async fn promote_closed_transaction(&mut self, instance: &mut MasterInstance) -> Result<(), ReError> {
        let closed = self.trx.close(instance.current_pos);
        instance.binlog_position = instance.current_pos;

        if let Some(gtid) = closed.gtid {
            instance.last_mariadb_gtid.update(gtid);
            self.gtid_store
                .upsert(gtid, &instance.current_file, closed.start_pos, closed.end_pos)
                .await?;
        }

        self.fanout.notify_all_pending();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use binlog::mariadb::gtid::GtidList;
    use common::config::router_config::BinlogRouterConfig;
    use relay_log::binlog_file::BinlogLayout;
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MemGtidStore {
        rows: StdMutex<BTreeMap<(u32, u32, u64, String), relay_log::gtid_index::GtidIndexEntry>>,
    }

    #[async_trait::async_trait]
    impl GtidIndexStore for MemGtidStore {
        async fn upsert(
            &self,
            gtid: MariadbGtid,
            binlog_file: &str,
            start_pos: u64,
            end_pos: u64,
        ) -> Result<(), ReError> {
            let mut rows = self.rows.lock().unwrap();
            let key = (gtid.domain_id, gtid.server_id, gtid.sequence, binlog_file.to_string());
            rows.insert(
                key,
                relay_log::gtid_index::GtidIndexEntry {
                    id: rows.len() as i64 + 1,
                    gtid,
                    binlog_file: binlog_file.to_string(),
                    start_pos,
                    end_pos,
                },
            );
            Ok(())
        }

        async fn lookup(
            &self,
            gtid: MariadbGtid,
            binlog_file: &str,
        ) -> Result<Option<relay_log::gtid_index::GtidIndexEntry>, ReError> {
            let key = (gtid.domain_id, gtid.server_id, gtid.sequence, binlog_file.to_string());
            Ok(self.rows.lock().unwrap().get(&key).cloned())
        }

        async fn last_entry(&self) -> Result<Option<relay_log::gtid_index::GtidIndexEntry>, ReError> {
            Ok(self.rows.lock().unwrap().values().max_by_key(|e| e.id).cloned())
        }

        async fn scan_domain(&self, domain_id: u32) -> Result<Vec<relay_log::gtid_index::GtidIndexEntry>, ReError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|e| e.gtid.domain_id == domain_id)
                .cloned()
                .collect())
        }
    }

    fn layout_in(dir: &std::path::Path) -> BinlogLayout {
        let cfg = BinlogRouterConfig {
            binlogdir: dir.to_string_lossy().to_string(),
            filestem: "mysql-bin".to_string(),
            ..Default::default()
        };
        BinlogLayout::new(&cfg, 0)
    }

    fn sample_event(event_type: u8, payload: &[u8]) -> Vec<u8> {
        let body = binlog::crc::append(payload.to_vec());
        let mut v = Vec::new();
        v.extend_from_slice(&0u32.to_le_bytes());
        v.push(event_type);
        v.extend_from_slice(&1u32.to_le_bytes());
        let total_len = 19 + body.len() as u32;
        v.extend_from_slice(&total_len.to_le_bytes());
        v.extend_from_slice(&0u32.to_le_bytes());
        v.extend_from_slice(&0u16.to_le_bytes());
        v.extend_from_slice(&body);
        v
    }

    #[tokio::test]
    async fn query_begin_commit_promotes_gtid_and_notifies() {
        let mut tmp = std::env::temp_dir();
        tmp.push(format!("master_pipeline_test_{}", std::process::id()));
        std::fs::create_dir_all(&tmp).unwrap();

        let file_manager = BinlogFileManager::init(layout_in(&tmp), 1, false).unwrap();
        let gtid_store: Arc<dyn GtidIndexStore> = Arc::new(MemGtidStore::default());
        let fanout = Arc::new(SlaveFanout::new());
        let mut pipeline = EventPipeline::new(file_manager, gtid_store.clone(), fanout, true);
        let mut instance = MasterInstance::new(
            "mysql-bin.000001".to_string(),
            4,
            std::time::Duration::from_secs(60),
        );

        let gtid_bytes = {
            let mut v = Vec::new();
            v.extend_from_slice(&7u64.to_le_bytes());
            v.extend_from_slice(&2u32.to_le_bytes());
            v.push(0);
            v
        };
        let gtid_event_bytes = sample_event(event_type::GTID_EVENT, &gtid_bytes);
        let raw = RawEvent::parse(&gtid_event_bytes).unwrap();
        pipeline.handle_event(&mut instance, raw, gtid_event_bytes).await.unwrap();

        let xid_bytes = sample_event(event_type::XID_EVENT, &1u64.to_le_bytes());
        let raw = RawEvent::parse(&xid_bytes).unwrap();
        pipeline.handle_event(&mut instance, raw, xid_bytes).await.unwrap();

        assert_eq!(instance.last_mariadb_gtid.get(2).unwrap().sequence, 7);
        let entry = gtid_store
            .lookup(MariadbGtid::new(2, 1, 7), "mysql-bin.000001")
            .await
            .unwrap();
        assert!(entry.is_some());

        let _ = GtidList::empty();

        std::fs::remove_dir_all(&tmp).ok();
    }

    fn artificial_rotate_event(next_binlog_filename: &str) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&4u64.to_le_bytes());
        body.extend_from_slice(next_binlog_filename.as_bytes());

        let mut v = Vec::new();
        v.extend_from_slice(&0u32.to_le_bytes());
        v.push(event_type::ROTATE_EVENT);
        v.extend_from_slice(&1u32.to_le_bytes());
        let total_len = 19 + body.len() as u32;
        v.extend_from_slice(&total_len.to_le_bytes());
        v.extend_from_slice(&0u32.to_le_bytes());
        v.extend_from_slice(&0x20u16.to_le_bytes()); // LOG_EVENT_ARTIFICIAL_F
        v.extend_from_slice(&body);
        v
    }

    #[tokio::test]
    async fn fake_rotate_fills_skipped_file_numbers() {
        let mut tmp = std::env::temp_dir();
        tmp.push(format!("master_pipeline_rotate_test_{}", std::process::id()));
        std::fs::create_dir_all(&tmp).unwrap();

        let file_manager = BinlogFileManager::init(layout_in(&tmp), 5, false).unwrap();
        let gtid_store: Arc<dyn GtidIndexStore> = Arc::new(MemGtidStore::default());
        let fanout = Arc::new(SlaveFanout::new());
        let mut pipeline = EventPipeline::new(file_manager, gtid_store, fanout, true);
        let mut instance = MasterInstance::new(
            "mysql-bin.000005".to_string(),
            4,
            std::time::Duration::from_secs(60),
        );

        let rotate_bytes = artificial_rotate_event("mysql-bin.000010");
        let raw = RawEvent::parse(&rotate_bytes).unwrap();
        let forwarded = pipeline.handle_event(&mut instance, raw, rotate_bytes).await.unwrap();
        assert_eq!(forwarded.len(), 2);
        let gtid_list_ev = RawEvent::parse(&forwarded[1]).unwrap();
        assert_eq!(gtid_list_ev.event_type(), event_type::GTID_LIST_EVENT);

        assert_eq!(pipeline.file_manager.current_index(), 10);
        for gap in 6..10 {
            let bytes = std::fs::read(layout_in(&tmp).file_path(gap)).unwrap();
            assert_eq!(bytes, relay_log::binlog_file::BINLOG_MAGIC);
        }

        std::fs::remove_dir_all(&tmp).ok();
    }
}
