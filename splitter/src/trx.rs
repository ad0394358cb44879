//! Transaction log & in-flight statement, spec.md §3/§4.9. Grounded in
//! `trx.hh`'s `Trx`/`Stmt` (the original's `GWBUF`/`xxHash` become owned
//! `Vec<u8>` buffers and a `crc32fast` running checksum here).

use std::collections::VecDeque;

use common::config::router_config::TrxReplayChecksum;

/// The in-flight statement: its buffer, a running checksum over the reply
/// bytes seen so far, and how many bytes of reply have arrived.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub buffer: Vec<u8>,
    checksum: crc32fast::Hasher,
    pub bytes: usize,
}

impl Default for Stmt {
    fn default() -> Self {
        Stmt::new(Vec::new())
    }
}

impl Stmt {
    pub fn new(buffer: Vec<u8>) -> Self {
        Stmt {
            buffer,
            checksum: crc32fast::Hasher::new(),
            bytes: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Folds `chunk` into the running checksum per the configured mode;
    /// `is_ok_packet` / `references_last_insert_id` let the caller implement
    /// `result_only`/`no_insert_id` (spec.md §4.9).
    pub fn feed_result(&mut self, chunk: &[u8], mode: TrxReplayChecksum, is_ok_packet: bool, references_last_insert_id: bool) {
        let skip = match mode {
            TrxReplayChecksum::Full => false,
            TrxReplayChecksum::ResultOnly => is_ok_packet,
            TrxReplayChecksum::NoInsertId => is_ok_packet || references_last_insert_id,
        };
        if skip {
            return;
        }
        self.checksum.update(chunk);
        self.bytes += chunk.len();
    }

    pub fn finalize_checksum(&self) -> u32 {
        self.checksum.clone().finalize()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.checksum = crc32fast::Hasher::new();
        self.bytes = 0;
    }
}

/// An append-only log of statements and per-statement result checksums for
/// one transaction, plus the backend it's running on. Replayed by popping
/// `log` in order and comparing freshly computed checksums against
/// `checksums` (spec.md §4.9 step 3).
#[derive(Debug, Clone, Default)]
pub struct Trx {
    log: VecDeque<Vec<u8>>,
    checksums: Vec<u32>,
    size: usize,
    target: Option<u32>,
}

impl Trx {
    pub fn target(&self) -> Option<u32> {
        self.target
    }

    pub fn set_target(&mut self, target: u32) {
        self.target = Some(target);
    }

    /// spec.md §8 "`pop_stmt` composed with `add_stmt` preserves order".
    pub fn add_stmt(&mut self, target: u32, buf: Vec<u8>) {
        self.size += buf.len();
        self.log.push_back(buf);
        self.target = Some(target);
    }

    pub fn add_result(&mut self, checksum: u32) {
        self.checksums.push(checksum);
    }

    pub fn pop_stmt(&mut self) -> Option<Vec<u8>> {
        self.log.pop_front()
    }

    pub fn have_stmts(&self) -> bool {
        !self.log.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn close(&mut self) {
        self.checksums.clear();
        self.log.clear();
        self.size = 0;
        self.target = None;
    }

    pub fn checksums(&self) -> &[u32] {
        &self.checksums
    }
}

/// `{stmt_id → last-used-backend}`, spec.md §3, so `COM_STMT_FETCH` for a
/// prepared statement returns to where `COM_STMT_EXECUTE` ran.
#[derive(Debug, Clone, Default)]
pub struct ExecInfo {
    targets: std::collections::HashMap<u32, u32>,
}

impl ExecInfo {
    pub fn record(&mut self, stmt_id: u32, backend_id: u32) {
        self.targets.insert(stmt_id, backend_id);
    }

    pub fn lookup(&self, stmt_id: u32) -> Option<u32> {
        self.targets.get(&stmt_id).copied()
    }

    /// `COM_STMT_CLOSE` removes the entry (spec.md §3 invariant).
    pub fn close(&mut self, stmt_id: u32) {
        self.targets.remove(&stmt_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pop_stmt_composed_with_add_stmt_preserves_order() {
        let mut trx = Trx::default();
        trx.add_stmt(1, b"BEGIN".to_vec());
        trx.add_stmt(1, b"UPDATE t SET x=1".to_vec());
        assert_eq!(trx.pop_stmt().unwrap(), b"BEGIN");
        assert_eq!(trx.pop_stmt().unwrap(), b"UPDATE t SET x=1");
        assert!(trx.pop_stmt().is_none());
    }

    #[test]
    fn close_resets_all_state() {
        let mut trx = Trx::default();
        trx.add_stmt(3, b"SELECT 1".to_vec());
        trx.add_result(0xdead_beef);
        trx.close();
        assert!(trx.is_empty());
        assert!(trx.checksums().is_empty());
        assert_eq!(trx.target(), None);
    }

    #[test]
    fn exec_info_close_removes_stmt_id() {
        let mut exec = ExecInfo::default();
        exec.record(7, 2);
        assert_eq!(exec.lookup(7), Some(2));
        exec.close(7);
        assert_eq!(exec.lookup(7), None);
    }

    #[test]
    fn result_only_mode_skips_ok_packets_from_checksum() {
        let mut stmt = Stmt::new(b"SELECT 1".to_vec());
        stmt.feed_result(b"\x00ok-packet", TrxReplayChecksum::ResultOnly, true, false);
        assert_eq!(stmt.bytes, 0);
        stmt.feed_result(b"row-data", TrxReplayChecksum::ResultOnly, false, false);
        assert_eq!(stmt.bytes, 8);
    }
}
