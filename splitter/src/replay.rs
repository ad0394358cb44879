//! Transaction replay engine, spec.md §4.9. Grounded in
//! `rwsplitsession.cc`'s `start_trx_replay`/`retry_query` replay loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::trx::Trx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    NotReplaying,
    /// Popping statements from the saved log and comparing checksums.
    Replaying,
    /// The log is exhausted; re-sending the interrupted query.
    ReplayingInterrupted,
}

/// Why a replay was triggered, spec.md §4.9 bullet list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayTrigger {
    TargetDisconnected,
    TargetMigration,
    IgnorableRollback,
    ChecksumMismatch,
}

pub struct ReplaySession {
    pub state: ReplayState,
    saved_trx: Trx,
    interrupted_query: Option<Vec<u8>>,
    interrupted_query_bytes_already_sent: usize,
    replayed_checksums: Vec<u32>,
    attempts: u32,
    max_attempts: u32,
    timeout: Duration,
    started_at: Option<Instant>,
    unreplayable: bool,
    max_size: usize,
    /// Count of replays this session has started, spec.md §4.9. Scoped per
    /// session — there is no router-wide dispatcher object to hang a global
    /// counter off of, unlike the binlog side's `n_badcrc`.
    n_trx_replay: AtomicU64,
}

impl ReplaySession {
    pub fn new(max_attempts: u32, timeout: Duration, max_size: usize) -> Self {
        ReplaySession {
            state: ReplayState::NotReplaying,
            saved_trx: Trx::default(),
            interrupted_query: None,
            interrupted_query_bytes_already_sent: 0,
            replayed_checksums: Vec::new(),
            attempts: 0,
            max_attempts,
            timeout,
            started_at: None,
            unreplayable: false,
            max_size,
            n_trx_replay: AtomicU64::new(0),
        }
    }

    pub fn n_trx_replay(&self) -> u64 {
        self.n_trx_replay.load(Ordering::Relaxed)
    }

    /// Flags a transaction un-replayable the moment it grows past
    /// `trx_max_size`; future failures on it must close the session instead
    /// of attempting replay (spec.md §4.9 step 5).
    pub fn check_size(&mut self, trx_size: usize) {
        if trx_size > self.max_size {
            self.unreplayable = true;
        }
    }

    pub fn is_unreplayable(&self) -> bool {
        self.unreplayable
    }

    /// Step 1-2: save the interrupted statement and the live transaction,
    /// start the clock, and begin popping from the log.
    pub fn start(&mut self, trx: &Trx, interrupted_query: Option<Vec<u8>>) -> Result<(), String> {
        if self.unreplayable {
            return Err("transaction exceeded trx_max_size and cannot be replayed".to_string());
        }
        if self.attempts >= self.max_attempts {
            return Err("trx_max_attempts exceeded".to_string());
        }
        self.attempts += 1;
        self.saved_trx = trx.clone();
        self.interrupted_query = interrupted_query;
        self.interrupted_query_bytes_already_sent = 0;
        self.replayed_checksums.clear();
        self.started_at = Some(Instant::now());
        self.state = ReplayState::Replaying;
        self.n_trx_replay.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn next_stmt(&mut self) -> Option<Vec<u8>> {
        self.saved_trx.pop_stmt()
    }

    /// Step 3: compare a freshly computed checksum to the original recorded
    /// one for the statement just replayed (by position in `saved_trx`'s
    /// original checksum log).
    pub fn check_checksum(&mut self, original: &[u32], new_checksum: u32) -> bool {
        let idx = self.replayed_checksums.len();
        self.replayed_checksums.push(new_checksum);
        original.get(idx).copied() == Some(new_checksum)
    }

    /// Step 4: once the log is exhausted, switch to replaying the
    /// interrupted query if one was captured.
    pub fn finish_log(&mut self) -> Option<Vec<u8>> {
        if self.saved_trx.have_stmts() {
            return None;
        }
        match self.interrupted_query.take() {
            Some(q) => {
                self.state = ReplayState::ReplayingInterrupted;
                Some(q)
            }
            None => {
                self.state = ReplayState::NotReplaying;
                None
            }
        }
    }

    /// How many bytes of the interrupted query's reply the client already
    /// received and must be discarded before forwarding the rest.
    pub fn bytes_to_discard(&self) -> usize {
        self.interrupted_query_bytes_already_sent
    }

    pub fn set_bytes_already_sent(&mut self, bytes: usize) {
        self.interrupted_query_bytes_already_sent = bytes;
    }

    pub fn has_timed_out(&self) -> bool {
        match self.started_at {
            Some(t) => t.elapsed() > self.timeout && !self.timeout.is_zero(),
            None => false,
        }
    }

    pub fn complete(&mut self) {
        self.state = ReplayState::NotReplaying;
        self.saved_trx.close();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn start_refuses_when_unreplayable() {
        let mut replay = ReplaySession::new(5, Duration::from_secs(0), 1024);
        replay.check_size(2048);
        let trx = Trx::default();
        assert!(replay.start(&trx, None).is_err());
    }

    #[test]
    fn start_increments_n_trx_replay_counter() {
        let mut replay = ReplaySession::new(5, Duration::from_secs(0), 1024);
        let trx = Trx::default();
        assert_eq!(replay.n_trx_replay(), 0);
        replay.start(&trx, None).unwrap();
        assert_eq!(replay.n_trx_replay(), 1);
        replay.complete();
        replay.start(&trx, None).unwrap();
        assert_eq!(replay.n_trx_replay(), 2);
    }

    #[test]
    fn start_refuses_past_max_attempts() {
        let mut replay = ReplaySession::new(1, Duration::from_secs(0), 1024);
        let trx = Trx::default();
        assert!(replay.start(&trx, None).is_ok());
        assert!(replay.start(&trx, None).is_err());
    }

    #[test]
    fn checksum_mismatch_is_detected() {
        let mut replay = ReplaySession::new(5, Duration::from_secs(0), 1024);
        let trx = Trx::default();
        replay.start(&trx, None).unwrap();
        let original = [111u32, 222u32];
        assert!(replay.check_checksum(&original, 111));
        assert!(!replay.check_checksum(&original, 999));
    }

    #[test]
    fn finish_log_switches_to_interrupted_query_when_present() {
        let mut replay = ReplaySession::new(5, Duration::from_secs(0), 1024);
        let mut trx = Trx::default();
        trx.add_stmt(1, b"BEGIN".to_vec());
        replay.start(&trx, Some(b"SELECT 1".to_vec())).unwrap();
        replay.next_stmt();
        let interrupted = replay.finish_log();
        assert_eq!(interrupted, Some(b"SELECT 1".to_vec()));
        assert_eq!(replay.state, ReplayState::ReplayingInterrupted);
    }

    #[test]
    fn finish_log_returns_none_and_completes_when_no_interrupted_query() {
        let mut replay = ReplaySession::new(5, Duration::from_secs(0), 1024);
        let trx = Trx::default();
        replay.start(&trx, None).unwrap();
        assert_eq!(replay.finish_log(), None);
        assert_eq!(replay.state, ReplayState::NotReplaying);
    }
}
