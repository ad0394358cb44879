//! Binlog router instance state, spec.md §3 "Router instance state".

use std::collections::VecDeque;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use binlog::mariadb::gtid::GtidList;

use crate::fsm::MasterState;

/// Linear backoff bounded by `retry_interval`, spec.md §4.3 / §9.2.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    pub attempts: u32,
    pub base: Duration,
    pub ceiling: Duration,
}

impl ReconnectBackoff {
    pub fn new(ceiling: Duration) -> Self {
        ReconnectBackoff {
            attempts: 0,
            base: Duration::from_secs(1),
            ceiling,
        }
    }

    /// Delay before the next attempt; grows linearly with `attempts`,
    /// capped at `ceiling`.
    pub fn next_delay(&mut self) -> Duration {
        self.attempts += 1;
        let linear = self.base * self.attempts;
        linear.min(self.ceiling)
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

/// One bucket of the 30-minute event-count stats ring, spec.md §4.5 step 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsBucket {
    pub events: u64,
    pub bytes: u64,
}

/// Rolling 30-minute ring of per-minute event/byte counters.
#[derive(Debug, Clone)]
pub struct StatsRing {
    buckets: VecDeque<StatsBucket>,
    capacity: usize,
}

impl StatsRing {
    pub fn new() -> Self {
        let capacity = 30;
        StatsRing {
            buckets: VecDeque::from(vec![StatsBucket::default(); capacity]),
            capacity,
        }
    }

    /// Advances to a fresh minute bucket, dropping the oldest.
    pub fn tick(&mut self) {
        if self.buckets.len() >= self.capacity {
            self.buckets.pop_front();
        }
        self.buckets.push_back(StatsBucket::default());
    }

    pub fn record(&mut self, event_bytes: u64) {
        if let Some(last) = self.buckets.back_mut() {
            last.events += 1;
            last.bytes += event_bytes;
        }
    }

    pub fn total_events(&self) -> u64 {
        self.buckets.iter().map(|b| b.events).sum()
    }
}

impl Default for StatsRing {
    fn default() -> Self {
        StatsRing::new()
    }
}

/// All mutable state the binlog router keeps for its upstream master
/// connection: current file/position, FSM state, GTID position and
/// reconnect bookkeeping.
#[derive(Debug, Clone)]
pub struct MasterInstance {
    pub state: MasterState,
    pub current_file: String,
    pub binlog_position: u64,
    pub current_pos: u64,
    pub last_mariadb_gtid: GtidList,
    pub last_reply: Option<std::time::Instant>,
    pub backoff: ReconnectBackoff,
    pub stats: StatsRing,
    /// Count of events whose CRC32 trailer failed to verify, spec.md §4.4.
    /// `Arc` rather than a bare atomic so `MasterInstance` stays `Clone`.
    pub n_badcrc: Arc<AtomicU64>,
}

impl MasterInstance {
    pub fn new(starting_file: String, starting_pos: u64, retry_interval: Duration) -> Self {
        MasterInstance {
            state: MasterState::Unconnected,
            current_file: starting_file,
            binlog_position: starting_pos,
            current_pos: starting_pos,
            last_mariadb_gtid: GtidList::empty(),
            last_reply: None,
            backoff: ReconnectBackoff::new(retry_interval),
            stats: StatsRing::new(),
            n_badcrc: Arc::new(AtomicU64::new(0)),
        }
    }
}
