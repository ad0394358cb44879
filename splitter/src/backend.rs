//! Backend handle, spec.md §3 "Read/write splitter — Backend".

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendRole {
    Master,
    Slave,
    Relay,
}

/// A handle on a connection to one upstream server. The splitter never owns
/// the wire connection itself (that's `connection`'s job); this carries only
/// the scoring/bookkeeping state the route planner and dispatcher need.
#[derive(Debug, Clone)]
pub struct Backend {
    pub id: u32,
    pub name: String,
    pub role: BackendRole,
    pub rank: u32,
    in_use: bool,
    current_ops: u32,
    global_connections: u32,
    router_connections: u32,
    avg_response: Duration,
    replication_lag_secs: Option<u32>,
    gtid_pos: std::collections::HashMap<u32, u64>,
    last_write: Option<Instant>,
    pending_response: bool,
    pub session_cmd_cursor: u64,
}

impl Backend {
    pub fn new(id: u32, name: impl Into<String>, role: BackendRole, rank: u32) -> Self {
        Backend {
            id,
            name: name.into(),
            role,
            rank,
            in_use: false,
            current_ops: 0,
            global_connections: 0,
            router_connections: 0,
            avg_response: Duration::from_millis(0),
            replication_lag_secs: None,
            gtid_pos: std::collections::HashMap::new(),
            last_write: None,
            pending_response: false,
            session_cmd_cursor: 0,
        }
    }

    pub fn is_slave(&self) -> bool {
        self.role == BackendRole::Slave
    }

    pub fn is_relay(&self) -> bool {
        self.role == BackendRole::Relay
    }

    pub fn is_master(&self) -> bool {
        self.role == BackendRole::Master
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn mark_in_use(&mut self) {
        self.in_use = true;
    }

    pub fn mark_closed(&mut self) {
        self.in_use = false;
        self.pending_response = false;
        self.current_ops = 0;
    }

    pub fn begin_operation(&mut self) {
        self.current_ops += 1;
        self.pending_response = true;
    }

    pub fn finish_operation(&mut self, elapsed: Duration) {
        self.current_ops = self.current_ops.saturating_sub(1);
        self.pending_response = false;
        // exponential moving average, same smoothing the teacher's existing
        // stats ring uses for event rates.
        self.avg_response = (self.avg_response + elapsed) / 2;
        self.last_write = Some(Instant::now());
    }

    pub fn pending_response(&self) -> bool {
        self.pending_response
    }

    pub fn last_write_elapsed(&self, now: Instant) -> Option<Duration> {
        self.last_write.map(|t| now.saturating_duration_since(t))
    }

    pub fn set_replication_lag_secs(&mut self, lag: Option<u32>) {
        self.replication_lag_secs = lag;
    }

    pub fn replication_lag_secs(&self) -> Option<u32> {
        self.replication_lag_secs
    }

    pub fn set_gtid_pos(&mut self, domain: u32, sequence: u64) {
        self.gtid_pos.insert(domain, sequence);
    }

    pub fn gtid_pos(&self, domain: u32) -> u64 {
        *self.gtid_pos.get(&domain).unwrap_or(&0)
    }

    pub fn current_ops(&self) -> u32 {
        self.current_ops
    }

    pub fn avg_response(&self) -> Duration {
        self.avg_response
    }

    pub fn global_connections(&self) -> u32 {
        self.global_connections
    }

    pub fn router_connections(&self) -> u32 {
        self.router_connections
    }

    pub fn set_connection_counts(&mut self, global: u32, router: u32) {
        self.global_connections = global;
        self.router_connections = router;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn begin_and_finish_operation_tracks_pending_and_ops() {
        let mut b = Backend::new(1, "slave1", BackendRole::Slave, 1);
        assert!(!b.pending_response());
        b.begin_operation();
        assert_eq!(b.current_ops(), 1);
        assert!(b.pending_response());
        b.finish_operation(Duration::from_millis(10));
        assert_eq!(b.current_ops(), 0);
        assert!(!b.pending_response());
    }

    #[test]
    fn gtid_pos_defaults_to_zero_for_unseen_domain() {
        let mut b = Backend::new(2, "slave2", BackendRole::Slave, 1);
        assert_eq!(b.gtid_pos(0), 0);
        b.set_gtid_pos(0, 42);
        assert_eq!(b.gtid_pos(0), 42);
    }
}
