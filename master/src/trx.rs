//! Pending-transaction tracking on the binlog master side, spec.md §3
//! "Pending transaction", §4.5 "Transaction tracking".

use binlog::mariadb::gtid::MariadbGtid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrxState {
    None,
    Started,
    Committed,
    XidSeen,
    StandaloneSeen,
}

#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub state: TrxState,
    pub start_pos: u64,
    pub end_pos: u64,
    pub gtid: Option<MariadbGtid>,
    pub standalone_flag: bool,
}

impl Default for PendingTransaction {
    fn default() -> Self {
        PendingTransaction {
            state: TrxState::None,
            start_pos: 0,
            end_pos: 0,
            gtid: None,
            standalone_flag: false,
        }
    }
}

impl PendingTransaction {
    /// A `MARIADB10 GTID` event opens the transaction and records its key;
    /// `standalone` comes from the event's own flag (spec.md §4.5 step 5).
    pub fn open_gtid(&mut self, pos: u64, gtid: MariadbGtid, standalone: bool) {
        self.state = TrxState::Started;
        self.start_pos = pos;
        self.gtid = Some(gtid);
        self.standalone_flag = standalone;
        if standalone {
            self.state = TrxState::StandaloneSeen;
        }
    }

    /// `QUERY` payload `BEGIN` / `START TRANSACTION`.
    pub fn open_query(&mut self, pos: u64) {
        self.state = TrxState::Started;
        self.start_pos = pos;
    }

    /// `QUERY` payload `COMMIT`.
    pub fn mark_commit_seen(&mut self) {
        self.state = TrxState::Committed;
    }

    /// `XID_EVENT`: transactional commit.
    pub fn mark_xid_seen(&mut self, pos: u64) {
        self.state = TrxState::XidSeen;
        self.end_pos = pos;
    }

    /// True once the transaction's closing condition is met: standalone
    /// statements close immediately, others close on commit/xid.
    pub fn is_closed(&self) -> bool {
        matches!(
            self.state,
            TrxState::Committed | TrxState::XidSeen | TrxState::StandaloneSeen
        )
    }

    /// Resets to `none` after the closed transaction has been durably
    /// promoted (spec.md §4.5 step 6).
    pub fn close(&mut self, end_pos: u64) -> PendingTransaction {
        self.end_pos = end_pos;
        let closed = self.clone();
        *self = PendingTransaction::default();
        closed
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn standalone_gtid_closes_without_commit() {
        let mut trx = PendingTransaction::default();
        trx.open_gtid(100, MariadbGtid::new(0, 1, 5), true);
        assert!(trx.is_closed());
    }

    #[test]
    fn query_begin_then_commit_closes() {
        let mut trx = PendingTransaction::default();
        trx.open_query(100);
        assert!(!trx.is_closed());
        trx.mark_commit_seen();
        assert!(trx.is_closed());
    }

    #[test]
    fn close_resets_to_default() {
        let mut trx = PendingTransaction::default();
        trx.open_query(10);
        trx.mark_xid_seen(50);
        let closed = trx.close(54);
        assert_eq!(closed.end_pos, 54);
        assert_eq!(trx.state, TrxState::None);
    }
}
