//! MariaDB GTID: `(domain_id, server_id, sequence)`, spec.md §3.
//!
//! Distinct from the MySQL-style UUID+GNO GTID form used by native MySQL
//! replication — MariaDB's GTID domain model has no SID, only three plain
//! integers, and the string form is `"d-s-n"` rather than a UUID.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use common::err::decode_error::ReError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MariadbGtid {
    pub domain_id: u32,
    pub server_id: u32,
    pub sequence: u64,
}

impl MariadbGtid {
    pub fn new(domain_id: u32, server_id: u32, sequence: u64) -> Self {
        MariadbGtid {
            domain_id,
            server_id,
            sequence,
        }
    }
}

impl fmt::Display for MariadbGtid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.domain_id, self.server_id, self.sequence)
    }
}

impl FromStr for MariadbGtid {
    type Err = ReError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(3, '-').collect();
        if parts.len() != 3 {
            return Err(ReError::String(format!("malformed GTID string: {}", s)));
        }
        let domain_id = parts[0]
            .parse()
            .map_err(|e| ReError::String(format!("bad GTID domain in {}: {}", s, e)))?;
        let server_id = parts[1]
            .parse()
            .map_err(|e| ReError::String(format!("bad GTID server_id in {}: {}", s, e)))?;
        let sequence = parts[2]
            .parse()
            .map_err(|e| ReError::String(format!("bad GTID sequence in {}: {}", s, e)))?;
        Ok(MariadbGtid::new(domain_id, server_id, sequence))
    }
}

/// Ordering within a single domain only compares by sequence; GTIDs from
/// different domains are incomparable under the replication protocol, so
/// this impl is used only where callers have already filtered by domain
/// (e.g. causal-reads freshness checks, spec.md §4.8).
impl PartialOrd for MariadbGtid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.domain_id != other.domain_id {
            None
        } else {
            Some(self.sequence.cmp(&other.sequence))
        }
    }
}

/// A GTID list: one GTID per domain, the position form used by
/// `GTID_LIST_EVENT` and by `@@gtid_current_pos`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GtidList {
    entries: Vec<MariadbGtid>,
}

impl GtidList {
    pub fn new(entries: Vec<MariadbGtid>) -> Self {
        GtidList { entries }
    }

    pub fn empty() -> Self {
        GtidList::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MariadbGtid> {
        self.entries.iter()
    }

    pub fn get(&self, domain_id: u32) -> Option<&MariadbGtid> {
        self.entries.iter().find(|g| g.domain_id == domain_id)
    }

    /// Insert or update the entry for `gtid`'s domain, spec.md §3's
    /// "write-once per key; subsequent matching rows update" applied to an
    /// in-memory position rather than the on-disk GTID index.
    pub fn update(&mut self, gtid: MariadbGtid) {
        match self.entries.iter_mut().find(|g| g.domain_id == gtid.domain_id) {
            Some(slot) => *slot = gtid,
            None => self.entries.push(gtid),
        }
    }

    /// True if every domain in `self` is at or ahead of the matching domain
    /// in `other` — used by the fast/fast-global causal-reads checks
    /// (spec.md §4.8, §8 "no slave is selected whose observed gtid_pos...").
    pub fn is_at_least(&self, other: &GtidList) -> bool {
        other.entries.iter().all(|want| match self.get(want.domain_id) {
            Some(have) => have.sequence >= want.sequence,
            None => false,
        })
    }
}

impl fmt::Display for GtidList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.entries.iter().map(|g| g.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_and_displays_gtid_string() {
        let gtid: MariadbGtid = "0-1-500".parse().unwrap();
        assert_eq!(gtid, MariadbGtid::new(0, 1, 500));
        assert_eq!(gtid.to_string(), "0-1-500");
    }

    #[test]
    fn rejects_malformed_gtid_string() {
        assert!("0-1".parse::<MariadbGtid>().is_err());
        assert!("a-1-2".parse::<MariadbGtid>().is_err());
    }

    #[test]
    fn gtid_list_update_is_write_once_per_domain() {
        let mut list = GtidList::empty();
        list.update(MariadbGtid::new(0, 1, 100));
        list.update(MariadbGtid::new(1, 1, 50));
        list.update(MariadbGtid::new(0, 1, 101));
        assert_eq!(list.get(0).unwrap().sequence, 101);
        assert_eq!(list.get(1).unwrap().sequence, 50);
    }

    #[test]
    fn is_at_least_checks_every_domain() {
        let mut have = GtidList::empty();
        have.update(MariadbGtid::new(0, 1, 100));
        have.update(MariadbGtid::new(1, 1, 50));

        let mut want = GtidList::empty();
        want.update(MariadbGtid::new(0, 1, 90));
        assert!(have.is_at_least(&want));

        want.update(MariadbGtid::new(1, 1, 999));
        assert!(!have.is_at_least(&want));
    }
}
