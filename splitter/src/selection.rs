//! Slave-selection scoring policies, spec.md §4.7.
//!
//! Grounded in MaxScale's `rwsplit_select_backends.cc` (`best_score`,
//! `backend_cmp_*`): each policy reduces to a score function, the candidate
//! with the minimum score wins, ties break on longest-idle, and an
//! unconnected candidate's score is inflated by `(s+5)*1.5` so already-open
//! connections are preferred.

use std::time::Instant;

use common::config::router_config::SlaveSelectionCriteria;

use crate::backend::{Backend, BackendRole};

fn score(criteria: SlaveSelectionCriteria, b: &Backend) -> f64 {
    match criteria {
        SlaveSelectionCriteria::LeastGlobalConnections => b.global_connections() as f64,
        SlaveSelectionCriteria::LeastRouterConnections => b.router_connections() as f64,
        SlaveSelectionCriteria::LeastBehindMaster => b.replication_lag_secs().unwrap_or(0) as f64,
        SlaveSelectionCriteria::LeastCurrentOperations => b.current_ops() as f64,
        SlaveSelectionCriteria::Adaptive => {
            b.avg_response().as_secs_f64() * (b.current_ops() as f64 + 1.0)
        }
    }
}

fn valid_for_slave(b: &Backend, master_id: Option<u32>) -> bool {
    (b.is_slave() || b.is_relay()) && master_id != Some(b.id)
}

fn rpl_lag_is_ok(b: &Backend, max_rlag: Option<u32>) -> bool {
    match (max_rlag, b.replication_lag_secs()) {
        (None, _) => true,
        (Some(max), Some(lag)) => lag < max,
        (Some(_), None) => true,
    }
}

fn gtid_pos_is_ok(b: &Backend, domain: u32, sequence: u64) -> bool {
    sequence == 0 || b.gtid_pos(domain) >= sequence
}

/// Picks the best slave candidate by `criteria`, filtering by role, rank,
/// optional replication-lag bound and optional GTID freshness (spec.md §4.7
/// rule 5 "slave ⇒ best scoring backend among ... filtered by rank and
/// optional replication-lag and GTID freshness").
pub fn select_slave<'a>(
    backends: &'a [Backend],
    criteria: SlaveSelectionCriteria,
    master_id: Option<u32>,
    max_rlag_secs: Option<u32>,
    min_rank: Option<u32>,
    required_gtid: Option<(u32, u64)>,
) -> Option<&'a Backend> {
    let candidates: Vec<&Backend> = backends
        .iter()
        .filter(|b| valid_for_slave(b, master_id))
        .filter(|b| rpl_lag_is_ok(b, max_rlag_secs))
        .filter(|b| min_rank.map_or(true, |r| b.rank <= r))
        .filter(|b| match required_gtid {
            Some((domain, seq)) => gtid_pos_is_ok(b, domain, seq),
            None => true,
        })
        .collect();

    best_score(&candidates, criteria)
}

fn best_score<'a>(candidates: &[&'a Backend], criteria: SlaveSelectionCriteria) -> Option<&'a Backend> {
    let now = Instant::now();
    let mut best: Option<&Backend> = None;
    let mut min = f64::MAX;

    for &b in candidates {
        let mut s = score(criteria, b);
        if !b.in_use() {
            s = (s + 5.0) * 1.5;
        }

        match best {
            None => {
                min = s;
                best = Some(b);
            }
            Some(cur) => {
                if s < min {
                    min = s;
                    best = Some(b);
                } else if (s - min).abs() < f64::EPSILON {
                    // tie: prefer the backend that has been idle longest.
                    let cur_idle = cur
                        .last_write_elapsed(now)
                        .unwrap_or(std::time::Duration::MAX);
                    let b_idle = b.last_write_elapsed(now).unwrap_or(std::time::Duration::MAX);
                    if b_idle > cur_idle {
                        best = Some(b);
                    }
                }
            }
        }
    }

    best
}

/// Backend priority for plain slave routing without a scoring policy, spec
/// source's `get_backend_priority`: idle slave-role backends first, idle
/// masters-accepting-reads second, busy slave-role backends last.
pub fn backend_priority(b: &Backend, master_accepts_reads: bool) -> u8 {
    let acts_slave = b.is_slave() || (b.role == BackendRole::Master && master_accepts_reads);
    let busy = b.in_use() && b.pending_response();

    if acts_slave {
        if busy {
            2
        } else {
            0
        }
    } else {
        1
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn slave(id: u32, current_ops: u32) -> Backend {
        let mut b = Backend::new(id, format!("s{id}"), BackendRole::Slave, 1);
        for _ in 0..current_ops {
            b.begin_operation();
        }
        b
    }

    #[test]
    fn least_current_operations_picks_idlest() {
        let backends = vec![slave(1, 3), slave(2, 1), slave(3, 5)];
        let best = select_slave(
            &backends,
            SlaveSelectionCriteria::LeastCurrentOperations,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn replication_lag_filter_excludes_too_far_behind() {
        let mut a = slave(1, 0);
        a.set_replication_lag_secs(Some(50));
        let mut b = slave(2, 0);
        b.set_replication_lag_secs(Some(2));
        let backends = vec![a, b];
        let best = select_slave(
            &backends,
            SlaveSelectionCriteria::LeastCurrentOperations,
            None,
            Some(10),
            None,
            None,
        )
        .unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn gtid_freshness_filter_excludes_stale_slave() {
        let mut a = slave(1, 0);
        a.set_gtid_pos(0, 5);
        let mut b = slave(2, 0);
        b.set_gtid_pos(0, 100);
        let backends = vec![a, b];
        let best = select_slave(
            &backends,
            SlaveSelectionCriteria::LeastCurrentOperations,
            None,
            None,
            None,
            Some((0, 50)),
        )
        .unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn unconnected_candidates_are_penalized_over_connected_ones() {
        let mut connected = slave(1, 2);
        connected.mark_in_use();
        let unconnected = slave(2, 0);
        let backends = vec![connected, unconnected];
        let best = select_slave(
            &backends,
            SlaveSelectionCriteria::LeastCurrentOperations,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(best.id, 1);
    }

    #[test]
    fn master_is_excluded_from_slave_candidates() {
        let master = Backend::new(9, "m", BackendRole::Master, 1);
        let s = slave(1, 0);
        let backends = vec![master, s];
        let best = select_slave(
            &backends,
            SlaveSelectionCriteria::LeastCurrentOperations,
            Some(9),
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(best.id, 1);
    }

    #[test]
    fn backend_priority_ranks_idle_slave_above_busy_slave_above_non_accepting_master() {
        let idle_slave = slave(1, 0);
        let mut busy_slave = slave(2, 1);
        busy_slave.mark_in_use();
        let master = Backend::new(3, "m", BackendRole::Master, 1);

        assert_eq!(backend_priority(&idle_slave, false), 0);
        assert_eq!(backend_priority(&busy_slave, false), 2);
        assert_eq!(backend_priority(&master, false), 1);
        let _ = Duration::from_secs(0);
    }
}
