//! Causal-reads coordinator, spec.md §4.8. Grounded in
//! `rwsplit_causal_reads.cc`'s mode dispatch.

use common::config::router_config::CausalReadsMode;

/// What the dispatcher should do before/instead of routing a read to a slave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CausalReadAction {
    /// No synchronization needed; route normally.
    None,
    /// Prepend `MASTER_GTID_WAIT(gtid, timeout)` to the query as a
    /// multi-statement before sending to `slave`.
    WaitThenRoute { slave: u32, gtid: String, timeout_secs: u64 },
    /// For `COM_STMT_EXECUTE`, issue `IF MASTER_GTID_WAIT(...) <> 0 THEN KILL
    /// CONNECTION_ID(); END IF` ahead of the execute.
    WaitThenKillOnTimeout { slave: u32, gtid: String, timeout_secs: u64 },
    /// The session's GTID horizon must first be read from the master via
    /// `SELECT @@gtid_current_pos` (universal/fast-universal modes).
    ProbeMasterGtidFirst,
    /// No slave currently satisfies the session's observed GTID; route to
    /// master instead.
    RouteToMaster,
    /// `MASTER_GTID_WAIT` timed out while the session is inside a read-only
    /// transaction; re-routing would start a second transaction on a
    /// different backend mid-trx, so the client gets 1792/25006 instead.
    ErrorReadOnlyTrxTimeout,
}

pub struct CausalReadsInput {
    pub mode: CausalReadsMode,
    pub timeout_secs: u64,
    pub session_gtid: String,
    pub session_gtid_domain: u32,
    pub session_gtid_sequence: u64,
    pub is_ps_execute: bool,
    pub in_read_only_trx: bool,
    pub universal_probe_done: bool,
}

/// Decides what, if anything, must happen before a read is allowed to run
/// on `candidate_slave` (or `None` if no slave currently qualifies under a
/// `fast*` mode's GTID-freshness check, which the caller performs via
/// `selection::select_slave`'s `required_gtid` filter before calling this).
pub fn plan_causal_read(input: &CausalReadsInput, candidate_slave: Option<u32>) -> CausalReadAction {
    match input.mode {
        CausalReadsMode::None => CausalReadAction::None,

        CausalReadsMode::Fast | CausalReadsMode::FastGlobal => match candidate_slave {
            Some(_) => CausalReadAction::None,
            None => CausalReadAction::RouteToMaster,
        },

        CausalReadsMode::Universal | CausalReadsMode::FastUniversal if !input.universal_probe_done => {
            CausalReadAction::ProbeMasterGtidFirst
        }

        CausalReadsMode::FastUniversal => match candidate_slave {
            Some(_) => CausalReadAction::None,
            None => CausalReadAction::RouteToMaster,
        },

        CausalReadsMode::Local | CausalReadsMode::Global | CausalReadsMode::Universal => {
            let Some(slave) = candidate_slave else {
                return CausalReadAction::RouteToMaster;
            };
            if input.is_ps_execute {
                CausalReadAction::WaitThenKillOnTimeout {
                    slave,
                    gtid: input.session_gtid.clone(),
                    timeout_secs: input.timeout_secs,
                }
            } else {
                CausalReadAction::WaitThenRoute {
                    slave,
                    gtid: input.session_gtid.clone(),
                    timeout_secs: input.timeout_secs,
                }
            }
        }
    }
}

/// On a `MASTER_GTID_WAIT` timeout: re-route to master, unless inside a
/// read-only transaction where the session instead gets 1792/25006 (spec.md
/// §4.8, scenario 4).
pub fn on_wait_timeout(in_read_only_trx: bool) -> CausalReadAction {
    if in_read_only_trx {
        CausalReadAction::ErrorReadOnlyTrxTimeout
    } else {
        CausalReadAction::RouteToMaster
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn input(mode: CausalReadsMode) -> CausalReadsInput {
        CausalReadsInput {
            mode,
            timeout_secs: 1,
            session_gtid: "0-1-7".to_string(),
            session_gtid_domain: 0,
            session_gtid_sequence: 7,
            is_ps_execute: false,
            in_read_only_trx: false,
            universal_probe_done: false,
        }
    }

    #[test]
    fn local_mode_waits_then_routes_to_candidate() {
        let action = plan_causal_read(&input(CausalReadsMode::Local), Some(5));
        assert_eq!(
            action,
            CausalReadAction::WaitThenRoute {
                slave: 5,
                gtid: "0-1-7".to_string(),
                timeout_secs: 1
            }
        );
    }

    #[test]
    fn fast_mode_with_no_fresh_slave_routes_to_master() {
        let action = plan_causal_read(&input(CausalReadsMode::Fast), None);
        assert_eq!(action, CausalReadAction::RouteToMaster);
    }

    #[test]
    fn universal_mode_probes_master_gtid_before_first_use() {
        let action = plan_causal_read(&input(CausalReadsMode::Universal), Some(5));
        assert_eq!(action, CausalReadAction::ProbeMasterGtidFirst);
    }

    #[test]
    fn ps_execute_uses_kill_on_timeout_variant() {
        let mut inp = input(CausalReadsMode::Global);
        inp.is_ps_execute = true;
        let action = plan_causal_read(&inp, Some(2));
        assert_eq!(
            action,
            CausalReadAction::WaitThenKillOnTimeout {
                slave: 2,
                gtid: "0-1-7".to_string(),
                timeout_secs: 1
            }
        );
    }

    #[test]
    fn timeout_inside_read_only_trx_does_not_reroute() {
        assert_eq!(on_wait_timeout(true), CausalReadAction::ErrorReadOnlyTrxTimeout);
        assert_eq!(on_wait_timeout(false), CausalReadAction::RouteToMaster);
    }
}
