//! Scenario 4 (spec.md §8): `causal_reads=local`, a blocked slave, and a
//! timed-out `MASTER_GTID_WAIT` re-routes to the master outside a
//! transaction but returns 1792/25006 inside a read-only one — chaining
//! `splitter::selection` (candidate filtering) with `splitter::causal_reads`
//! (wait/timeout policy) the way the dispatcher actually would.

use common::config::router_config::{CausalReadsMode, SlaveSelectionCriteria};
use splitter::backend::{Backend, BackendRole};
use splitter::causal_reads::{on_wait_timeout, plan_causal_read, CausalReadAction, CausalReadsInput};
use splitter::selection::select_slave;

fn blocked_slave() -> Backend {
    let mut b = Backend::new(1, "slave1".to_string(), BackendRole::Slave, 1);
    b.set_gtid_pos(0, 1); // far behind the session's required sequence
    b
}

#[test]
fn no_fresh_slave_under_fast_mode_routes_to_master() {
    let backends = vec![blocked_slave()];
    let candidate = select_slave(
        &backends,
        SlaveSelectionCriteria::LeastCurrentOperations,
        None,
        None,
        None,
        Some((0, 50)), // session requires gtid_pos[0] >= 50; slave is at 1
    );
    assert!(candidate.is_none());

    let input = CausalReadsInput {
        mode: CausalReadsMode::Fast,
        timeout_secs: 1,
        session_gtid: "0-1-50".to_string(),
        session_gtid_domain: 0,
        session_gtid_sequence: 50,
        is_ps_execute: false,
        in_read_only_trx: false,
        universal_probe_done: false,
    };
    let action = plan_causal_read(&input, candidate.map(|b| b.id));
    assert_eq!(action, CausalReadAction::RouteToMaster);
}

#[test]
fn wait_timeout_outside_trx_reroutes_to_master() {
    assert_eq!(on_wait_timeout(false), CausalReadAction::RouteToMaster);
}

#[test]
fn wait_timeout_inside_read_only_trx_does_not_reroute() {
    // The dispatcher maps this action to the 1792/25006 client error instead
    // of silently retrying anywhere.
    assert_eq!(on_wait_timeout(true), CausalReadAction::ErrorReadOnlyTrxTimeout);
}
