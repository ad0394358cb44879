//! Route planner, spec.md §4.7. Grounded in `rwsplit_route_stmt.cc`'s
//! `RWSplitSession::route_stmt` branch order.

use common::config::router_config::SlaveSelectionCriteria;

use crate::backend::Backend;
use crate::route_info::{RouteInfo, RouteTarget};
use crate::selection::select_slave;
use crate::trx::{ExecInfo, Trx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanType {
    Normal,
    OtrxStart,
    OtrxEnd,
}

#[derive(Debug, Clone)]
pub struct RoutingPlan {
    pub route_target: RouteTarget,
    pub target_backend: Option<u32>,
    pub plan_type: PlanType,
}

pub struct PlannerInput<'a> {
    pub route_info: &'a RouteInfo,
    pub trx: &'a Trx,
    pub exec_info: &'a ExecInfo,
    pub last_plan_target: Option<u32>,
    pub master_id: Option<u32>,
    pub backends: &'a [Backend],
    pub slave_selection_criteria: SlaveSelectionCriteria,
    pub max_replication_lag_secs: Option<u32>,
    pub optimistic_trx_enabled: bool,
    pub in_optimistic_trx: bool,
    pub master_usable: bool,
    pub required_gtid: Option<(u32, u64)>,
    /// Backend a `CREATE TEMPORARY TABLE` this session still has open is
    /// pinned to, resolved by the caller via `session::TempTableTracker`
    /// (temp tables exist only on the backend that created them).
    pub temp_table_pin: Option<u32>,
    /// Backend the client-visible prepared-statement id in this packet is
    /// actually prepared on, resolved by the caller via `ps::PsIdMap`.
    pub ps_known_backend: Option<u32>,
}

/// Produces a `RoutingPlan` for one packet, following spec.md §4.7's
/// priority-ordered rules 1-5.
pub fn plan_route(input: &PlannerInput) -> RoutingPlan {
    let ri = input.route_info;

    // Rule 1: multi-part packet continuations always follow the same target.
    if ri.multi_part_packet {
        return RoutingPlan {
            route_target: RouteTarget::LastUsed,
            target_backend: input.last_plan_target,
            plan_type: PlanType::Normal,
        };
    }

    // A temporary table this session owns only exists on the backend that
    // created it; pin routing there regardless of what the classifier hints,
    // overriding everything below but never the multi-part continuation rule.
    if let Some(pinned) = input.temp_table_pin {
        return RoutingPlan {
            route_target: ri.target_hint,
            target_backend: Some(pinned),
            plan_type: PlanType::Normal,
        };
    }

    // Rule 2: inside an optimistic transaction.
    if input.in_optimistic_trx {
        let plan_type = if ri.is_trx_ending || !ri.is_read_only {
            PlanType::OtrxEnd
        } else {
            PlanType::Normal
        };
        return RoutingPlan {
            route_target: RouteTarget::LastUsed,
            target_backend: input.last_plan_target,
            plan_type,
        };
    }

    // Rule 3: an ordinary transaction starting, read-only, with optimistic_trx on.
    if ri.is_trx_starting && ri.is_read_only && input.optimistic_trx_enabled {
        let target = select_slave(
            input.backends,
            input.slave_selection_criteria,
            input.master_id,
            input.max_replication_lag_secs,
            None,
            input.required_gtid,
        )
        .map(|b| b.id);
        return RoutingPlan {
            route_target: RouteTarget::Slave,
            target_backend: target,
            plan_type: PlanType::OtrxStart,
        };
    }

    // Rule 4/5: the classifier's route_target stands, resolved to a concrete backend.
    let route_target = ri.target_hint;
    let target_backend = if route_target == RouteTarget::All {
        None
    } else {
        resolve_target(input, route_target)
    };

    RoutingPlan {
        route_target,
        target_backend,
        plan_type: PlanType::Normal,
    }
}

fn resolve_target(input: &PlannerInput, route_target: RouteTarget) -> Option<u32> {
    let ri = input.route_info;

    // An open transaction on a still-valid backend takes precedence, unless
    // we're mid-GTID-sync (modeled by the caller omitting `required_gtid`
    // resolution at that point — see `causal_reads`).
    if let Some(t) = input.trx.target() {
        if input.backends.iter().any(|b| b.id == t) {
            return Some(t);
        }
    }

    if ri.is_ps_continuation {
        if let Some(id) = input.ps_known_backend {
            return Some(id);
        }
        if let Some(id) = ri.stmt_id.and_then(|id| input.exec_info.lookup(id)) {
            return Some(id);
        }
    }

    match route_target {
        RouteTarget::Named | RouteTarget::RlagMax => select_slave(
            input.backends,
            input.slave_selection_criteria,
            input.master_id,
            input.max_replication_lag_secs,
            None,
            input.required_gtid,
        )
        .map(|b| b.id),
        RouteTarget::LastUsed => input.last_plan_target.or(input.master_id),
        RouteTarget::Slave => select_slave(
            input.backends,
            input.slave_selection_criteria,
            input.master_id,
            input.max_replication_lag_secs,
            None,
            input.required_gtid,
        )
        .map(|b| b.id),
        RouteTarget::Master => {
            if input.master_usable {
                input.master_id
            } else {
                None
            }
        }
        RouteTarget::All => None,
    }
}
