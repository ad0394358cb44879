//! Session command fan-out and pipelining rules, spec.md §4.8. Grounded in
//! `rwsplit_session_cmd.cc`'s `route_session_write`.

use std::time::Duration;

use crate::backend::Backend;

/// A statement whose effect persists across subsequent queries on the same
/// session (`SET`, `USE`, ...). Routed to every in-use backend; retried
/// against a backend if it reconnects later.
#[derive(Debug, Clone)]
pub struct SessionCommand {
    pub buffer: Vec<u8>,
    pub sequence: u64,
}

/// Plans a session command's fan-out: which backends receive it now, which
/// one's reply the client sees, and whether a new master connection must be
/// opened first (spec.md §4.8 "if none open and `master_reconnection`
/// allows, open one").
pub struct SessionCommandPlan {
    pub targets: Vec<u32>,
    pub replier: Option<u32>,
    pub needs_new_master_connection: bool,
}

pub fn plan_session_command(
    backends: &[Backend],
    master_id: Option<u32>,
    master_accept_reads: bool,
    requires_master: bool,
    master_reconnection: bool,
) -> SessionCommandPlan {
    let in_use: Vec<u32> = backends.iter().filter(|b| b.in_use()).map(|b| b.id).collect();

    if in_use.is_empty() {
        return if master_reconnection && (master_accept_reads || requires_master) {
            SessionCommandPlan {
                targets: master_id.into_iter().collect(),
                replier: master_id,
                needs_new_master_connection: true,
            }
        } else {
            SessionCommandPlan {
                targets: Vec::new(),
                replier: None,
                needs_new_master_connection: false,
            }
        };
    }

    let replier = if master_id.is_some() && in_use.contains(&master_id.unwrap()) {
        master_id
    } else {
        in_use.first().copied()
    };

    SessionCommandPlan {
        targets: in_use,
        replier,
        needs_new_master_connection: false,
    }
}

/// spec.md §4.8 "Concurrent pipelining": only allowed when the next packet
/// is a normal master-targeted read whose target matches the previous
/// plan's, no transaction is active, no GTID sync is in progress, and
/// transaction_replay is off or no transaction is open.
pub struct PipeliningCheck {
    pub same_target_as_previous: bool,
    pub trx_active: bool,
    pub gtid_sync_in_progress: bool,
    pub transaction_replay_enabled: bool,
    pub trx_open: bool,
    pub is_normal_master_read: bool,
}

pub fn can_pipeline(check: &PipeliningCheck) -> bool {
    check.is_normal_master_read
        && check.same_target_as_previous
        && !check.trx_active
        && !check.gtid_sync_in_progress
        && (!check.transaction_replay_enabled || !check.trx_open)
}

/// Per-reply bookkeeping, spec.md §4.8 last bullet: decrement the pending
/// counter, fold the elapsed time into the backend's average, and report
/// whether `current_query` must be retained (it must, whenever the owning
/// transaction is still open, for transaction replay's captured log).
pub fn on_reply_complete(backend: &mut Backend, elapsed: Duration, trx_open: bool) -> bool {
    backend.finish_operation(elapsed);
    trx_open
}
