//! Read/write splitting router: route planner, slave selection, causal
//! reads, session-command dispatch, and transaction replay, spec.md §4.7-§4.10.

pub mod backend;
pub mod causal_reads;
pub mod dispatch;
pub mod error;
pub mod plan;
pub mod ps;
pub mod replay;
pub mod route_info;
pub mod selection;
pub mod session;
pub mod trx;
