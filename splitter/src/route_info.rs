//! Per-packet route info from the (external) query classifier, spec.md §3,
//! supplemented from `routeinfo.cc`/`routeinfo.hh` per SPEC_FULL §7E: the
//! raw command byte and type-mask bitfield are kept as typed values
//! (`MySqlCommand`, `QueryTypeMask`) instead of opaque integers, since
//! several route-planner rules key off individual type-mask bits.

use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Master,
    Slave,
    Named,
    All,
    LastUsed,
    RlagMax,
}

/// MySQL wire-protocol command byte, spec.md §6 "Specifically supported
/// commands". `Unknown` covers anything not explicitly named there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MySqlCommand {
    Query,
    RegisterSlave,
    BinlogDump,
    Statistics,
    Ping,
    StmtPrepare,
    StmtExecute,
    StmtFetch,
    StmtClose,
    StmtSendLongData,
    Quit,
    Unknown(u8),
}

impl From<u8> for MySqlCommand {
    fn from(b: u8) -> Self {
        match b {
            0x03 => MySqlCommand::Query,
            0x0e => MySqlCommand::Ping,
            0x01 => MySqlCommand::Quit,
            0x09 => MySqlCommand::Statistics,
            0x12 => MySqlCommand::RegisterSlave,
            0x16 => MySqlCommand::StmtPrepare,
            0x17 => MySqlCommand::StmtExecute,
            0x18 => MySqlCommand::StmtSendLongData,
            0x19 => MySqlCommand::StmtClose,
            0x1c => MySqlCommand::StmtFetch,
            0x1e => MySqlCommand::BinlogDump,
            other => MySqlCommand::Unknown(other),
        }
    }
}

bitflags! {
    /// The classifier's `QUERY_TYPE_*` bitfield, named in SPEC_FULL §7E as a
    /// supplement to spec.md §3's single `type-mask` field — several
    /// route-planner rules (causal reads, session-command detection) key
    /// off individual bits rather than one hint enum.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QueryTypeMask: u32 {
        const MASTER_READ   = 0b0000_0001;
        const USERVAR_READ  = 0b0000_0010;
        const SYSVAR_READ   = 0b0000_0100;
        const SESSION_WRITE = 0b0000_1000;
        const READ          = 0b0001_0000;
        const WRITE         = 0b0010_0000;
        const BEGIN_TRX     = 0b0100_0000;
        const COMMIT        = 0b1000_0000;
    }
}

/// What the classifier told the splitter about one incoming packet.
/// `RouteInfo` itself carries no policy; the planner in `plan.rs` combines it
/// with session state.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub command: MySqlCommand,
    pub type_mask: QueryTypeMask,
    pub target_hint: RouteTarget,
    pub stmt_id: Option<u32>,
    pub is_trx_starting: bool,
    pub is_trx_active: bool,
    pub is_trx_ending: bool,
    pub is_read_only: bool,
    pub load_data_active: bool,
    pub multi_part_packet: bool,
    pub is_ps_continuation: bool,
}

impl RouteInfo {
    pub fn new(command: u8, target_hint: RouteTarget) -> Self {
        RouteInfo {
            command: MySqlCommand::from(command),
            type_mask: QueryTypeMask::empty(),
            target_hint,
            stmt_id: None,
            is_trx_starting: false,
            is_trx_active: false,
            is_trx_ending: false,
            is_read_only: false,
            load_data_active: false,
            multi_part_packet: false,
            is_ps_continuation: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn command_byte_maps_to_named_variant() {
        assert_eq!(MySqlCommand::from(0x03), MySqlCommand::Query);
        assert_eq!(MySqlCommand::from(0x1e), MySqlCommand::BinlogDump);
        assert_eq!(MySqlCommand::from(0xaa), MySqlCommand::Unknown(0xaa));
    }

    #[test]
    fn type_mask_bits_compose() {
        let mask = QueryTypeMask::MASTER_READ | QueryTypeMask::USERVAR_READ;
        assert!(mask.contains(QueryTypeMask::MASTER_READ));
        assert!(!mask.contains(QueryTypeMask::WRITE));
    }
}
