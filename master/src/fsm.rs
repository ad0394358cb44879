//! Binlog master handshake state machine, spec.md §4.3.
//!
//! Each state sends one SQL or protocol packet and advances on a single
//! successful reply; an error anywhere except `GtidMode` (the master may
//! lack GTID support) and `BinlogDump` tears the connection down for
//! reconnect with linear backoff (see [`crate::instance::ReconnectBackoff`]).
//! The machine never re-enters a state without a fresh connection, so it is
//! modeled as a plain linear walk rather than a general graph.

use std::fmt;

/// One step of the handshake dialogue. Maxwell-compat and semi-sync steps
/// are real states, not placeholders: spec.md's supplemental notes keep
/// them as first-class FSM states even though they're conditionally
/// skipped (see SPEC_FULL.md "Maxwell-compat extra FSM states").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MasterState {
    Unconnected,
    Authenticated,
    Timestamp,
    ServerId,
    HbPeriod,
    Chksum1,
    Chksum2,
    Mariadb10,
    Mariadb10GtidDomain,
    Mariadb10RequestGtid,
    GtidStrict,
    GtidNoDup,
    GtidMode,
    Muuid,
    Suuid,
    Latin1,
    Utf8,
    ResultsCharset,
    SqlMode,
    Select1,
    SelectVer,
    SelectVerCom,
    SelectHostname,
    Map,
    ServerVars,
    BinlogVars,
    LowerCaseTables,
    RegisterReady,
    Register,
    CheckSemisync,
    RequestSemisync,
    RequestBinlogDump,
    BinlogDump,
    /// Terminal: connection torn down, reconnect scheduled.
    Failed,
}

impl fmt::Display for MasterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Whether an error response in `state` is survivable (the dialogue simply
/// continues without that optional capability) or fatal (reconnect).
pub fn error_is_tolerated(state: MasterState) -> bool {
    matches!(state, MasterState::GtidMode | MasterState::BinlogDump)
}

/// The state reached after a successful reply in `state`, given whether
/// this session uses MariaDB10 GTID mode (`mariadb10_compatibility` and
/// `mariadb10_master_gtid`), wants heartbeats, and wants semi-sync.
pub fn next_state(
    state: MasterState,
    mariadb10: bool,
    mariadb10_gtid: bool,
    send_heartbeat: bool,
    maxwell_compat: bool,
    semisync: bool,
) -> MasterState {
    use MasterState::*;
    match state {
        Unconnected => Authenticated,
        Authenticated => Timestamp,
        Timestamp => ServerId,
        ServerId => {
            if send_heartbeat {
                HbPeriod
            } else {
                Chksum1
            }
        }
        HbPeriod => Chksum1,
        Chksum1 => Chksum2,
        Chksum2 => {
            if mariadb10 {
                Mariadb10
            } else {
                GtidMode
            }
        }
        Mariadb10 => Mariadb10GtidDomain,
        Mariadb10GtidDomain => {
            if mariadb10_gtid {
                Mariadb10RequestGtid
            } else {
                Latin1
            }
        }
        Mariadb10RequestGtid => GtidStrict,
        GtidStrict => GtidNoDup,
        GtidNoDup => Latin1,
        GtidMode => Muuid,
        Muuid => Suuid,
        Suuid => Latin1,
        Latin1 => Utf8,
        Utf8 => {
            if maxwell_compat {
                ResultsCharset
            } else {
                Select1
            }
        }
        ResultsCharset => SqlMode,
        SqlMode => Select1,
        Select1 => SelectVer,
        SelectVer => SelectVerCom,
        SelectVerCom => SelectHostname,
        SelectHostname => Map,
        Map => {
            if maxwell_compat {
                ServerVars
            } else {
                RegisterReady
            }
        }
        ServerVars => BinlogVars,
        BinlogVars => LowerCaseTables,
        LowerCaseTables => RegisterReady,
        RegisterReady => Register,
        Register => {
            if semisync {
                CheckSemisync
            } else {
                RequestBinlogDump
            }
        }
        CheckSemisync => RequestSemisync,
        RequestSemisync => RequestBinlogDump,
        RequestBinlogDump => BinlogDump,
        BinlogDump => BinlogDump,
        Failed => Failed,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn skips_gtid_branch_when_mariadb10_gtid_is_off() {
        let s = next_state(MasterState::Mariadb10GtidDomain, true, false, false, false, false);
        assert_eq!(s, MasterState::Latin1);
    }

    #[test]
    fn takes_gtid_branch_when_mariadb10_gtid_is_on() {
        let s = next_state(MasterState::Mariadb10GtidDomain, true, true, false, false, false);
        assert_eq!(s, MasterState::Mariadb10RequestGtid);
        let s = next_state(s, true, true, false, false, false);
        assert_eq!(s, MasterState::GtidStrict);
    }

    #[test]
    fn non_mariadb10_path_uses_legacy_gtid_mode() {
        let s = next_state(MasterState::Chksum2, false, false, false, false, false);
        assert_eq!(s, MasterState::GtidMode);
    }

    #[test]
    fn register_branches_on_semisync() {
        assert_eq!(
            next_state(MasterState::Register, true, false, false, false, true),
            MasterState::CheckSemisync
        );
        assert_eq!(
            next_state(MasterState::Register, true, false, false, false, false),
            MasterState::RequestBinlogDump
        );
    }

    #[test]
    fn gtid_mode_errors_are_tolerated_binlogdump_is_steady_state() {
        assert!(error_is_tolerated(MasterState::GtidMode));
        assert!(error_is_tolerated(MasterState::BinlogDump));
        assert!(!error_is_tolerated(MasterState::Register));
    }
}
