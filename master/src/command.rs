//! Commands the router sends to the upstream master to drive
//! [`crate::fsm::MasterState`] forward, spec.md §4.3's state-by-state
//! dialogue. Grounded in the teacher's `DumpBinlogCommand::serialize` (the
//! `COM_BINLOG_DUMP` byte layout, reused verbatim) and `QueryCommand`'s
//! "command byte + raw SQL bytes" pattern for every `SET`/`SELECT` step.
//!
//! The teacher's `commands::command::CommandType` enum (which would define
//! these numeric command bytes) isn't part of the retrieved sources, so the
//! standard MySQL/MariaDB client/server protocol command bytes are used
//! directly here instead.

use crate::fsm::MasterState;

/// `COM_QUERY`.
const COM_QUERY: u8 = 0x03;
/// `COM_REGISTER_SLAVE`.
const COM_REGISTER_SLAVE: u8 = 0x15;
/// `COM_BINLOG_DUMP`.
const COM_BINLOG_DUMP: u8 = 0x12;

/// No dump flags set: the router wants the blocking form of
/// `COM_BINLOG_DUMP`, where the master holds the connection open and keeps
/// streaming events as they're written rather than returning EOF once
/// caught up.
const BINLOG_DUMP_FLAG_NONE: u16 = 0x0000;

/// Everything [`command_for_state`] needs to build the command for a given
/// state; one field per `SET`/`SELECT`/`COM_REGISTER_SLAVE`/`COM_BINLOG_DUMP`
/// parameter spec.md §4.3 calls out.
pub struct HandshakeContext {
    pub server_id: u32,
    pub hostname: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub master_id: u32,
    pub send_heartbeat: bool,
    pub heartbeat_period_secs: u32,
    pub mariadb10: bool,
    pub mariadb10_gtid: bool,
    pub maxwell_compat: bool,
    pub semisync: bool,
    pub gtid_domain_id: u32,
    pub gtid_connect_state: String,
    pub binlog_filename: String,
    pub binlog_position: u64,
}

fn query_command(sql: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + sql.len());
    out.push(COM_QUERY);
    out.extend_from_slice(sql.as_bytes());
    out
}

/// `COM_REGISTER_SLAVE` payload: server_id, then 1-byte-length-prefixed
/// hostname/user/password, then port, replication rank (unused, always 0)
/// and master_id, all little-endian.
fn register_slave_command(ctx: &HandshakeContext) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(COM_REGISTER_SLAVE);
    out.extend_from_slice(&ctx.server_id.to_le_bytes());

    out.push(ctx.hostname.len() as u8);
    out.extend_from_slice(ctx.hostname.as_bytes());

    out.push(ctx.user.len() as u8);
    out.extend_from_slice(ctx.user.as_bytes());

    out.push(ctx.password.len() as u8);
    out.extend_from_slice(ctx.password.as_bytes());

    out.extend_from_slice(&ctx.port.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // replication rank, unused
    out.extend_from_slice(&ctx.master_id.to_le_bytes());
    out
}

/// `COM_BINLOG_DUMP` payload, identical layout to the teacher's
/// `DumpBinlogCommand::serialize`: command byte, position, flags, server_id,
/// then the raw (unprefixed) filename.
fn dump_binlog_command(ctx: &HandshakeContext) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(COM_BINLOG_DUMP);
    out.extend_from_slice(&(ctx.binlog_position as u32).to_le_bytes());
    out.extend_from_slice(&BINLOG_DUMP_FLAG_NONE.to_le_bytes());
    out.extend_from_slice(&ctx.server_id.to_le_bytes());
    out.extend_from_slice(ctx.binlog_filename.as_bytes());
    out
}

/// The command to send while in `state` to elicit the reply that advances
/// to `fsm::next_state(state, ...)`. Mirrors `next_state`'s branch
/// structure so the two stay in lockstep. Returns `None` for states that
/// send no command: `Unconnected` (the connect+auth dialogue, handled
/// before the FSM starts) and the `BinlogDump`/`Failed` steady states.
pub fn command_for_state(state: MasterState, ctx: &HandshakeContext) -> Option<Vec<u8>> {
    use MasterState::*;
    match state {
        Unconnected => None,
        Authenticated => Some(query_command("SELECT UNIX_TIMESTAMP()")),
        Timestamp => Some(query_command(&format!("SET @server_id={}", ctx.server_id))),
        ServerId => {
            if ctx.send_heartbeat {
                let period_ns = ctx.heartbeat_period_secs as u64 * 1_000_000_000;
                Some(query_command(&format!("SET @master_heartbeat_period={}", period_ns)))
            } else {
                Some(query_command("SET @master_binlog_checksum='CRC32'"))
            }
        }
        HbPeriod => Some(query_command("SET @master_binlog_checksum='CRC32'")),
        Chksum1 => Some(query_command("SET @master_binlog_checksum=@@global.binlog_checksum")),
        Chksum2 => {
            if ctx.mariadb10 {
                Some(query_command("SET @mariadb_slave_capability=4"))
            } else {
                Some(query_command("SELECT @@GLOBAL.GTID_MODE"))
            }
        }
        Mariadb10 => Some(query_command(&format!("SET @slave_gtid_domain_id={}", ctx.gtid_domain_id))),
        Mariadb10GtidDomain => {
            if ctx.mariadb10_gtid {
                Some(query_command(&format!("SET @slave_connect_state='{}'", ctx.gtid_connect_state)))
            } else {
                Some(query_command("SET NAMES latin1"))
            }
        }
        Mariadb10RequestGtid => Some(query_command("SET @gtid_strict_mode=1")),
        GtidStrict => Some(query_command("SET @slave_gtid_ignore_duplicates=1")),
        GtidNoDup => Some(query_command("SET NAMES latin1")),
        GtidMode => Some(query_command("SHOW VARIABLES LIKE 'server_uuid'")),
        Muuid => Some(query_command("SELECT @@SERVER_UUID")),
        Suuid => Some(query_command("SET NAMES latin1")),
        Latin1 => Some(query_command("SET character_set_client=utf8")),
        Utf8 => {
            if ctx.maxwell_compat {
                Some(query_command("SET @@session.character_set_results = NULL"))
            } else {
                Some(query_command("SELECT 1"))
            }
        }
        ResultsCharset => Some(query_command("SET SESSION sql_mode = ''")),
        SqlMode => Some(query_command("SELECT 1")),
        Select1 => Some(query_command("SELECT VERSION()")),
        SelectVer => Some(query_command("SELECT @@version_comment LIMIT 1")),
        SelectVerCom => Some(query_command("SELECT @@hostname")),
        SelectHostname => Some(query_command("SELECT @master_binlog_checksum")),
        Map => {
            if ctx.maxwell_compat {
                Some(query_command("SHOW VARIABLES LIKE 'server_id'"))
            } else {
                Some(query_command("SELECT 1"))
            }
        }
        ServerVars => Some(query_command("SHOW VARIABLES LIKE 'log_bin'")),
        BinlogVars => Some(query_command("SELECT @@lower_case_table_names")),
        LowerCaseTables => Some(query_command("SELECT 1")),
        RegisterReady => Some(register_slave_command(ctx)),
        Register => {
            if ctx.semisync {
                Some(query_command("SHOW VARIABLES LIKE 'rpl_semi_sync_master_enabled'"))
            } else {
                Some(dump_binlog_command(ctx))
            }
        }
        CheckSemisync => Some(query_command("SET @rpl_semi_sync_slave = 1")),
        RequestSemisync => Some(dump_binlog_command(ctx)),
        RequestBinlogDump => None,
        BinlogDump => None,
        Failed => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ctx() -> HandshakeContext {
        HandshakeContext {
            server_id: 99,
            hostname: "router-host".to_string(),
            port: 4000,
            user: "repl".to_string(),
            password: "secret".to_string(),
            master_id: 1,
            send_heartbeat: false,
            heartbeat_period_secs: 30,
            mariadb10: true,
            mariadb10_gtid: false,
            maxwell_compat: false,
            semisync: false,
            gtid_domain_id: 0,
            gtid_connect_state: "0-1-500".to_string(),
            binlog_filename: "mysql-bin.000001".to_string(),
            binlog_position: 4,
        }
    }

    #[test]
    fn unconnected_and_steady_states_send_nothing() {
        assert!(command_for_state(MasterState::Unconnected, &ctx()).is_none());
        assert!(command_for_state(MasterState::BinlogDump, &ctx()).is_none());
        assert!(command_for_state(MasterState::Failed, &ctx()).is_none());
    }

    #[test]
    fn register_ready_sends_com_register_slave() {
        let bytes = command_for_state(MasterState::RegisterReady, &ctx()).unwrap();
        assert_eq!(bytes[0], COM_REGISTER_SLAVE);
        assert_eq!(u32::from_le_bytes(bytes[1..5].try_into().unwrap()), 99);
    }

    #[test]
    fn register_without_semisync_sends_binlog_dump_directly() {
        let bytes = command_for_state(MasterState::Register, &ctx()).unwrap();
        assert_eq!(bytes[0], COM_BINLOG_DUMP);
        let filename = &bytes[1 + 4 + 2 + 4..];
        assert_eq!(filename, b"mysql-bin.000001");
    }

    #[test]
    fn register_with_semisync_checks_first() {
        let mut c = ctx();
        c.semisync = true;
        let bytes = command_for_state(MasterState::Register, &c).unwrap();
        assert_eq!(bytes[0], COM_QUERY);
    }

    #[test]
    fn server_id_branches_on_send_heartbeat() {
        let mut c = ctx();
        c.send_heartbeat = true;
        let with_hb = command_for_state(MasterState::ServerId, &c).unwrap();
        assert!(String::from_utf8_lossy(&with_hb[1..]).contains("heartbeat_period"));

        let without_hb = command_for_state(MasterState::ServerId, &ctx()).unwrap();
        assert!(String::from_utf8_lossy(&without_hb[1..]).contains("binlog_checksum"));
    }
}
