use serde::{Deserialize, Serialize};

/// `binlog_structure` — flat `<binlogdir>/<filestem>.NNNNNN` vs tree
/// `<binlogdir>/<domain>/<server_id>/<filestem>.NNNNNN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinlogStructure {
    Flat,
    Tree,
}

impl Default for BinlogStructure {
    fn default() -> Self {
        BinlogStructure::Flat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionAlgorithm {
    AesCbc,
    AesCtr,
}

impl Default for EncryptionAlgorithm {
    fn default() -> Self {
        EncryptionAlgorithm::AesCbc
    }
}

/// Binlog router configuration keys, spec.md §6 "Binlog router".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinlogRouterConfig {
    pub server_id: u32,
    pub master_id: u32,
    pub uuid: Option<String>,
    pub master_uuid: Option<String>,

    /// `master.ini`'s `[binlog_configuration]` connection keys, spec.md §6.
    pub master_host: String,
    pub master_port: u16,
    pub master_user: String,
    pub master_password: String,

    pub mariadb10_compatibility: bool,
    pub mariadb10_slave_gtid: bool,
    pub mariadb10_master_gtid: bool,

    pub transaction_safety: bool,

    pub semisync: bool,

    pub heartbeat_period_secs: u32,
    pub send_slave_heartbeat: bool,

    pub encrypt_binlog: bool,
    pub encryption_algorithm: EncryptionAlgorithm,
    pub encryption_key_file: Option<String>,

    pub binlog_structure: BinlogStructure,

    pub shortburst: u32,
    pub longburst: u32,
    pub burstsize: u64,

    pub binlogdir: String,
    pub filestem: String,
    pub initbinlog: u32,

    pub ssl_cert_verification_depth: u32,

    /// Linear-backoff ceiling for master reconnects (spec.md §4.3, §9.2).
    pub retry_interval_secs: u32,
}

impl Default for BinlogRouterConfig {
    fn default() -> Self {
        BinlogRouterConfig {
            server_id: 0,
            master_id: 0,
            uuid: None,
            master_uuid: None,
            master_host: "127.0.0.1".to_string(),
            master_port: 3306,
            master_user: "repl".to_string(),
            master_password: String::new(),
            mariadb10_compatibility: true,
            mariadb10_slave_gtid: true,
            mariadb10_master_gtid: false,
            transaction_safety: true,
            semisync: false,
            heartbeat_period_secs: 300,
            send_slave_heartbeat: false,
            encrypt_binlog: false,
            encryption_algorithm: EncryptionAlgorithm::AesCbc,
            encryption_key_file: None,
            binlog_structure: BinlogStructure::Flat,
            shortburst: 15,
            longburst: 500,
            burstsize: 1024 * 1024,
            binlogdir: "./binlogs".to_string(),
            filestem: "mysql-bin".to_string(),
            initbinlog: 1,
            ssl_cert_verification_depth: 9,
            retry_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterFailureMode {
    FailInstantly,
    FailOnWrite,
    ErrorOnWrite,
}

impl Default for MasterFailureMode {
    fn default() -> Self {
        MasterFailureMode::FailInstantly
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CausalReadsMode {
    None,
    Local,
    Global,
    Fast,
    FastGlobal,
    Universal,
    FastUniversal,
}

impl Default for CausalReadsMode {
    fn default() -> Self {
        CausalReadsMode::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaveSelectionCriteria {
    LeastGlobalConnections,
    LeastRouterConnections,
    LeastBehindMaster,
    LeastCurrentOperations,
    Adaptive,
}

impl Default for SlaveSelectionCriteria {
    fn default() -> Self {
        SlaveSelectionCriteria::LeastCurrentOperations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrxReplayChecksum {
    Full,
    ResultOnly,
    NoInsertId,
}

impl Default for TrxReplayChecksum {
    fn default() -> Self {
        TrxReplayChecksum::Full
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseSqlVariablesIn {
    All,
    Master,
}

impl Default for UseSqlVariablesIn {
    fn default() -> Self {
        UseSqlVariablesIn::All
    }
}

/// Read/write splitter configuration keys, spec.md §6 "Splitter".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub use_sql_variables_in: UseSqlVariablesIn,
    pub slave_selection_criteria: SlaveSelectionCriteria,
    pub master_failure_mode: MasterFailureMode,

    pub causal_reads: CausalReadsMode,
    pub causal_reads_timeout_secs: u64,

    pub max_replication_lag_secs: Option<u32>,
    pub max_slave_connections: Option<u32>,
    pub slave_connections: Option<u32>,

    pub retry_failed_reads: bool,
    pub strict_multi_stmt: bool,
    pub strict_sp_calls: bool,
    pub strict_tmp_tables: bool,

    pub master_accept_reads: bool,
    pub master_reconnection: bool,

    pub delayed_retry: bool,
    pub delayed_retry_timeout_secs: u64,

    pub transaction_replay: bool,
    pub transaction_replay_max_size: usize,
    pub transaction_replay_timeout_secs: u64,
    pub transaction_replay_attempts: u32,
    pub transaction_replay_retry_on_deadlock: bool,
    pub transaction_replay_retry_on_mismatch: bool,
    pub transaction_replay_safe_commit: bool,
    pub transaction_replay_checksum: TrxReplayChecksum,

    pub optimistic_trx: bool,
    pub lazy_connect: bool,
    pub reuse_prepared_statements: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        SplitterConfig {
            use_sql_variables_in: UseSqlVariablesIn::All,
            slave_selection_criteria: SlaveSelectionCriteria::LeastCurrentOperations,
            master_failure_mode: MasterFailureMode::FailInstantly,
            causal_reads: CausalReadsMode::None,
            causal_reads_timeout_secs: 10,
            max_replication_lag_secs: None,
            max_slave_connections: None,
            slave_connections: None,
            retry_failed_reads: true,
            strict_multi_stmt: false,
            strict_sp_calls: false,
            strict_tmp_tables: true,
            master_accept_reads: false,
            master_reconnection: false,
            delayed_retry: false,
            delayed_retry_timeout_secs: 10,
            transaction_replay: false,
            transaction_replay_max_size: 1024 * 1024,
            transaction_replay_timeout_secs: 0,
            transaction_replay_attempts: 5,
            transaction_replay_retry_on_deadlock: false,
            transaction_replay_retry_on_mismatch: false,
            transaction_replay_safe_commit: false,
            transaction_replay_checksum: TrxReplayChecksum::Full,
            optimistic_trx: false,
            lazy_connect: false,
            reuse_prepared_statements: false,
        }
    }
}

/// Composes both personalities so one config file can drive either router,
/// mirroring how `binlog_cli` loads a single `BinlogConfig` today.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RouterConfig {
    pub binlog_router: Option<BinlogRouterConfig>,
    pub splitter: Option<SplitterConfig>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn binlog_router_defaults_match_documented_behavior() {
        let cfg = BinlogRouterConfig::default();
        assert_eq!(cfg.binlog_structure, BinlogStructure::Flat);
        assert!(cfg.transaction_safety);
        assert_eq!(cfg.initbinlog, 1);
    }

    #[test]
    fn splitter_defaults_match_documented_behavior() {
        let cfg = SplitterConfig::default();
        assert_eq!(cfg.causal_reads, CausalReadsMode::None);
        assert_eq!(cfg.master_failure_mode, MasterFailureMode::FailInstantly);
        assert_eq!(cfg.transaction_replay_checksum, TrxReplayChecksum::Full);
    }

    #[test]
    fn router_config_yaml_round_trip() {
        let cfg = RouterConfig {
            binlog_router: Some(BinlogRouterConfig::default()),
            splitter: Some(SplitterConfig::default()),
        };
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let back: RouterConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(back.binlog_router.is_some());
        assert!(back.splitter.is_some());
    }
}
