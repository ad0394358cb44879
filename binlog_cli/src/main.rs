use std::env::current_dir;
use std::fmt::Debug;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use common::config::{read_config, FConfig};
use common::config::load_style::Format;
use common::err::CResult;
use common::log::tracing_factory::{OutputType, TracingFactory, TracingFactoryOptions};
use common::pretty_util::to_string_pretty;

#[derive(Parser, Serialize, Debug, Clone)]
#[command(name = "binlog_cli")]
#[command(version = "0.0.1")]
#[command(about = "Offline tooling for the binlog router's on-disk state")]
#[command(long_about = None)]
pub(crate) struct CliArgs {
    #[arg(short, long, help = "Path to loaded configuration file", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, help = "enable debug mode", default_value_t = false)]
    pub debug: bool,

    #[arg(short, long, help = "output format: [yaml | json], default yaml", default_value = "yaml")]
    pub format: String,
}

#[derive(Subcommand, Serialize, Debug, Clone)]
enum Commands {
    /// Usage: binlog_cli check <FILE>
    /// Offline binlog-file integrity check, maxbinlogcheck-style.
    Check { file: PathBuf },
    /// Usage: binlog_cli gtid <DOMAIN_ID> --db <gtid_maps.db>
    /// Dumps the GTID index rows recorded for one replication domain.
    Gtid {
        domain_id: u32,
        #[arg(long = "db", help = "path to gtid_maps.db", value_name = "FILE")]
        db: PathBuf,
    },
}

#[tokio::main]
async fn main() -> CResult<()> {
    let args = CliArgs::parse();

    let format = Format::format(&args.format);
    let config = load_config(&args);
    let rep_config = config.get_config();

    let log_opt = TracingFactoryOptions::new(args.debug, OutputType::LOG, rep_config.base.get_log_dir());
    let log_factory = TracingFactory::init_log_with_options(log_opt);
    if args.debug {
        eprintln!("log_dir: {:?}", log_factory.get_log_dir());
        eprintln!("args: \n{}", to_string_pretty(&format, &args));
    }

    match args.command {
        Commands::Check { file } => run_check(&file),
        Commands::Gtid { domain_id, db } => run_gtid(domain_id, &db).await,
    }
}

fn run_check(file: &PathBuf) -> CResult<()> {
    let report = relay_log::check::check_file(file)?;
    println!("events checked: {}", report.event_count);
    println!("last good position: {}", report.last_good_pos);
    match &report.outcome {
        relay_log::check::CheckOutcome::Clean => println!("outcome: clean"),
        relay_log::check::CheckOutcome::Truncated { reason } => {
            println!("outcome: truncated ({reason})")
        }
    }
    Ok(())
}

async fn run_gtid(domain_id: u32, db: &PathBuf) -> CResult<()> {
    let store = relay_log::gtid_index::SqliteGtidStore::open(&db.to_string_lossy()).await?;
    let entries = relay_log::gtid_index::GtidIndexStore::scan_domain(&store, domain_id).await?;
    for entry in entries {
        println!(
            "{}-{}-{} file={} [{}, {})",
            entry.gtid.domain_id, entry.gtid.server_id, entry.gtid.sequence,
            entry.binlog_file, entry.start_pos, entry.end_pos,
        );
    }
    Ok(())
}

fn load_config(args: &CliArgs) -> FConfig {
    match get_config_path(args) {
        Some(path) => read_config(path).map(FConfig::new).unwrap_or_default(),
        None => FConfig::default(),
    }
}

fn get_config_path(args: &CliArgs) -> Option<PathBuf> {
    if args.config.is_some() {
        return args.config.clone();
    }

    let mut pwd = current_dir().unwrap_or_else(|_| "/".into());
    pwd.push("conf");
    pwd.push("replayer");
    pwd.set_extension("toml");
    Some(pwd)
}
