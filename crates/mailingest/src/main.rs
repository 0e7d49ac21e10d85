//! CLI entry point for `mailingest`.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};

use mailingest::config::{DEFAULT_CONFIG_KEY, DEFAULT_EXTENSIONS};
use mailingest::{
    filter_inbound, init_logging, Environment, FsObjectStore, LogFormat, LogNotifier, Pipeline,
    SettlePolicy, SqliteCatalog,
};

#[derive(Parser)]
#[command(name = "mailingest", version, about = "Email attachment intake for the data lake")]
struct Cli {
    /// Log output format (json, pretty)
    #[arg(long, global = true, default_value = "json", env = "LOG_FORMAT")]
    log_format: LogFormat,

    #[command(flatten)]
    env: EnvArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EnvArgs {
    /// Directory holding one sub-directory per bucket
    #[arg(long, global = true, env = "STORAGE_ROOT", default_value = "./data")]
    storage_root: PathBuf,

    /// Bucket holding the configuration object
    #[arg(long, global = true, env = "BUCKET_NAME", default_value = "")]
    bucket: String,

    #[arg(long, global = true, env = "CONFIG_PARSER_KEY", default_value = DEFAULT_CONFIG_KEY)]
    config_key: String,

    #[arg(long, global = true, env = "GLUE_DATABASE_NAME", default_value = "email_ingest")]
    database: String,

    /// SQLite file for the catalog and ingestion ledger
    #[arg(long, global = true, env = "CATALOG_PATH", default_value = "./data/catalog.db")]
    catalog_path: PathBuf,

    #[arg(long, global = true, env = "S3_PREFIX_CURATED", default_value = "curated")]
    curated_prefix: String,

    #[arg(long, global = true, env = "S3_PREFIX_QUARANTINE", default_value = "quarantine")]
    quarantine_prefix: String,

    #[arg(long, global = true, env = "POSSIBLE_EXTENSION_FILE", default_value = DEFAULT_EXTENSIONS)]
    extensions: String,

    /// Visibility polls before tagging gives up
    #[arg(long, global = true, env = "SETTLE_MAX_ATTEMPTS", default_value_t = 6)]
    settle_attempts: u32,

    #[arg(long, global = true, env = "SETTLE_INITIAL_DELAY_MS", default_value_t = 100)]
    settle_initial_ms: u64,

    #[arg(long, global = true, env = "SETTLE_MAX_DELAY_MS", default_value_t = 2000)]
    settle_max_ms: u64,
}

impl EnvArgs {
    fn environment(&self) -> Environment {
        Environment {
            bucket: self.bucket.clone(),
            config_key: self.config_key.clone(),
            database: self.database.clone(),
            curated_prefix: self.curated_prefix.clone(),
            quarantine_prefix: self.quarantine_prefix.clone(),
            default_extensions: self.extensions.clone(),
            settle: SettlePolicy {
                max_attempts: self.settle_attempts,
                initial_delay: Duration::from_millis(self.settle_initial_ms),
                max_delay: Duration::from_millis(self.settle_max_ms),
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check envelope senders against the allow-list
    Filter {
        /// Event JSON file, or `-` for stdin
        #[arg(long, default_value = "-")]
        event: String,
    },
    /// Ingest the emails named by a storage event
    Process {
        /// Event JSON file, or `-` for stdin
        #[arg(long, default_value = "-")]
        event: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format).map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    let env = cli.env.environment();
    let store = Arc::new(FsObjectStore::new(&cli.env.storage_root));

    match cli.command {
        Commands::Filter { event } => {
            let json = read_event(&event)?;
            let response = filter_inbound(&json, &env, store.as_ref(), &LogNotifier);
            println!("{}", serde_json::to_string(&response)?);
            Ok(())
        }
        Commands::Process { event } => {
            let json = read_event(&event)?;
            let catalog = SqliteCatalog::open(&cli.env.catalog_path).with_context(|| {
                format!("failed to open catalog {}", cli.env.catalog_path.display())
            })?;

            let report = Pipeline::process_event(
                &json,
                &env,
                store,
                Arc::new(catalog),
                Arc::new(LogNotifier),
            )?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

fn read_event(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read event from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(Path::new(source))
        .with_context(|| format!("failed to read event file {}", source))
}
