//! ChainStream CLI.
//!
//! # Commands
//! ```text
//! chainstream [run]   poll the node, commit to the log, serve SSE (default)
//! chainstream check   query the RPC endpoint once and exit
//! chainstream streams print the stream directory
//! chainstream config  print the effective configuration as YAML
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chainstream_core::config::LogBackend;
use chainstream_core::{ChainStreamConfig, StreamDirectory};

mod cmd_check;
mod cmd_run;
mod logging;

#[derive(Parser)]
#[command(
    name = "chainstream",
    about = "Poll an EVM node, commit chain state to a durable log, fan it out over SSE",
    long_about = "
ChainStream: five poll jobs (blocks, pending, logs, network, gasPrice) publish
to a durable multi-subject log; every SSE subscriber gets its own live tail.

ENVIRONMENT VARIABLES:
  RPC_ENDPOINT   Upstream JSON-RPC URL
  SERVER_PORT    HTTP port
  LOG_BACKEND    memory | redis
  REDIS_URL      Redis URL for the redis log backend
  RUST_LOG       Global log level
",
    version
)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "CHAINSTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream JSON-RPC endpoint
    #[arg(long, global = true, env = "RPC_ENDPOINT")]
    rpc_url: Option<String>,

    /// HTTP listen port
    #[arg(long, global = true, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Durable log backend: memory | redis
    #[arg(long, global = true, env = "LOG_BACKEND")]
    log_backend: Option<LogBackend>,

    #[arg(long, global = true, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Global log level
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, global = true)]
    json_logs: bool,

    /// Reject unknown stream names with 404 instead of serving `blocks`
    #[arg(long, global = true)]
    strict_streams: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq, Debug)]
enum Commands {
    /// Run the poller and the HTTP server (default)
    Run,
    /// Query the RPC endpoint once and print chain id, head and gas price
    Check,
    /// Print the stream directory
    Streams,
    /// Print the effective configuration as YAML
    Config,
}

impl Cli {
    /// Defaults, then the YAML file, then flags and environment.
    fn load_config(&self) -> Result<ChainStreamConfig> {
        let mut config = match &self.config {
            Some(path) => ChainStreamConfig::from_yaml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ChainStreamConfig::default(),
        };

        if let Some(url) = &self.rpc_url {
            config.rpc.url = url.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(backend) = self.log_backend {
            config.log.backend = backend;
        }
        if let Some(url) = &self.redis_url {
            config.log.redis_url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json = true;
        }
        if self.strict_streams {
            config.server.strict_stream_names = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            logging::init_tracing(&config.logging);
            cmd_run::run(config).await
        }
        Commands::Check => cmd_check::run(&config).await,
        Commands::Streams => {
            print_streams();
            Ok(())
        }
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}

fn print_streams() {
    let directory = StreamDirectory::new();
    println!("{:<16} {:<18} DESCRIPTION", "NAME", "SUBJECT");
    for entry in directory.entries() {
        println!(
            "{:<16} {:<18} {}",
            entry.names.join(", "),
            entry.subject,
            entry.description
        );
    }
    println!(
        "\nUnknown names fall back to `{}` unless --strict-streams is set.",
        StreamDirectory::DEFAULT_STREAM
    );
}
