//! Gravity daemon: entry point for running a bridge node.
//!
//! Commands are read as JSON lines from a file or stdin; every bridge event
//! is written to stdout as one JSON object per line. Logs go to stderr.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use gravity_node::{init_logging, BridgeNode, EventBus, LogFormat, NodeConfig};
use gravity_types::{BridgeEvent, Timestamp};

#[derive(Parser)]
#[command(name = "gravityd", about = "Gravity bridge attestation daemon")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "GRAVITY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level override: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "GRAVITY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format override: "human" or "json".
    #[arg(long, env = "GRAVITY_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Start a node and replay commands through it.
    Run {
        /// Command file, one JSON object per line. Defaults to stdin.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Stop at the first rejected command instead of skipping it.
        #[arg(long)]
        strict: bool,
    },
    /// Print the default configuration as TOML.
    DefaultConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            NodeConfig::from_toml_file(path).with_context(|| format!("loading {path}"))?
        }
        None => NodeConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

fn event_json(event: &BridgeEvent) -> serde_json::Value {
    let attributes: serde_json::Map<String, serde_json::Value> = event
        .attributes
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
        .collect();
    serde_json::json!({ "event": event.name, "attributes": attributes })
}

fn stdout_bus() -> EventBus {
    let mut bus = EventBus::new();
    bus.subscribe(Box::new(|event: &BridgeEvent| {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", event_json(event)) {
            tracing::warn!("failed to write event: {e}");
        }
    }));
    bus
}

async fn open_input(input: Option<&PathBuf>) -> anyhow::Result<Box<dyn AsyncRead + Unpin>> {
    Ok(match input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    })
}

async fn run(config: NodeConfig, input: Option<PathBuf>, strict: bool) -> anyhow::Result<()> {
    let mut node = BridgeNode::new(config, stdout_bus(), Timestamp::now())?;
    tracing::info!(
        bridge_contract = %node.params().bridge_contract,
        bridge_chain_id = node.params().bridge_chain_id,
        "node started"
    );

    let mut lines = BufReader::new(open_input(input.as_ref()).await?).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut line_no: u64 = 0;
    let mut rejected: u64 = 0;
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading commands")?,
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received, stopping node");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Err(e) = node.handle_line(trimmed) {
            rejected += 1;
            tracing::warn!(line = line_no, retryable = e.is_retryable(), "command rejected: {e}");
            if strict {
                return Err(e).with_context(|| format!("line {line_no}"));
            }
        }
    }

    tracing::info!(
        handled = node.handled(),
        rejected,
        last_observed_nonce = node.engine().last_observed_nonce(),
        "gravity daemon exited cleanly"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::DefaultConfig => {
            print!("{}", NodeConfig::default().to_toml_string()?);
        }
        Command::Run { input, strict } => {
            let format: LogFormat = config.log_format()?;
            init_logging(format, &config.log_level);
            run(config, input, strict).await?;
        }
    }

    Ok(())
}
