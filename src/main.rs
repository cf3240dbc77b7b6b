//! presto-connector - run dashboard queries against Presto from a shell.

mod cli;

use cli::{Cli, Command};
use presto_connector::config::{Config, ConnectionConfig};
use presto_connector::engine::ScriptedEngine;
use presto_connector::error::{ConnectorError, Result};
use presto_connector::logging;
use presto_connector::runner::{PrestoRunner, QueryOutput, QueryRunner, RunnerRegistry};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Exit code used when a query was interrupted.
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    match cli.log_file.clone() {
        Some(path) => logging::init_file_logging(Some(path)),
        None => logging::init_stderr_logging(),
    }

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) if e.is_cancelled() => {
            eprintln!("{e}");
            std::process::exit(EXIT_CANCELLED);
        }
        Err(e) => {
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let registry = RunnerRegistry::with_default_runners();

    if !cli.command.needs_connection() {
        if cli.command == Command::ConfigSchema {
            print_json(&PrestoRunner::configuration_schema())?;
        } else {
            for runner_type in registry.types() {
                println!("{runner_type}");
            }
        }
        return Ok(0);
    }

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    // Precedence:
    // 1. CLI arguments (highest)
    // 2. Named connection from config
    // 3. Default connection from config
    // 4. Environment variables
    let connection = resolve_connection(&cli, &config)?;
    info!("Connection: {}", connection.display_string());

    let runner: Box<dyn QueryRunner> = if cli.mock {
        warn!("Using the scripted engine; no coordinator will be contacted");
        connection.validate()?;
        Box::new(PrestoRunner::with_engine(
            connection,
            Arc::new(ScriptedEngine::new()),
        ))
    } else {
        registry.create(PrestoRunner::runner_type(), connection)?
    };

    let timeout = cli.command.timeout();
    match cli.command {
        Command::Query { sql, run_as, .. } => {
            let sql = read_query(sql)?;
            run_query(runner.as_ref(), &sql, run_as.as_deref(), timeout).await
        }
        Command::Schema => {
            let schema = runner.get_schema().await?;
            print_json(&schema)?;
            Ok(0)
        }
        Command::Test => {
            runner.test_connection().await?;
            println!("Connection OK");
            Ok(0)
        }
        Command::ConfigSchema | Command::Runners => Ok(0),
    }
}

/// Runs a query, cancelling it on Ctrl-C or when the timeout elapses.
async fn run_query(
    runner: &dyn QueryRunner,
    sql: &str,
    user: Option<&str>,
    timeout: Option<Duration>,
) -> Result<i32> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Interrupt received"),
                _ = deadline(timeout) => warn!("Query timed out"),
            }
            cancel.cancel();
        })
    };

    let output = runner.run_query(sql, user, &cancel).await;
    watcher.abort();

    match output? {
        QueryOutput::Data(json) => {
            println!("{json}");
            Ok(0)
        }
        QueryOutput::Error(message) => {
            eprintln!("{message}");
            Ok(2)
        }
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Resolves the final connection configuration from CLI args, config file, and environment.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<ConnectionConfig> {
    let mut connection = cli.to_connection_config()?;

    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                return Err(ConnectorError::config(format!(
                    "Connection '{}' not found in config file",
                    name
                )));
            }
        }
    }

    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    let mut connection = connection.unwrap_or_default();
    connection.apply_env_defaults();
    Ok(connection)
}

fn read_query(sql: String) -> Result<String> {
    if sql != "-" {
        return Ok(sql);
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| ConnectorError::internal(format!("Failed to read query from stdin: {e}")))?;
    Ok(buffer)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ConnectorError::internal(format!("Failed to serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}
