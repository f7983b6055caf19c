use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bizflow_core::document::{parse_credentials, parse_document, workflow_summary};
use bizflow_core::{Credential, compute_warnings};
use bizflow_engine::{
    EngineConfig, ExecutionStatus, ExecutorEvent, LogKind, WorkflowExecutor, event_channel,
};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bizflow", version, about = "Run and inspect business workflow documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a workflow document with the mock engine
    Run {
        /// Workflow document (JSON with nodes, edges and optional groups)
        workflow: PathBuf,
        /// JSON array of credentials referenced by the workflow
        #[arg(short, long)]
        credentials: Option<PathBuf>,
        /// JSON config file; missing fields use defaults
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print each log entry as a JSON line
        #[arg(long)]
        json: bool,
        /// Skip the pause between steps
        #[arg(long)]
        no_pause: bool,
    },
    /// Print validation warnings per node
    Validate {
        workflow: PathBuf,
    },
    /// Print a plain-text summary of the workflow
    Summary {
        workflow: PathBuf,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CliConfig {
    engine: EngineConfig,
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_credentials(path: Option<&Path>) -> Result<Vec<Credential>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    parse_credentials(&read(path)?)
        .with_context(|| format!("Invalid credentials file {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    serde_json::from_str(&read(path)?)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

fn print_log(event: &ExecutorEvent, json: bool) {
    let ExecutorEvent::Log(entry) = event else {
        return;
    };
    if json {
        match serde_json::to_string(entry) {
            Ok(line) => println!("{}", line),
            Err(e) => debug!("Failed to encode log entry: {}", e),
        }
        return;
    }
    let tag = match entry.kind {
        LogKind::Info => "info",
        LogKind::Error => "error",
        LogKind::Success => "ok",
        LogKind::Log => "log",
    };
    match &entry.node_id {
        Some(node) => println!("[{}] {:<5} {} ({})", entry.timestamp, tag, entry.message, node),
        None => println!("[{}] {:<5} {}", entry.timestamp, tag, entry.message),
    }
}

async fn run(
    workflow_path: &Path,
    credentials_path: Option<&Path>,
    config_path: Option<&Path>,
    json: bool,
    no_pause: bool,
) -> Result<ExecutionStatus> {
    let workflow = parse_document(&read(workflow_path)?)
        .with_context(|| format!("Invalid workflow document {}", workflow_path.display()))?;
    let credentials = load_credentials(credentials_path)?;
    let mut config = load_config(config_path)?.engine;
    if no_pause {
        config.step_pause_ms = 0;
    }
    info!(
        nodes = workflow.nodes.len(),
        edges = workflow.edges.len(),
        credentials = credentials.len(),
        "Loaded workflow"
    );

    let (tx, mut rx) = event_channel(&config);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_log(&event, json);
        }
    });

    let status = {
        let mut executor = WorkflowExecutor::new(workflow, credentials, config, tx);
        executor.run().await
    };
    printer.await.context("Log printer task failed")?;
    Ok(status)
}

fn validate(workflow_path: &Path) -> Result<bool> {
    let workflow = parse_document(&read(workflow_path)?)
        .with_context(|| format!("Invalid workflow document {}", workflow_path.display()))?;
    let mut clean = true;
    for (node, warnings) in workflow.nodes.iter().zip(compute_warnings(&workflow)) {
        for warning in warnings {
            clean = false;
            println!("{} ({}): {}", node.label, node.id, warning);
        }
    }
    if clean {
        println!("No warnings.");
    }
    Ok(clean)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,bizflow=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Run {
            workflow,
            credentials,
            config,
            json,
            no_pause,
        } => {
            let status = run(
                &workflow,
                credentials.as_deref(),
                config.as_deref(),
                json,
                no_pause,
            )
            .await?;
            if status == ExecutionStatus::Success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Validate { workflow } => {
            if validate(&workflow)? {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Summary { workflow } => {
            let workflow = parse_document(&read(&workflow)?)
                .with_context(|| format!("Invalid workflow document {}", workflow.display()))?;
            println!("{}", workflow_summary(&workflow));
            ExitCode::SUCCESS
        }
    };
    Ok(code)
}
