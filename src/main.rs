mod app;
mod config;
mod gateway;
mod logging;
mod state;
mod state_machine;
mod tui;
mod view;

use anyhow::Result;
use clap::Parser;
use config::Config;
use gateway::{Gateway, GraphqlGateway};
use logging::StructuredLogger;
use state::{WorkflowState, DEFAULT_LEVEL, MAX_LEVEL, MIN_LEVEL};
use state_machine::{StateCommand, WorkflowStateMachine};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

#[derive(Parser)]
#[command(name = "flamesim")]
#[command(about = "Flame-war simulator: escalate a mild post, preview the fallout, decide")]
#[command(version)]
struct Cli {
    /// Initial post text (optional; you can also type it in the TUI)
    text: Option<String>,

    /// Escalation level 1-5
    #[arg(short, long, default_value_t = DEFAULT_LEVEL, value_parser = clap::value_parser!(u8).range(MIN_LEVEL as i64..=MAX_LEVEL as i64))]
    level: u8,

    /// GraphQL endpoint (overrides FLAMESIM_GRAPHQL_ENDPOINT and the config file)
    #[arg(long)]
    endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Run one transform and print JSON instead of starting the TUI
    #[arg(long)]
    headless: bool,

    /// In headless mode, also generate simulated replies
    #[arg(long, requires = "headless")]
    with_replies: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.endpoint.clone(), cli.timeout_secs)?;

    if cli.headless {
        let Some(text) = cli.text.clone() else {
            anyhow::bail!("--headless requires the post text as an argument");
        };
        return app::headless::run(config, text, cli.level, cli.with_replies).await;
    }

    run_tui(cli, config).await
}

async fn run_tui(cli: Cli, config: Config) -> Result<()> {
    let state = WorkflowState::new();
    let logger = match config::app_dir() {
        Some(dir) => {
            let logs_dir = dir.join("logs").join(&state.session_id);
            StructuredLogger::new(&state.session_id, &logs_dir)
                .unwrap_or_else(|_| StructuredLogger::disabled(&state.session_id))
        }
        None => StructuredLogger::disabled(&state.session_id),
    };
    let logger = Arc::new(logger);

    let gateway: Arc<dyn Gateway> =
        Arc::new(GraphqlGateway::new(&config.endpoint, config.timeout_secs));
    let (machine, snapshot_rx) = WorkflowStateMachine::new(state, logger.clone());
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let driver = tokio::spawn(app::driver::run(
        machine,
        gateway,
        command_rx,
        command_tx.clone(),
        shutdown_rx,
    ));

    // Seed the workflow from the command line before the first frame.
    if let Some(text) = cli.text {
        let _ = command_tx.send(StateCommand::SetInput { text });
    }
    if cli.level != DEFAULT_LEVEL {
        let _ = command_tx.send(StateCommand::SetLevel { level: cli.level });
    }

    let result = tui::run(command_tx, snapshot_rx, logger.clone()).await;

    let _ = shutdown_tx.send(());
    let _ = driver.await;

    if let Some(path) = logger.path() {
        eprintln!("session log: {}", path.display());
    }
    result
}
