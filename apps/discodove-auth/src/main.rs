//! discodove-auth: command-line host for the discodove auth dispatcher.

mod cli;
mod commands;
mod config;
mod logging;
mod registered_plugins;

use std::process::ExitCode;

use anyhow::Context;
use auth_dispatcher::{AuthDispatcher, AuthDispatcherHandle};
use auth_dispatcher_sdk::AuthOutcome;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref())?;
    logging::init(&cfg.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        "Starting discodove-auth"
    );

    let root = serde_json::to_value(&cfg).context("failed to serialize configuration")?;
    let handle = AuthDispatcher::new(cfg.auth)
        .with_root_config(root)
        .start()
        .await?;
    let result = run(&handle, cli.command).await;
    handle.shutdown().await;
    result
}

async fn run(handle: &AuthDispatcherHandle, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Implements => {
            for method in commands::implements(handle).await? {
                println!("{method}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { user, authzid } => {
            let stdin = BufReader::new(tokio::io::stdin());
            let outcome = commands::check(handle, user, authzid, stdin).await?;
            Ok(report(&outcome))
        }
        Command::Sasl {
            mechanism,
            prompt,
            initial_response,
        } => {
            let outcome = commands::sasl(
                handle,
                mechanism.method(),
                &prompt,
                initial_response.as_deref(),
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await?;
            Ok(report(&outcome))
        }
    }
}

fn report(outcome: &AuthOutcome) -> ExitCode {
    println!("{}", commands::render(outcome));
    if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
