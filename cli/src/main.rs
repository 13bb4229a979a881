use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use loco_core::{ApiClient, CancellationToken, Outcome, RequestDescriptor, RequestLifecycleController};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::{plan, resolve_settings, Cli, Plan};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;
    debug!(base_url = %settings.base_url, timeout_secs = settings.default_timeout_secs, "settings resolved");
    let controller =
        RequestLifecycleController::from_settings(&settings).context("failed to build HTTP client")?;

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let plan = plan(cli.command, &ApiClient::new()).await?;
    let succeeded = match plan {
        Plan::Single(descriptor) => call(&controller, descriptor, &token).await?,
        Plan::Status { health, info } => {
            call(&controller, health, &token).await? && call(&controller, info, &token).await?
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Execute one call and print its outcome as JSON on stdout.
///
/// Returns whether the outcome was a success. A caller interrupt is an error
/// so that nothing is printed for the abandoned call.
async fn call(
    controller: &RequestLifecycleController,
    descriptor: RequestDescriptor,
    token: &CancellationToken,
) -> anyhow::Result<bool> {
    let outcome: Outcome = controller
        .execute_cancellable(descriptor, token)
        .await
        .context("interrupted")?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if let Some(message) = outcome.describe_failure() {
        eprintln!("error: {message}");
    }
    Ok(outcome.is_success())
}
