//! Entry point for the StackEye CLI.
use std::process::ExitCode;

use clap::Parser;
use stackeye::{
    cli::{execute_cli_command, CliArgs, CommandExit},
    lib::telemetry,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<(), CommandExit> {
    let args = CliArgs::parse();
    let invocation = args.into_invocation().map_err(CommandExit::from_error)?;
    telemetry::init_tracing(invocation.profile.log_directive).map_err(CommandExit::from_error)?;

    let cancel = CancellationToken::new();
    watch_interrupt(cancel.clone());

    let message = execute_cli_command(&invocation.profile, invocation.command, &cancel).await?;
    println!("{message}");
    Ok(())
}

/// Ctrl-C cancels a pending prompt or handshake instead of killing the process, so the listener is closed.
fn watch_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(target: "stackeye::auth", "Interrupt received; cancelling");
            cancel.cancel();
        }
    });
}
