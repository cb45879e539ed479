//! CLI entrypoint module structure.
use std::io::{self, BufRead, IsTerminal, Write};

use tokio_util::sync::CancellationToken;

use crate::{
    auth::{self, system_launcher, BrowserLauncher, LoginRequest, PrintOnlyLauncher},
    settings::Settings,
};

pub mod args;
pub mod exit;
pub mod profile;

pub use args::{CliArgs, CliCommand, Invocation, LoginArgs, LogoutArgs};
pub use exit::CommandExit;
pub use profile::{log_directive, resolve_store_path, InvocationProfile};

/// Execute a subcommand and return the operator-facing summary.
pub async fn execute_cli_command(
    profile: &InvocationProfile,
    command: CliCommand,
    cancel: &CancellationToken,
) -> Result<String, CommandExit> {
    match command {
        CliCommand::Login(args) => {
            let settings =
                Settings::load(&profile.overrides).map_err(CommandExit::from_config_error)?;
            let launcher: Box<dyn BrowserLauncher> = if args.no_browser {
                Box::new(PrintOnlyLauncher)
            } else {
                system_launcher()
            };
            let request = LoginRequest {
                store_path: profile.store_path.clone(),
                assume_yes: args.assume_yes,
            };
            let report = auth::login(
                &settings,
                &request,
                launcher.as_ref(),
                prompt_confirmation,
                cancel,
            )
            .await
            .map_err(|err| CommandExit::from_login_error("login", &err))?;
            Ok(report.summary())
        }
        CliCommand::Logout(args) => {
            let report = auth::logout(&profile.store_path, args.context.as_deref())
                .map_err(|err| CommandExit::from_login_error("logout", &err))?;
            Ok(report.summary())
        }
    }
}

/// Ask a yes/no question on the terminal. Without a TTY the answer is "no".
pub fn prompt_confirmation(prompt: &str) -> bool {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return false;
    }

    let mut stderr = io::stderr();
    if write!(stderr, "{prompt} [y/N] ").and_then(|_| stderr.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    if stdin.lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_affirmative(&answer)
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
