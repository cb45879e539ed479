//! Best-effort "open this URL in the default browser".
use std::{
    io,
    process::{Command, Stdio},
};

/// Opens a URL for the operator. Failures are reported, never fatal.
pub trait BrowserLauncher: Send + Sync {
    fn name(&self) -> &'static str;
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Launcher that spawns a platform opener program and does not wait for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLauncher {
    name: &'static str,
    program: &'static str,
    leading_args: &'static [&'static str],
}

impl CommandLauncher {
    pub const fn macos() -> Self {
        Self {
            name: "open",
            program: "open",
            leading_args: &[],
        }
    }

    pub const fn linux() -> Self {
        Self {
            name: "xdg-open",
            program: "xdg-open",
            leading_args: &[],
        }
    }

    /// `start` treats its first quoted argument as a window title, hence the empty string.
    pub const fn windows() -> Self {
        Self {
            name: "start",
            program: "cmd",
            leading_args: &["/C", "start", ""],
        }
    }

    pub fn command(&self, url: &str) -> Command {
        let mut command = Command::new(self.program);
        command
            .args(self.leading_args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl BrowserLauncher for CommandLauncher {
    fn name(&self) -> &'static str {
        self.name
    }

    fn open(&self, url: &str) -> io::Result<()> {
        self.command(url).spawn().map(|_| ())
    }
}

/// Launcher for `--no-browser`: the coordinator prints the URL and nothing else happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintOnlyLauncher;

impl BrowserLauncher for PrintOnlyLauncher {
    fn name(&self) -> &'static str {
        "none"
    }

    fn open(&self, _url: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Launcher for the platform this binary was built for.
pub fn system_launcher() -> Box<dyn BrowserLauncher> {
    #[cfg(target_os = "macos")]
    {
        Box::new(CommandLauncher::macos())
    }
    #[cfg(target_os = "windows")]
    {
        Box::new(CommandLauncher::windows())
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Box::new(CommandLauncher::linux())
    }
}
