use std::io;
use std::process::Command;

use log::debug;
use thiserror::Error;

use crate::resolver::ResolvedPackage;

/// Integer status the host reports; forwarded verbatim to the environment.
pub type ExitStatus = i32;

/// Overrides the host program launched by [`ProcessHostRunner`].
pub const HOST_PROGRAM_ENV: &str = "SKYNAV_HOST";

/// Plugin search path exported to the host process.
pub const PLUGIN_PATH_ENV: &str = "SKYNAV_PLUGIN_PATH";

pub const STANDALONE_FLAG: &str = "--standalone";

const DEFAULT_HOST_PROGRAM: &str = "skynav_host";

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to start host `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for host: {0}")]
    Wait(#[source] io::Error),
}

/// Narrow contract of the external plugin host: run with an argument vector,
/// optionally restricted to a single plugin, and report an integer status.
pub trait HostRunner {
    fn main(&self, argv: &[String], standalone: Option<&str>) -> Result<ExitStatus, HostError>;
}

/// Host adapter that launches the host program as a child process and maps
/// its termination into an exit status.
pub struct ProcessHostRunner {
    program: String,
    plugin_path: String,
}

impl ProcessHostRunner {
    pub fn new(program: impl Into<String>, resolved: &ResolvedPackage) -> Self {
        let plugin_path = resolved
            .roots()
            .map(|root| root.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        Self {
            program: program.into(),
            plugin_path,
        }
    }

    /// Host program from `SKYNAV_HOST`, falling back to the default name on
    /// the executable search path.
    pub fn from_env(resolved: ResolvedPackage) -> Self {
        let program = std::env::var(HOST_PROGRAM_ENV)
            .unwrap_or_else(|_| DEFAULT_HOST_PROGRAM.to_string());
        Self::new(program, &resolved)
    }
}

impl HostRunner for ProcessHostRunner {
    fn main(&self, argv: &[String], standalone: Option<&str>) -> Result<ExitStatus, HostError> {
        let mut command = Command::new(&self.program);
        command.args(argv.iter().skip(1));
        if let Some(package) = standalone {
            command.arg(STANDALONE_FLAG).arg(package);
        }
        command.env(PLUGIN_PATH_ENV, &self.plugin_path);

        debug!(
            "handing control to host `{}` (standalone = {:?})",
            self.program, standalone
        );
        let mut child = command.spawn().map_err(|source| HostError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let status = child.wait().map_err(HostError::Wait)?;
        Ok(termination_status(status))
    }
}

/// Child exit code, or the shell convention `128 + signal` when the host
/// died to a signal.
fn termination_status(status: std::process::ExitStatus) -> ExitStatus {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
