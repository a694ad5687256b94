//! External command execution, injected into every component that shells out.

use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::debug;

use crate::component::Component;
use crate::error::DeviceIdError;
use crate::platform::Platform;

/// Runs a command line and returns its standard output.
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, command: &str) -> Result<String, DeviceIdError>;
}

impl<F> CommandExecutor for F
where
    F: Fn(&str) -> Result<String, DeviceIdError> + Send + Sync,
{
    fn execute(&self, command: &str) -> Result<String, DeviceIdError> {
        self(command)
    }
}

/// Hands the command line to a shell interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellExecutor {
    program: String,
    args: Vec<String>,
}

impl ShellExecutor {
    /// Run commands as `program args... <command>`.
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// `bash -c`.
    pub fn bash() -> Self {
        Self::new("/bin/bash", &["-c"])
    }

    /// `sh -c`.
    pub fn sh() -> Self {
        Self::new("/bin/sh", &["-c"])
    }

    /// `cmd /C`.
    pub fn cmd() -> Self {
        Self::new("cmd.exe", &["/C"])
    }

    /// Non-interactive `powershell -Command`.
    pub fn powershell() -> Self {
        Self::new("powershell", &["-NoProfile", "-NonInteractive", "-Command"])
    }

    /// The conventional shell of `platform`.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Windows => Self::powershell(),
            Platform::Linux | Platform::MacOs => Self::bash(),
            Platform::Other => Self::sh(),
        }
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, command: &str) -> Result<String, DeviceIdError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(command)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;
        if !output.status.success() {
            return Err(DeviceIdError::unavailable(format!(
                "`{command}` exited with {}",
                output.status
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|_| DeviceIdError::malformed(format!("`{command}` printed non-UTF-8 output")))
    }
}

/// The trimmed output of a command.
pub struct CommandComponent {
    command: String,
    executor: Arc<dyn CommandExecutor>,
}

impl CommandComponent {
    /// Report the output of `command` run through `executor`.
    pub fn new(command: impl Into<String>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            command: command.into(),
            executor,
        }
    }
}

impl Component for CommandComponent {
    fn value(&self) -> Result<String, DeviceIdError> {
        debug!(command = %self.command, "running signal command");
        self.executor.execute(&self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_executor_is_injected() {
        let exec = |cmd: &str| -> Result<String, DeviceIdError> {
            assert_eq!(cmd, "ioreg -l");
            Ok("C02XYZ\n".to_string())
        };
        let c = CommandComponent::new("ioreg -l", Arc::new(exec));
        assert_eq!(c.produce().as_deref(), Some("C02XYZ"));
    }

    #[test]
    fn test_failing_executor_yields_none() {
        let exec = |_: &str| -> Result<String, DeviceIdError> {
            Err(DeviceIdError::unavailable("no such tool"))
        };
        let c = CommandComponent::new("whatever", Arc::new(exec));
        assert_eq!(c.produce(), None);
    }

    #[test]
    fn test_for_platform() {
        assert_eq!(ShellExecutor::for_platform(Platform::Linux), ShellExecutor::bash());
        assert_eq!(
            ShellExecutor::for_platform(Platform::Windows),
            ShellExecutor::powershell()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_sh_runs_commands() {
        let sh = ShellExecutor::sh();
        assert_eq!(sh.execute("echo hello").unwrap(), "hello\n");
        assert!(matches!(
            sh.execute("exit 3"),
            Err(DeviceIdError::SignalUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let exec = ShellExecutor::new("/definitely/not/a/shell", &["-c"]);
        assert!(matches!(exec.execute("true"), Err(DeviceIdError::Io(_))));
        assert_eq!(
            CommandComponent::new("true", Arc::new(exec)).produce(),
            None
        );
    }
}
