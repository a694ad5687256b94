//! Signals taken from the process environment and kernel metadata.

use std::env;
use std::fs;
use std::path::PathBuf;

use crate::component::Component;
use crate::error::DeviceIdError;

fn first_env(vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|v| env::var(v).ok())
        .find(|v| !v.trim().is_empty())
}

/// Name of the user running the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserNameComponent {
    normalize: bool,
}

impl UserNameComponent {
    /// With `normalize`, the name is lower-cased.
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }
}

impl Component for UserNameComponent {
    fn value(&self) -> Result<String, DeviceIdError> {
        let name = first_env(&["USER", "USERNAME", "LOGNAME"])
            .ok_or_else(|| DeviceIdError::unavailable("user name not set"))?;
        Ok(if self.normalize {
            name.to_lowercase()
        } else {
            name
        })
    }
}

/// Host name, from the environment or the kernel.
#[derive(Debug, Clone)]
pub struct MachineNameComponent {
    files: Vec<PathBuf>,
}

impl MachineNameComponent {
    /// Fall back to the first readable file in `files` when the environment is silent.
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }
}

impl Default for MachineNameComponent {
    fn default() -> Self {
        Self::new(vec![
            PathBuf::from("/proc/sys/kernel/hostname"),
            PathBuf::from("/etc/hostname"),
        ])
    }
}

impl Component for MachineNameComponent {
    fn value(&self) -> Result<String, DeviceIdError> {
        if let Some(name) = first_env(&["COMPUTERNAME", "HOSTNAME"]) {
            return Ok(name);
        }
        self.files
            .iter()
            .filter_map(|f| fs::read_to_string(f).ok())
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty())
            .ok_or_else(|| DeviceIdError::unavailable("host name not found"))
    }
}

/// OS family plus kernel release, e.g. `linux 6.8.0-45-generic`.
#[derive(Debug, Clone)]
pub struct OsVersionComponent {
    release_file: PathBuf,
}

impl OsVersionComponent {
    /// Read the kernel release from `release_file`.
    pub fn new(release_file: impl Into<PathBuf>) -> Self {
        Self {
            release_file: release_file.into(),
        }
    }
}

impl Default for OsVersionComponent {
    fn default() -> Self {
        Self::new("/proc/sys/kernel/osrelease")
    }
}

impl Component for OsVersionComponent {
    fn value(&self) -> Result<String, DeviceIdError> {
        let release = fs::read_to_string(&self.release_file)?;
        Ok(format!("{} {}", env::consts::OS, release.trim()))
    }
}
