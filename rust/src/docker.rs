//! Container id of the current Docker container, read from a cgroup file.

use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::component::Component;
use crate::error::DeviceIdError;

static DOCKER_CGROUP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)+:(.)+?:(/.+?)??(/docker[-/])([0-9a-f]+)").unwrap());

pub const DEFAULT_CGROUP_FILE: &str = "/proc/self/cgroup";

/// First container id found in a cgroup listing.
pub fn parse_container_id(cgroup: &str) -> Option<String> {
    cgroup
        .lines()
        .find_map(|line| DOCKER_CGROUP_PATTERN.captures(line))
        .map(|caps| caps[5].to_string())
}

#[derive(Debug, Clone)]
pub struct DockerContainerIdComponent {
    cgroup_file: PathBuf,
}

impl DockerContainerIdComponent {
    /// Read the cgroup listing from `cgroup_file`.
    pub fn new(cgroup_file: impl Into<PathBuf>) -> Self {
        Self {
            cgroup_file: cgroup_file.into(),
        }
    }
}

impl Default for DockerContainerIdComponent {
    fn default() -> Self {
        Self::new(DEFAULT_CGROUP_FILE)
    }
}

impl Component for DockerContainerIdComponent {
    fn value(&self) -> Result<String, DeviceIdError> {
        let cgroup = fs::read_to_string(&self.cgroup_file)?;
        parse_container_id(&cgroup)
            .ok_or_else(|| DeviceIdError::unavailable("not running in a docker container"))
    }
}
