//! File-backed signals: fixed system files and self-provisioned token files.

use std::fs;
use std::path::{Path, PathBuf};

use rand::random_range;
use tracing::{debug, warn};

use crate::component::Component;
use crate::encoder::sha256_hex;
use crate::error::DeviceIdError;

/// Contents of the first readable, non-blank file among `paths`.
#[derive(Debug, Clone)]
pub struct FileContentsComponent {
    paths: Vec<PathBuf>,
    hash_contents: bool,
    skipped_prefixes: Vec<String>,
}

impl FileContentsComponent {
    /// Report the first readable, non-blank file among `paths`.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            hash_contents: false,
            skipped_prefixes: Vec::new(),
        }
    }

    /// Drop lines starting with any of `prefixes` before reporting, for
    /// files that mix stable fields with live counters.
    pub fn skipping_lines(mut self, prefixes: &[&str]) -> Self {
        self.skipped_prefixes = prefixes.iter().map(|p| p.to_string()).collect();
        self
    }

    fn filtered(&self, contents: String) -> String {
        if self.skipped_prefixes.is_empty() {
            return contents;
        }
        contents
            .lines()
            .filter(|line| !self.skipped_prefixes.iter().any(|p| line.starts_with(p.as_str())))
            .map(|line| format!("{line}\n"))
            .collect()
    }

    /// Report the SHA-256 of the contents instead of the contents.
    pub fn hashed(mut self) -> Self {
        self.hash_contents = true;
        self
    }
}

impl Component for FileContentsComponent {
    fn value(&self) -> Result<String, DeviceIdError> {
        for path in &self.paths {
            match fs::read_to_string(path).map(|c| self.filtered(c)) {
                Ok(contents) if !contents.trim().is_empty() => {
                    return Ok(if self.hash_contents {
                        sha256_hex(contents.as_bytes())
                    } else {
                        contents.trim().to_string()
                    });
                }
                Ok(_) => debug!(path = %path.display(), "file is blank"),
                Err(err) => debug!(path = %path.display(), error = %err, "file unreadable"),
            }
        }
        Err(DeviceIdError::unavailable("no readable file"))
    }
}

/// Name under which a token file is registered: `FileToken_<SHA-256 of path>`.
pub fn file_token_name(path: &Path) -> String {
    let digest = sha256_hex(path.to_string_lossy().as_bytes());
    format!("FileToken_{}", digest.to_uppercase())
}

/// A random token persisted at `path`, created on first use.
#[derive(Debug, Clone)]
pub struct FileTokenComponent {
    path: PathBuf,
}

impl FileTokenComponent {
    /// A token stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn new_token() -> String {
    (0..32)
        .map(|_| {
            let idx = random_range(0..16);
            char::from(b"0123456789abcdef"[idx])
        })
        .collect()
}

impl Component for FileTokenComponent {
    fn value(&self) -> Result<String, DeviceIdError> {
        if self.path.exists() {
            let token = fs::read_to_string(&self.path)?;
            if !token.trim().is_empty() {
                return Ok(token.trim().to_string());
            }
        }
        let token = new_token();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &token).inspect_err(|err| {
            warn!(path = %self.path.display(), error = %err, "could not persist token");
        })?;
        Ok(token)
    }
}
