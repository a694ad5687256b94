//! Operating-system families and their command-line names.

/// Host operating-system families a builder can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Other
        }
    }

    /// Lowercase name, as accepted by [`Platform::parse`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Other => "other",
        }
    }

    /// Parse a platform name; `mac` is accepted for macOS.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" | "mac" => Some(Self::MacOs),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}
