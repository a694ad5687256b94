//! The signal-provider abstraction and its two trivial implementations.

use tracing::debug;

use crate::error::DeviceIdError;

/// A provider of one identity signal.
///
/// Implementors report failures through [`Component::value`]; callers go
/// through [`Component::produce`], which never fails.
pub trait Component: Send + Sync {
    /// Retrieve the raw signal.
    fn value(&self) -> Result<String, DeviceIdError>;

    /// Retrieve the signal, folding every failure and blank output into `None`.
    fn produce(&self) -> Option<String> {
        match self.value() {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    debug!("signal produced a blank value");
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(err) => {
                debug!(error = %err, "signal unavailable");
                None
            }
        }
    }

    /// Where the signal is read from, for components with a pluggable backend.
    fn source(&self) -> Option<&str> {
        None
    }
}

/// A component with a value captured at construction.
#[derive(Debug, Clone, Default)]
pub struct ValueComponent {
    value: Option<String>,
}

impl ValueComponent {
    /// A component that reports `value`, or nothing when `None`.
    pub fn new(value: Option<String>) -> Self {
        Self { value }
    }

    /// A component that always reports `value`.
    pub fn of(value: impl Into<String>) -> Self {
        Self::new(Some(value.into()))
    }

    /// A component that never produces anything.
    pub fn none() -> Self {
        Self::new(None)
    }
}

impl Component for ValueComponent {
    fn value(&self) -> Result<String, DeviceIdError> {
        self.value
            .clone()
            .ok_or_else(|| DeviceIdError::unavailable("no value supplied"))
    }
}

/// A component backed by a closure, evaluated on every call.
pub struct FnComponent<F> {
    f: F,
}

impl<F> FnComponent<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    /// Wrap a closure returning the signal, or `None` when unavailable.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Component for FnComponent<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn value(&self) -> Result<String, DeviceIdError> {
        (self.f)().ok_or_else(|| DeviceIdError::unavailable("closure returned nothing"))
    }
}
