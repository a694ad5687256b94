//! Ordered, OS-scoped collection of components plus the formatter that renders them.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::component::Component;
use crate::encoder::{Encoder, PlainTextEncoder};
use crate::formatter::{ConcatFormatter, EncodedValue, Formatter};
use crate::platform::Platform;

struct ComponentEntry {
    name: String,
    component: Box<dyn Component>,
    encoder: Arc<dyn Encoder>,
}

/// Builds a device identifier from named components.
///
/// Entries are kept in first-registration order. Registering an existing
/// name replaces its component and encoder but keeps its position.
///
/// ```
/// use deviceid::{ConcatFormatter, DeviceIdBuilder, ValueComponent};
///
/// let mut builder = DeviceIdBuilder::new();
/// builder
///     .add_component("A", ValueComponent::of("x"))
///     .use_formatter(ConcatFormatter::new("|"));
/// assert_eq!(builder.device_id().as_deref(), Some("A=x"));
/// ```
pub struct DeviceIdBuilder {
    platform: Platform,
    entries: Vec<ComponentEntry>,
    encoder: Arc<dyn Encoder>,
    formatter: Box<dyn Formatter>,
}

impl DeviceIdBuilder {
    /// Create a builder scoped to the running host.
    pub fn new() -> Self {
        Self::with_platform(Platform::current())
    }

    /// Create a builder that behaves as if running on `platform`.
    pub fn with_platform(platform: Platform) -> Self {
        Self {
            platform,
            entries: Vec::new(),
            encoder: Arc::new(PlainTextEncoder),
            formatter: Box::new(ConcatFormatter::default()),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Register `component` under `name` with the current default encoder.
    pub fn add_component<C>(&mut self, name: impl Into<String>, component: C) -> &mut Self
    where
        C: Component + 'static,
    {
        let encoder = Arc::clone(&self.encoder);
        self.insert(name.into(), Box::new(component), encoder)
    }

    /// Register `component` under `name` with its own encoder.
    pub fn add_encoded_component<C, E>(
        &mut self,
        name: impl Into<String>,
        component: C,
        encoder: E,
    ) -> &mut Self
    where
        C: Component + 'static,
        E: Encoder + 'static,
    {
        self.insert(name.into(), Box::new(component), Arc::new(encoder))
    }

    fn insert(
        &mut self,
        name: String,
        component: Box<dyn Component>,
        encoder: Arc<dyn Encoder>,
    ) -> &mut Self {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                entry.component = component;
                entry.encoder = encoder;
            }
            None => self.entries.push(ComponentEntry {
                name,
                component,
                encoder,
            }),
        }
        self
    }

    /// Set the encoder bundled with components registered from now on.
    pub fn use_encoder<E: Encoder + 'static>(&mut self, encoder: E) -> &mut Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Set the formatter. The last call wins.
    pub fn use_formatter<F: Formatter + 'static>(&mut self, formatter: F) -> &mut Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Run `configure` only when the builder's platform is `platform`.
    pub fn on_platform<F>(&mut self, platform: Platform, configure: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        if self.platform == platform {
            configure(self);
        }
        self
    }

    pub fn on_windows<F: FnOnce(&mut Self)>(&mut self, configure: F) -> &mut Self {
        self.on_platform(Platform::Windows, configure)
    }

    pub fn on_linux<F: FnOnce(&mut Self)>(&mut self, configure: F) -> &mut Self {
        self.on_platform(Platform::Linux, configure)
    }

    pub fn on_mac<F: FnOnce(&mut Self)>(&mut self, configure: F) -> &mut Self {
        self.on_platform(Platform::MacOs, configure)
    }

    /// Registered names in formatter order.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Backend label of the component registered as `name`, if it has one.
    pub fn component_source(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.component.source())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluate every component, in registration order.
    ///
    /// Components that produce nothing (or panic) contribute an empty value.
    pub fn evaluate(&self) -> Vec<EncodedValue> {
        self.entries
            .iter()
            .map(|entry| {
                let produced =
                    panic::catch_unwind(AssertUnwindSafe(|| entry.component.produce()))
                        .unwrap_or_else(|_| {
                            warn!(component = %entry.name, "component panicked");
                            None
                        });
                let value = produced
                    .map(|raw| entry.encoder.encode(&raw))
                    .unwrap_or_default();
                trace!(component = %entry.name, present = !value.is_empty(), "evaluated");
                EncodedValue::new(entry.name.clone(), value)
            })
            .collect()
    }

    /// Format already-evaluated values with this builder's formatter.
    pub fn format(&self, values: &[EncodedValue]) -> String {
        self.formatter.format(values)
    }

    /// Formatted identifier, even when every component came back empty.
    pub fn to_device_id(&self) -> String {
        self.format(&self.evaluate())
    }

    /// Formatted identifier, or `None` when no component produced a signal.
    pub fn device_id(&self) -> Option<String> {
        let values = self.evaluate();
        usable_id(&values, self.format(&values))
    }
}

/// An identifier counts only if it is non-empty and at least one component
/// contributed a real value.
pub(crate) fn usable_id(values: &[EncodedValue], formatted: String) -> Option<String> {
    if formatted.is_empty() || values.iter().all(EncodedValue::is_empty) {
        None
    } else {
        Some(formatted)
    }
}

impl Default for DeviceIdBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceIdBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_device_id())
    }
}

impl fmt::Debug for DeviceIdBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdBuilder")
            .field("platform", &self.platform)
            .field("components", &self.component_names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{FnComponent, ValueComponent};
    use crate::encoder::HashEncoder;
    use crate::formatter::StructuredFormatter;

    fn concat(platform: Platform) -> DeviceIdBuilder {
        let mut b = DeviceIdBuilder::with_platform(platform);
        b.use_formatter(ConcatFormatter::new("|"));
        b
    }

    #[test]
    fn test_single_component_concat() {
        let mut b = concat(Platform::Linux);
        b.add_component("A", ValueComponent::of("x"));
        assert_eq!(b.device_id().as_deref(), Some("A=x"));
        assert_eq!(b.to_string(), "A=x");
    }

    #[test]
    fn test_missing_values_are_kept_as_empty() {
        let mut b = concat(Platform::Linux);
        b.add_component("A", ValueComponent::none())
            .add_component("B", ValueComponent::of("y"));
        assert_eq!(b.device_id().as_deref(), Some("A=|B=y"));
    }

    #[test]
    fn test_all_empty_or_no_components_is_unusable() {
        let b = concat(Platform::Linux);
        assert_eq!(b.device_id(), None);
        assert_eq!(b.to_device_id(), "");

        let mut b = concat(Platform::Linux);
        b.add_component("A", ValueComponent::none());
        assert_eq!(b.device_id(), None);
        assert_eq!(b.to_device_id(), "A=");
    }

    #[test]
    fn test_duplicate_name_last_write_wins_first_position_kept() {
        let mut b = concat(Platform::Linux);
        b.add_component("A", ValueComponent::of("1"))
            .add_component("B", ValueComponent::of("2"))
            .add_component("A", ValueComponent::of("3"));
        assert_eq!(b.len(), 2);
        assert_eq!(b.device_id().as_deref(), Some("A=3|B=2"));
    }

    #[test]
    fn test_order_sensitivity() {
        let mut ab = concat(Platform::Linux);
        ab.add_component("A", ValueComponent::of("x"))
            .add_component("B", ValueComponent::of("y"));
        let mut ba = concat(Platform::Linux);
        ba.add_component("B", ValueComponent::of("y"))
            .add_component("A", ValueComponent::of("x"));
        assert_ne!(ab.device_id(), ba.device_id());
    }

    #[test]
    fn test_platform_scoping() {
        let mut b = concat(Platform::Linux);
        b.on_windows(|w| {
            w.add_component("Win", ValueComponent::of("w"));
        })
        .on_linux(|l| {
            l.add_component("Lin", ValueComponent::of("l"));
        })
        .on_mac(|m| {
            m.add_component("Mac", ValueComponent::of("m"));
        });
        assert_eq!(b.component_names().collect::<Vec<_>>(), vec!["Lin"]);
    }

    #[test]
    fn test_encoder_bound_at_registration() {
        let mut b = concat(Platform::Linux);
        b.add_component("Plain", ValueComponent::of("abc"))
            .use_encoder(HashEncoder::truncated(8))
            .add_component("Hashed", ValueComponent::of("abc"))
            .add_encoded_component(
                "Own",
                ValueComponent::of("abc"),
                crate::PlainTextEncoder,
            );
        assert_eq!(
            b.device_id().as_deref(),
            Some("Plain=abc|Hashed=ba7816bf|Own=abc")
        );
    }

    #[test]
    fn test_default_formatter_is_hashed() {
        let mut b = DeviceIdBuilder::with_platform(Platform::Linux);
        b.add_component("A", ValueComponent::of("x"));
        let id = b.device_id().unwrap();
        assert_eq!(id.len(), 64);
        assert_eq!(id, crate::encoder::sha256_hex(b"A=x"));
    }

    #[test]
    fn test_panicking_component_degrades() {
        let mut b = concat(Platform::Linux);
        b.add_component(
            "Boom",
            FnComponent::new(|| -> Option<String> { panic!("component exploded") }),
        )
        .add_component("Ok", ValueComponent::of("v"));
        assert_eq!(b.device_id().as_deref(), Some("Boom=|Ok=v"));
    }

    #[test]
    fn test_determinism_across_instances() {
        let make = || {
            let mut b = DeviceIdBuilder::with_platform(Platform::Linux);
            b.add_component("A", ValueComponent::of("x"))
                .add_component("B", ValueComponent::none())
                .use_formatter(StructuredFormatter);
            b
        };
        let first = make().device_id();
        assert_eq!(first, make().device_id());
        assert_eq!(first, make().device_id());
    }
}
