//! Formatters combine the ordered `(name, value)` pairs into the final identifier.

use serde::{Deserialize, Serialize};

use crate::encoder::sha256_hex;
use crate::error::DeviceIdError;

/// One component's contribution after encoding.
///
/// A component that produced nothing is carried with an empty `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedValue {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl EncodedValue {
    /// Pair `name` with its encoded `value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Pure function from ordered pairs to an identifier string.
pub trait Formatter: Send + Sync {
    fn format(&self, values: &[EncodedValue]) -> String;
}

/// `name=value` pairs joined by a separator, optionally compressed to a
/// SHA-256 hex digest.
///
/// A backslash escapes any `\`, separator or (in names) `=` occurring inside
/// a name or value, so distinct pair lists never join to the same string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatFormatter {
    separator: String,
    hashed: bool,
}

impl ConcatFormatter {
    /// Plain joined output.
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            hashed: false,
        }
    }

    /// SHA-256 hex digest of the joined output.
    pub fn hashed(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            hashed: true,
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    fn escape(&self, text: &str, out: &mut String, is_name: bool) {
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            if !self.separator.is_empty() && rest.starts_with(self.separator.as_str()) {
                out.push('\\');
                out.push_str(&self.separator);
                rest = &rest[self.separator.len()..];
                continue;
            }
            if c == '\\' || (is_name && c == '=') {
                out.push('\\');
            }
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    fn joined(&self, values: &[EncodedValue]) -> String {
        let mut out = String::new();
        for (i, v) in values.iter().enumerate() {
            if i > 0 {
                out.push_str(&self.separator);
            }
            self.escape(&v.name, &mut out, true);
            out.push('=');
            self.escape(&v.value, &mut out, false);
        }
        out
    }
}

impl Default for ConcatFormatter {
    fn default() -> Self {
        Self::hashed(".")
    }
}

impl Formatter for ConcatFormatter {
    fn format(&self, values: &[EncodedValue]) -> String {
        if values.is_empty() {
            return String::new();
        }
        let joined = self.joined(values);
        if self.hashed {
            sha256_hex(joined.as_bytes())
        } else {
            joined
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StructuredDocument {
    #[serde(default)]
    components: Vec<EncodedValue>,
}

/// Compact JSON document listing every component in registration order.
///
/// ```text
/// {"components":[{"name":"MachineId","value":"..."}]}
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructuredFormatter;

impl StructuredFormatter {
    /// Read back a document produced by [`StructuredFormatter::format`].
    pub fn parse(document: &str) -> Result<Vec<EncodedValue>, DeviceIdError> {
        let parsed: StructuredDocument = serde_json::from_str(document)?;
        Ok(parsed.components)
    }
}

impl Formatter for StructuredFormatter {
    fn format(&self, values: &[EncodedValue]) -> String {
        if values.is_empty() {
            return String::new();
        }
        let document = StructuredDocument {
            components: values.to_vec(),
        };
        // Serializing plain strings cannot fail.
        serde_json::to_string(&document).unwrap_or_default()
    }
}
