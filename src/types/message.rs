//! Extended-error message types.
//!
//! Redfish reports outcomes as lists of registry-qualified messages,
//! found under `error.@Message.ExtendedInfo`, a top-level
//! `@Message.ExtendedInfo`, or a Task's `Messages` array. Each entry names
//! a `MessageId` of the form `Registry.Major.Minor.Key` plus positional
//! arguments.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Message severity, ordered from least to most severe.
///
/// # Examples
///
/// ```
/// use tacklebox::Severity;
///
/// assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
/// assert!(Severity::Warning < Severity::Critical);
/// assert_eq!(Severity::parse("Informational"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational or success.
    #[serde(rename = "OK")]
    Ok,
    /// Needs attention but the operation did not fail.
    Warning,
    /// The operation failed.
    Critical,
}

impl Severity {
    /// Parses a wire severity, ignoring ASCII case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ok" => Some(Self::Ok),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Warning => f.write_str("Warning"),
            Self::Critical => f.write_str("Critical"),
        }
    }
}

/// A parsed `MessageId`.
///
/// Accepts `Registry.Major.Minor.Key`, `Registry.Major.Minor.Errata.Key`,
/// `Registry.Major.Key` and `Registry.Key`. Registry names may themselves
/// contain dots (`Contoso.Storage.1.0.DiskFault`).
///
/// # Examples
///
/// ```
/// use tacklebox::MessageId;
///
/// let id = MessageId::parse("Base.1.8.PropertyValueNotInList").unwrap();
/// assert_eq!(id.registry, "Base");
/// assert_eq!(id.major, Some(1));
/// assert_eq!(id.minor, Some(8));
/// assert_eq!(id.key, "PropertyValueNotInList");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId {
    /// Registry name (`RegistryPrefix`).
    pub registry: String,
    /// Major version, when present.
    pub major: Option<u32>,
    /// Minor version, when present.
    pub minor: Option<u32>,
    /// Message key within the registry.
    pub key: String,
}

impl MessageId {
    /// Parses a `MessageId`; returns `None` when no registry or key can be
    /// identified.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts: Vec<&str> = raw.trim().split('.').collect();
        let key = parts.pop().filter(|k| !k.is_empty())?;

        let mut versions = Vec::new();
        while let Some(last) = parts.last() {
            match last.parse::<u32>() {
                Ok(v) if parts.len() > 1 => {
                    versions.push(v);
                    parts.pop();
                },
                _ => break,
            }
        }
        versions.reverse();

        if parts.is_empty()
            || parts.iter().any(|p| p.is_empty())
            || parts[0].parse::<u32>().is_ok()
        {
            return None;
        }

        Some(Self {
            registry: parts.join("."),
            major: versions.first().copied(),
            minor: versions.get(1).copied(),
            key: key.to_string(),
        })
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.registry)?;
        if let Some(major) = self.major {
            write!(f, ".{major}")?;
        }
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
        }
        write!(f, ".{}", self.key)
    }
}

/// One entry of an extended-error message list, as sent by the service.
///
/// Severity is kept as raw text: services send both `MessageSeverity` and
/// the deprecated `Severity`, sometimes with values outside the schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageEntry {
    /// Registry-qualified identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Service-rendered message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Positional substitution arguments. `null` reads as no arguments.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub message_args: Vec<Value>,

    /// Severity (current property name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_severity: Option<String>,

    /// Severity (deprecated property name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// Recommended corrective action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl MessageEntry {
    /// Severity set explicitly on the entry, if recognisable.
    /// `MessageSeverity` wins over the deprecated `Severity`.
    pub fn explicit_severity(&self) -> Option<Severity> {
        self.message_severity
            .as_deref()
            .and_then(Severity::parse)
            .or_else(|| self.severity.as_deref().and_then(Severity::parse))
    }

    /// Arguments rendered as text. Strings are taken verbatim, other JSON
    /// values use their JSON representation.
    pub fn args(&self) -> Vec<String> {
        self.message_args
            .iter()
            .map(|arg| match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Reads an explicit JSON `null` as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A message after registry lookup and argument substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedMessage {
    /// Registry-qualified identifier.
    pub id: String,
    /// Effective severity.
    pub severity: Severity,
    /// Human-readable text.
    pub text: String,
    /// Recommended corrective action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl fmt::Display for DecodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.id, self.severity, self.text)?;
        if let Some(resolution) = &self.resolution {
            write!(f, " Resolution: {resolution}")?;
        }
        Ok(())
    }
}
