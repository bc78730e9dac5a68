//! Message registry documents.
//!
//! A registry maps message keys to templates with `%1`..`%N` positional
//! placeholders, a default severity and a resolution text.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::types::message::Severity;

/// A Redfish `MessageRegistry` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageRegistry {
    /// Registry identifier, e.g. `Base.1.16.0`.
    #[serde(default)]
    pub id: String,

    /// Registry name used as the `MessageId` prefix.
    #[serde(default)]
    pub registry_prefix: String,

    /// Version string, e.g. `1.16.0`.
    #[serde(default)]
    pub registry_version: String,

    /// Language of the templates.
    #[serde(default)]
    pub language: Option<String>,

    /// Templates by message key. Entries that are not valid message
    /// definitions are dropped.
    #[serde(default, deserialize_with = "usable_messages")]
    pub messages: HashMap<String, RegistryMessage>,
}

fn usable_messages<'de, D>(deserializer: D) -> Result<HashMap<String, RegistryMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<HashMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value(value) {
            Ok(message) => Some((key, message)),
            Err(err) => {
                tracing::debug!(key = %key, error = %err, "skipping unusable registry message");
                None
            },
        })
        .collect())
}

impl MessageRegistry {
    /// Major version from `RegistryVersion`, falling back to the `Id`.
    pub fn major_version(&self) -> Option<u32> {
        let from_version = self
            .registry_version
            .split('.')
            .next()
            .and_then(|v| v.parse().ok());
        from_version.or_else(|| {
            self.id
                .split('.')
                .find_map(|segment| segment.parse().ok())
        })
    }

    /// Looks up a message template by key.
    pub fn message(&self, key: &str) -> Option<&RegistryMessage> {
        self.messages.get(key)
    }
}

/// One message definition within a registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegistryMessage {
    /// What the message means.
    #[serde(default)]
    pub description: Option<String>,

    /// Template text with `%1`..`%N` placeholders.
    pub message: String,

    /// Number of positional arguments the template expects.
    #[serde(default)]
    pub number_of_args: usize,

    /// Default severity (current property name).
    #[serde(default)]
    pub message_severity: Option<String>,

    /// Default severity (deprecated property name).
    #[serde(default)]
    pub severity: Option<String>,

    /// Resolution template.
    #[serde(default)]
    pub resolution: Option<String>,
}

impl RegistryMessage {
    /// Registry default severity.
    pub fn default_severity(&self) -> Option<Severity> {
        self.message_severity
            .as_deref()
            .and_then(Severity::parse)
            .or_else(|| self.severity.as_deref().and_then(Severity::parse))
    }

    /// Renders the template with `args`.
    pub fn render(&self, args: &[String]) -> String {
        substitute(&self.message, args)
    }

    /// Renders the resolution template with `args`.
    pub fn render_resolution(&self, args: &[String]) -> Option<String> {
        self.resolution.as_deref().map(|r| substitute(r, args))
    }
}

/// Replaces `%1`..`%N` in `template` with the matching positional argument.
///
/// Placeholders without a matching argument are left as written, so a
/// short argument list never hides the template.
///
/// # Examples
///
/// ```
/// use tacklebox::types::registry::substitute;
///
/// let text = substitute(
///     "The value %1 for the property %2 is not in the list of acceptable values.",
///     &["Blue".to_string(), "IndicatorLED".to_string()],
/// );
/// assert_eq!(
///     text,
///     "The value Blue for the property IndicatorLED is not in the list of acceptable values."
/// );
/// ```
pub fn substitute(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut digits = String::new();
        while let Some(&d) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            digits.push(d);
            chars.next();
        }

        match digits.parse::<usize>() {
            Ok(n) if n >= 1 && n <= args.len() => out.push_str(&args[n - 1]),
            _ => {
                out.push('%');
                out.push_str(&digits);
            },
        }
    }

    out
}
