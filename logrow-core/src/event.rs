//! Log event model handed to the sink by the host logging framework.

use crate::{LogRowError, PropertyBag, PropertyValue, UnsupportedError};
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// LEVEL
// ============================================================================

/// Severity of a log event, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Level {
    Verbose,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl Level {
    /// Canonical name stored in the level column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Level {
    type Err = LogRowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "verbose" | "trace" => Ok(Level::Verbose),
            "debug" => Ok(Level::Debug),
            "information" | "info" => Ok(Level::Information),
            "warning" | "warn" => Ok(Level::Warning),
            "error" | "err" => Ok(Level::Error),
            "fatal" | "critical" => Ok(Level::Fatal),
            _ => Err(UnsupportedError::Level {
                level: s.to_string(),
            }
            .into()),
        }
    }
}

impl TryFrom<String> for Level {
    type Error = LogRowError;

    fn try_from(value: String) -> Result<Self, LogRowError> {
        value.parse()
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.as_str().to_string()
    }
}

// ============================================================================
// MESSAGE TEMPLATE
// ============================================================================

/// Unrendered message text with `{Name}` holes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageTemplate {
    text: String,
}

impl MessageTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute holes from `properties`.
    ///
    /// Holes may carry a `@` or `$` operator and a `:format` suffix; only the
    /// `l` format changes output (strings unquoted). `{{` and `}}` escape
    /// braces. Holes without a matching property are copied verbatim.
    pub fn render(&self, properties: &PropertyBag) -> String {
        let text = self.text.as_str();
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find(&['{', '}'][..]) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
            } else if tail.starts_with('}') {
                out.push('}');
                rest = &tail[1..];
            } else {
                match tail.find('}') {
                    Some(end) => {
                        let hole = &tail[1..end];
                        match render_hole(hole, properties) {
                            Some(rendered) => out.push_str(&rendered),
                            None => out.push_str(&tail[..=end]),
                        }
                        rest = &tail[end + 1..];
                    }
                    None => {
                        out.push_str(tail);
                        rest = "";
                    }
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn render_hole(hole: &str, properties: &PropertyBag) -> Option<String> {
    let hole = hole
        .strip_prefix('@')
        .or_else(|| hole.strip_prefix('$'))
        .unwrap_or(hole);
    let (name, format) = match hole.split_once(':') {
        Some((name, format)) => (name, Some(format)),
        None => (hole, None),
    };
    // Alignment (`{Name,10}`) is accepted and ignored.
    let name = name.split(',').next().unwrap_or(name);
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    let value = properties.get(name)?;
    Some(match (value, format) {
        (PropertyValue::Scalar(_), Some(f)) if f.contains('l') => value.to_literal(),
        _ => value.to_string(),
    })
}

impl fmt::Display for MessageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for MessageTemplate {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for MessageTemplate {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

// ============================================================================
// LOG EVENT
// ============================================================================

/// One structured log event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Instant of the event, in the offset it was recorded with.
    pub timestamp: DateTime<FixedOffset>,
    pub level: Level,
    pub message_template: MessageTemplate,
    /// Full text of an attached exception, if any.
    pub exception: Option<String>,
    pub properties: PropertyBag,
}

impl LogEvent {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        level: Level,
        message_template: impl Into<MessageTemplate>,
    ) -> Self {
        Self {
            timestamp,
            level,
            message_template: message_template.into(),
            exception: None,
            properties: PropertyBag::new(),
        }
    }

    /// Event stamped with the current local time.
    pub fn now(level: Level, message_template: impl Into<MessageTemplate>) -> Self {
        Self::new(Local::now().fixed_offset(), level, message_template)
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push(name, value);
        self
    }

    pub fn with_exception(mut self, text: impl Into<String>) -> Self {
        self.exception = Some(text.into());
        self
    }

    /// Attach an error and its source chain, one `Caused by:` line per source.
    pub fn with_error(self, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut text = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            text.push_str("\nCaused by: ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        self.with_exception(text)
    }

    pub fn render_message(&self) -> String {
        self.message_template.render(&self.properties)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2021-03-04T10:15:30.123456+02:00").unwrap()
    }

    #[test]
    fn test_level_names() {
        assert_eq!(Level::Information.to_string(), "Information");
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("FATAL".parse::<Level>().unwrap(), Level::Fatal);
        assert!("loud".parse::<Level>().is_err());
        assert!(Level::Verbose < Level::Fatal);
    }

    #[test]
    fn test_level_serde_uses_names() {
        let level: Level = serde_json::from_str("\"Error\"").unwrap();
        assert_eq!(level, Level::Error);
        assert_eq!(Level::try_from("warn".to_string()).unwrap(), Level::Warning);
        assert_eq!(serde_json::to_string(&Level::Fatal).unwrap(), "\"Fatal\"");
        assert!(serde_json::from_str::<Level>("\"loud\"").is_err());
    }

    #[test]
    fn test_now_is_current() {
        let before = chrono::Utc::now();
        let event = LogEvent::now(Level::Debug, "tick");
        assert!(event.timestamp >= before);
        assert!(event.timestamp <= chrono::Utc::now());
        assert!(event.properties.is_empty());
    }

    #[test]
    fn test_render_substitutes_properties() {
        let event = LogEvent::new(at(), Level::Information, "User {user} logged in {count} times")
            .with_property("user", "alice")
            .with_property("count", 3i64);
        assert_eq!(event.render_message(), "User \"alice\" logged in 3 times");
    }

    #[test]
    fn test_render_literal_format_and_operators() {
        let event = LogEvent::new(at(), Level::Debug, "{user:l} via {@client} / {$tags}")
            .with_property("user", "alice")
            .with_property("client", PropertyValue::structure(Some("Client"), vec![("Id", 7i64.into())]))
            .with_property("tags", vec!["a"]);
        assert_eq!(
            event.render_message(),
            "alice via Client { Id: 7 } / [\"a\"]"
        );
    }

    #[test]
    fn test_render_keeps_unknown_holes_and_escapes() {
        let event = LogEvent::new(at(), Level::Warning, "{{literal}} {missing} {bad name} }");
        assert_eq!(event.render_message(), "{literal} {missing} {bad name} }");
    }

    #[test]
    fn test_render_unterminated_hole() {
        let event = LogEvent::new(at(), Level::Warning, "open {user").with_property("user", "x");
        assert_eq!(event.render_message(), "open {user");
    }

    #[test]
    fn test_with_error_includes_source_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "write failed")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::other("disk full"));
        let event = LogEvent::new(at(), Level::Error, "boom").with_error(&err);
        assert_eq!(
            event.exception.as_deref(),
            Some("write failed\nCaused by: disk full")
        );
    }
}
