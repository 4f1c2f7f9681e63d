//! Monitored source definitions

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Placeholder replaced by the row label when rendering a message
pub const LABEL_PLACEHOLDER: &str = "{label}";

/// One monitored worksheet range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Worksheet title
    pub name: String,

    /// Alert when a row's value is strictly greater than this
    pub threshold: f64,

    /// Message sent to the channel, containing `{label}` once
    pub message_template: String,

    /// Range holding `[value, label]` per row
    #[serde(default = "default_value_range")]
    pub value_range: String,

    /// Range holding `[entity id]` per row, aligned with `value_range`
    #[serde(default = "default_id_range")]
    pub id_range: String,
}

fn default_value_range() -> String {
    "B2:D10".to_string()
}

fn default_id_range() -> String {
    "A2:A10".to_string()
}

impl SourceConfig {
    /// Create a source with the default ranges
    pub fn new(name: impl Into<String>, threshold: f64, message_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            threshold,
            message_template: message_template.into(),
            value_range: default_value_range(),
            id_range: default_id_range(),
        }
    }

    /// Render the alert message for a row label
    pub fn render_message(&self, label: &str) -> String {
        self.message_template.replacen(LABEL_PLACEHOLDER, label, 1)
    }

    /// Validate this source definition
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("source name must not be empty"));
        }

        if !self.threshold.is_finite() {
            return Err(Error::config(format!(
                "source '{}': threshold must be a finite number",
                self.name
            )));
        }

        if self.message_template.matches(LABEL_PLACEHOLDER).count() != 1 {
            return Err(Error::config(format!(
                "source '{}': message_template must contain {} exactly once",
                self.name, LABEL_PLACEHOLDER
            )));
        }

        if self.value_range.trim().is_empty() || self.id_range.trim().is_empty() {
            return Err(Error::config(format!(
                "source '{}': value_range and id_range are required",
                self.name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_message() {
        let source = SourceConfig::new("LINE", 400.0, "`{label}` is trending");
        assert_eq!(source.render_message("Story X"), "`Story X` is trending");
    }

    #[test]
    fn test_label_braces_are_not_expanded_twice() {
        let source = SourceConfig::new("LINE", 400.0, "{label}!");
        assert_eq!(source.render_message("{label}"), "{label}!");
    }

    #[test]
    fn test_template_requires_single_placeholder() {
        assert!(SourceConfig::new("A", 1.0, "no placeholder").validate().is_err());
        assert!(SourceConfig::new("A", 1.0, "{label} {label}").validate().is_err());
        assert!(SourceConfig::new("A", 1.0, "{label}").validate().is_ok());
    }

    #[test]
    fn test_threshold_must_be_finite() {
        assert!(SourceConfig::new("A", f64::NAN, "{label}").validate().is_err());
        assert!(SourceConfig::new(" ", 1.0, "{label}").validate().is_err());
    }
}
