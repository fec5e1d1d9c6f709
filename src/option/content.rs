//! Request and response content descriptions.

use crate::schema::Structure;

/// One content-level configuration mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOption {
    /// Explicit MIME type; inferred from the structure when absent.
    ContentType(String),
    /// Human-readable description.
    Description(String),
    /// Marks a response as the operation's `default` response.
    Default(bool),
}

/// A request or response payload description.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// HTTP status (responses only, `0` for requests).
    pub http_status: u16,
    /// Explicit MIME type.
    pub content_type: Option<String>,
    /// Shape of the payload.
    pub structure: Structure,
    /// Description.
    pub description: Option<String>,
    /// Response goes under the `default` key.
    pub is_default: bool,
}

impl ContentConfig {
    /// Builds a content description by folding `options` in order.
    #[must_use]
    pub fn new(http_status: u16, structure: Structure, options: &[ContentOption]) -> Self {
        let mut config = Self {
            http_status,
            content_type: None,
            structure,
            description: None,
            is_default: false,
        };
        for option in options {
            config.apply(option);
        }
        config
    }

    /// Applies one option.
    pub fn apply(&mut self, option: &ContentOption) {
        match option {
            ContentOption::ContentType(content_type) => {
                self.content_type = Some(content_type.clone());
            }
            ContentOption::Description(description) => {
                self.description = Some(description.clone());
            }
            ContentOption::Default(is_default) => self.is_default = *is_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_fold_last_wins() {
        let config = ContentConfig::new(
            201,
            Structure::empty(),
            &[
                ContentOption::ContentType("text/plain".to_string()),
                ContentOption::ContentType("application/xml".to_string()),
                ContentOption::Description("created".to_string()),
                ContentOption::Default(true),
            ],
        );
        assert_eq!(config.http_status, 201);
        assert_eq!(config.content_type.as_deref(), Some("application/xml"));
        assert_eq!(config.description.as_deref(), Some("created"));
        assert!(config.is_default);
        assert!(config.structure.is_empty());
    }

    #[test]
    fn defaults_without_options() {
        let config = ContentConfig::new(200, Structure::empty(), &[]);
        assert!(config.content_type.is_none());
        assert!(config.description.is_none());
        assert!(!config.is_default);
    }
}
