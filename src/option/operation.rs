//! Operation-level options and their merged configuration.

use super::SecurityRequirement;
use super::content::ContentConfig;

/// One operation-level configuration mutation.
#[derive(Debug, Clone)]
pub enum OperationOption {
    /// Suppresses the operation when `true`.
    Hide(bool),
    /// Sets the operation id.
    OperationId(String),
    /// Sets the summary (and seeds an empty description).
    Summary(String),
    /// Sets the description.
    Description(String),
    /// Marks the operation deprecated when `true`.
    Deprecated(bool),
    /// Appends tags.
    Tags(Vec<String>),
    /// Appends a security requirement.
    Security(SecurityRequirement),
    /// Appends a request body content.
    Request(ContentConfig),
    /// Appends a response.
    Response(ContentConfig),
}

/// Operation metadata merged from an ordered list of [`OperationOption`]s.
#[derive(Debug, Clone, Default)]
pub struct OperationConfig {
    /// Operation is suppressed.
    pub hide: bool,
    /// Operation is deprecated.
    pub deprecated: bool,
    /// Operation id (empty when unset).
    pub operation_id: String,
    /// Summary (empty when unset).
    pub summary: String,
    /// Description (empty when unset).
    pub description: String,
    /// Tags, inherited ones first.
    pub tags: Vec<String>,
    /// Security requirements, inherited ones first.
    pub security: Vec<SecurityRequirement>,
    /// Request contents in declaration order.
    pub requests: Vec<ContentConfig>,
    /// Responses in declaration order.
    pub responses: Vec<ContentConfig>,
}

impl OperationConfig {
    /// Folds `options` in order.
    #[must_use]
    pub fn resolve<'a>(options: impl IntoIterator<Item = &'a OperationOption>) -> Self {
        let mut config = Self::default();
        for option in options {
            config.apply(option);
        }
        config
    }

    /// Applies one option.
    pub fn apply(&mut self, option: &OperationOption) {
        match option {
            OperationOption::Hide(hide) => self.hide = *hide,
            OperationOption::OperationId(id) => self.operation_id.clone_from(id),
            OperationOption::Summary(summary) => {
                self.summary.clone_from(summary);
                if self.description.is_empty() {
                    self.description.clone_from(summary);
                }
            }
            OperationOption::Description(description) => {
                self.description.clone_from(description);
            }
            OperationOption::Deprecated(deprecated) => self.deprecated = *deprecated,
            OperationOption::Tags(tags) => self.tags.extend(tags.iter().cloned()),
            OperationOption::Security(requirement) => self.security.push(requirement.clone()),
            OperationOption::Request(content) => self.requests.push(content.clone()),
            OperationOption::Response(content) => self.responses.push(content.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option;
    use crate::schema::Structure;

    #[test]
    fn summary_seeds_empty_description_once() {
        let config = OperationConfig::resolve(&[option::summary("List pets")]);
        assert_eq!(config.summary, "List pets");
        assert_eq!(config.description, "List pets");

        let config = OperationConfig::resolve(&[
            option::description("Long text"),
            option::summary("Short"),
        ]);
        assert_eq!(config.description, "Long text");

        let config = OperationConfig::resolve(&[
            option::summary("First"),
            option::summary("Second"),
        ]);
        assert_eq!(config.summary, "Second");
        assert_eq!(config.description, "First");
    }

    #[test]
    fn explicit_description_after_summary_wins() {
        let config = OperationConfig::resolve(&[
            option::summary("Short"),
            option::description("Detailed"),
        ]);
        assert_eq!(config.summary, "Short");
        assert_eq!(config.description, "Detailed");
    }

    #[test]
    fn booleans_last_wins_sequences_append() {
        let config = OperationConfig::resolve(&[
            option::deprecated(),
            option::tags(&["a"]),
            option::security("key", &[]),
            OperationOption::Deprecated(false),
            option::tags(&["a", "b"]),
            option::security("oauth", &["read"]),
            option::hide(),
            OperationOption::Hide(false),
        ]);
        assert!(!config.deprecated);
        assert!(!config.hide);
        assert_eq!(config.tags, vec!["a", "a", "b"]);
        assert_eq!(config.security.len(), 2);
        assert_eq!(
            config.security.last().map(|s| s.scopes.clone()),
            Some(vec!["read".to_string()])
        );
    }

    #[test]
    fn contents_keep_declaration_order() {
        let config = OperationConfig::resolve(&[
            option::response(200, Structure::empty(), &[]),
            option::request(Structure::empty(), &[]),
            option::response(404, Structure::empty(), &[]),
        ]);
        assert_eq!(config.requests.len(), 1);
        let statuses: Vec<u16> = config.responses.iter().map(|r| r.http_status).collect();
        assert_eq!(statuses, vec![200, 404]);
    }
}
