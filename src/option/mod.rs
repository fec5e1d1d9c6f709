//! The option vocabulary attached to routes and groups.
//!
//! Options are plain values folded left to right into a configuration
//! record. Free functions in this module are the usual way to build them:
//!
//! ```
//! use routespec::option;
//! use routespec::Structure;
//!
//! let options = [
//!     option::summary("List pets"),
//!     option::tags(&["pets"]),
//!     option::response(200, Structure::empty(), &[option::content_description("OK")]),
//! ];
//! assert_eq!(options.len(), 3);
//! ```

pub mod content;
pub mod group;
pub mod operation;

pub use content::{ContentConfig, ContentOption};
pub use group::{GroupConfig, GroupOption};
pub use operation::{OperationConfig, OperationOption};

use crate::schema::Structure;

/// A named security scheme plus the scopes an operation needs from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    /// Name of a scheme declared in [`crate::Config::security_schemes`].
    pub name: String,
    /// Required scopes (empty for non-OAuth schemes).
    pub scopes: Vec<String>,
}

impl SecurityRequirement {
    /// Creates a requirement.
    #[must_use]
    pub fn new(name: impl Into<String>, scopes: &[&str]) -> Self {
        Self {
            name: name.into(),
            scopes: to_strings(scopes),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Hides the operation.
#[must_use]
pub fn hide() -> OperationOption {
    OperationOption::Hide(true)
}

/// Hides the operation when `hidden` is `true`.
#[must_use]
pub fn hidden(hidden: bool) -> OperationOption {
    OperationOption::Hide(hidden)
}

/// Sets the operation id.
#[must_use]
pub fn operation_id(id: impl Into<String>) -> OperationOption {
    OperationOption::OperationId(id.into())
}

/// Sets the summary.
#[must_use]
pub fn summary(summary: impl Into<String>) -> OperationOption {
    OperationOption::Summary(summary.into())
}

/// Sets the description.
#[must_use]
pub fn description(description: impl Into<String>) -> OperationOption {
    OperationOption::Description(description.into())
}

/// Marks the operation deprecated.
#[must_use]
pub fn deprecated() -> OperationOption {
    OperationOption::Deprecated(true)
}

/// Appends tags to the operation.
#[must_use]
pub fn tags(tags: &[&str]) -> OperationOption {
    OperationOption::Tags(to_strings(tags))
}

/// Requires the named security scheme.
#[must_use]
pub fn security(name: impl Into<String>, scopes: &[&str]) -> OperationOption {
    OperationOption::Security(SecurityRequirement::new(name, scopes))
}

/// Adds a request body content.
#[must_use]
pub fn request(structure: Structure, options: &[ContentOption]) -> OperationOption {
    OperationOption::Request(ContentConfig::new(0, structure, options))
}

/// Adds a response with the given HTTP status.
#[must_use]
pub fn response(status: u16, structure: Structure, options: &[ContentOption]) -> OperationOption {
    OperationOption::Response(ContentConfig::new(status, structure, options))
}

/// Sets an explicit content type.
#[must_use]
pub fn content_type(content_type: impl Into<String>) -> ContentOption {
    ContentOption::ContentType(content_type.into())
}

/// Sets the content description.
#[must_use]
pub fn content_description(description: impl Into<String>) -> ContentOption {
    ContentOption::Description(description.into())
}

/// Places the response under the `default` key.
#[must_use]
pub fn default_response() -> ContentOption {
    ContentOption::Default(true)
}

/// Appends tags to every operation in a group.
#[must_use]
pub fn group_tags(tags: &[&str]) -> GroupOption {
    GroupOption::Tags(to_strings(tags))
}

/// Requires the named security scheme for every operation in a group.
#[must_use]
pub fn group_security(name: impl Into<String>, scopes: &[&str]) -> GroupOption {
    GroupOption::Security(SecurityRequirement::new(name, scopes))
}

/// Hides a group and everything beneath it.
#[must_use]
pub fn group_hidden() -> GroupOption {
    GroupOption::Hide(true)
}

/// Marks every operation in a group deprecated.
#[must_use]
pub fn group_deprecated() -> GroupOption {
    GroupOption::Deprecated(true)
}
