//! The version-independent half of committing one route.
//!
//! Each reflector wraps its own operation type in an [`OperationContext`];
//! [`build`] drives that context through the merged [`OperationConfig`] in a
//! fixed order. The helpers here hold the rules both versions share: method
//! and path validation, response keys and descriptions, content types.

use http::{Method, StatusCode};

use crate::error::Error;
use crate::option::{ContentConfig, OperationConfig, SecurityRequirement};
use crate::path::PathParser;
use crate::schema::{JSON_CONTENT_TYPE, ResolvedSchema};

/// Response key of a response marked as default.
pub const DEFAULT_RESPONSE_KEY: &str = "default";

/// A version-specific operation under construction.
pub trait OperationContext {
    /// Marks the operation deprecated.
    fn set_deprecated(&mut self);
    /// Sets the operation id.
    fn set_operation_id(&mut self, id: &str);
    /// Sets the summary.
    fn set_summary(&mut self, summary: &str);
    /// Sets the description.
    fn set_description(&mut self, description: &str);
    /// Replaces the tag list.
    fn set_tags(&mut self, tags: &[String]);
    /// Appends a security requirement.
    fn add_security(&mut self, requirement: &SecurityRequirement);
    /// Attaches a request body content.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be attached.
    fn add_request(&mut self, content: &ContentConfig) -> Result<(), Error>;
    /// Attaches a response.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid or duplicate statuses and schemas that
    /// cannot be attached.
    fn add_response(&mut self, content: &ContentConfig) -> Result<(), Error>;
}

/// Applies `config` to `context`.
///
/// Returns `Ok(None)` when the operation is hidden; nothing else is applied
/// in that case.
///
/// # Errors
///
/// Returns the first request or response attachment failure.
pub fn build<C: OperationContext>(
    mut context: C,
    config: &OperationConfig,
) -> Result<Option<C>, Error> {
    if config.hide {
        return Ok(None);
    }
    if config.deprecated {
        context.set_deprecated();
    }
    if !config.operation_id.is_empty() {
        context.set_operation_id(&config.operation_id);
    }
    if !config.summary.is_empty() {
        context.set_summary(&config.summary);
    }
    if !config.description.is_empty() {
        context.set_description(&config.description);
    }
    if !config.tags.is_empty() {
        context.set_tags(&config.tags);
    }
    for requirement in &config.security {
        context.add_security(requirement);
    }
    for request in &config.requests {
        context.add_request(request)?;
    }
    for response in &config.responses {
        context.add_response(response)?;
    }
    Ok(Some(context))
}

/// A route that passed method and path validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    /// Normalised method.
    pub method: Method,
    /// OpenAPI path template.
    pub path: String,
}

impl RouteTarget {
    /// Validates `method` and translates `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedMethod`] for methods OpenAPI has no slot
    /// for, and [`Error::InvalidPath`] when `parser` rejects the path.
    pub fn parse(
        method: &str,
        path: &str,
        parser: Option<&dyn PathParser>,
    ) -> Result<Self, Error> {
        let method = parse_method(method)?;
        let path = match parser {
            Some(parser) => parser.parse(path).map_err(|reason| Error::InvalidPath {
                path: path.to_string(),
                reason,
            })?,
            None => path.to_string(),
        };
        Ok(Self { method, path })
    }

    /// `METHOD /path` context string used in error messages.
    #[must_use]
    pub fn context(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// [`Error::DuplicateOperation`] for this route.
    #[must_use]
    pub fn duplicate(&self) -> Error {
        Error::DuplicateOperation {
            method: self.method.to_string(),
            path: self.path.clone(),
        }
    }

    /// [`Error::DuplicateResponse`] for `status` on this route.
    #[must_use]
    pub fn duplicate_response(&self, status: &str) -> Error {
        Error::DuplicateResponse {
            method: self.method.to_string(),
            path: self.path.clone(),
            status: status.to_string(),
        }
    }

    /// [`Error::Schema`] for this route.
    #[must_use]
    pub fn schema_error(&self, reason: impl Into<String>) -> Error {
        Error::Schema {
            context: self.context(),
            reason: reason.into(),
        }
    }

    /// Response map key for `content`: `default`, or the validated status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStatus`] for statuses outside `100..=999`.
    pub fn response_key(&self, content: &ContentConfig) -> Result<String, Error> {
        if content.is_default {
            return Ok(DEFAULT_RESPONSE_KEY.to_string());
        }
        StatusCode::from_u16(content.http_status)
            .map(|status| status.as_u16().to_string())
            .map_err(|_| Error::InvalidStatus {
                method: self.method.to_string(),
                path: self.path.clone(),
                status: content.http_status,
            })
    }
}

/// Parses a case-insensitive method name into one of the eight methods an
/// OpenAPI path item has slots for.
///
/// # Errors
///
/// Returns [`Error::UnsupportedMethod`] for anything else.
pub fn parse_method(method: &str) -> Result<Method, Error> {
    let unsupported = || Error::UnsupportedMethod {
        method: method.to_string(),
    };
    let parsed = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| unsupported())?;
    match parsed {
        Method::GET
        | Method::PUT
        | Method::POST
        | Method::DELETE
        | Method::OPTIONS
        | Method::HEAD
        | Method::PATCH
        | Method::TRACE => Ok(parsed),
        _ => Err(unsupported()),
    }
}

/// Description of a response: the explicit one, else the status reason.
#[must_use]
pub fn response_description(content: &ContentConfig) -> String {
    if let Some(description) = &content.description {
        return description.clone();
    }
    if content.is_default {
        return "Default response".to_string();
    }
    StatusCode::from_u16(content.http_status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Response")
        .to_string()
}

/// MIME type of `content`: explicit, inferred from the schema, or JSON.
#[must_use]
pub fn content_type(content: &ContentConfig, resolved: Option<&ResolvedSchema>) -> String {
    content
        .content_type
        .clone()
        .or_else(|| resolved.map(|r| r.content_type.to_string()))
        .unwrap_or_else(|| JSON_CONTENT_TYPE.to_string())
}

/// Collapses a route's component definitions to one entry per name.
///
/// `registered` looks a name up in the document's existing components.
///
/// # Errors
///
/// Returns [`Error::ConflictingSchema`] when a name is bound to two
/// different schemas, whether both come from the route or one is already
/// in the document.
pub fn merge_definitions<'a, S: PartialEq + 'a>(
    definitions: Vec<(String, S)>,
    registered: impl Fn(&str) -> Option<&'a S>,
) -> Result<Vec<(String, S)>, Error> {
    let mut merged: Vec<(String, S)> = Vec::with_capacity(definitions.len());
    for (name, schema) in definitions {
        if let Some((_, seen)) = merged.iter().find(|(seen, _)| *seen == name) {
            if *seen != schema {
                return Err(Error::ConflictingSchema { name });
            }
            continue;
        }
        if registered(&name).is_some_and(|existing| *existing != schema) {
            return Err(Error::ConflictingSchema { name });
        }
        merged.push((name, schema));
    }
    Ok(merged)
}
