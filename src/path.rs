//! Route path normalisation and path-parameter translation.
//!
//! Paths registered on a [`crate::Router`] are joined with the prefix of the
//! group they belong to and cleaned (`.`/`..` resolved, duplicate slashes
//! collapsed, trailing slash removed). Routing libraries that spell path
//! parameters differently than OpenAPI (`:id` instead of `{id}`) plug in a
//! [`PathParser`].

use std::fmt;

/// Joins `prefix` and `path` and cleans the result.
///
/// The result is always absolute and never ends in `/` unless it is the root.
#[must_use]
pub fn join(prefix: &str, path: &str) -> String {
    clean(&format!("{prefix}/{path}"))
}

/// Lexically cleans a slash-separated path.
///
/// ```
/// assert_eq!(routespec::path::clean("/api//v1/./pets/../users/"), "/api/v1/users");
/// assert_eq!(routespec::path::clean(""), "/");
/// ```
#[must_use]
pub fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Returns the `{name}` placeholders of an OpenAPI path, in order.
#[must_use]
pub fn parameters(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let after = rest.get(open + 1..).unwrap_or_default();
        let Some(close) = after.find('}') else {
            break;
        };
        let name = after.get(..close).unwrap_or_default();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = after.get(close + 1..).unwrap_or_default();
    }
    names
}

/// Translates a framework route pattern into an OpenAPI path template.
pub trait PathParser: Send + Sync + fmt::Debug {
    /// Returns the OpenAPI form of `path`.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the pattern cannot be translated.
    fn parse(&self, path: &str) -> Result<String, String>;
}

/// Translates `:name` and `*name` segments into `{name}`.
///
/// Used for routers in the express/gin/httprouter family. Segments that are
/// already in `{name}` form pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColonPathParser;

impl PathParser for ColonPathParser {
    fn parse(&self, path: &str) -> Result<String, String> {
        let mut out = Vec::new();
        for segment in path.split('/') {
            let name = segment
                .strip_prefix(':')
                .or_else(|| segment.strip_prefix('*'));
            match name {
                Some("") => return Err(format!("empty parameter name in segment {segment:?}")),
                Some(name) if !is_identifier(name) => {
                    return Err(format!("invalid parameter name {name:?}"));
                }
                Some(name) => out.push(format!("{{{name}}}")),
                None => out.push(segment.to_string()),
            }
        }
        Ok(out.join("/"))
    }
}

fn is_identifier(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}
