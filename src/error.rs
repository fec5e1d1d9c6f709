//! Error types and the aggregate error collector.
//!
//! [`Error`] is the central error type for the crate. Registration calls
//! (`get`, `post`, ...) have no error return, so every failure found while
//! compiling the route tree is pushed into an [`ErrorCollector`] and surfaces
//! later, in one piece, as a [`SpecError`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

/// Crate-wide error enum.
///
/// `Clone` so that concurrent `validate()` callers can each receive the same
/// aggregate value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The requested OpenAPI document version is not one of the supported
    /// `3.0.x` / `3.1.x` families.
    #[error("unsupported OpenAPI version: {0:?} (expected 3.0.x or 3.1.x)")]
    UnsupportedVersion(String),

    /// The requested output format is neither YAML nor JSON.
    #[error("unsupported schema format: {0:?} (expected \"yaml\" or \"json\")")]
    UnsupportedFormat(String),

    /// The HTTP method is not one OpenAPI can describe.
    #[error("unsupported HTTP method: {method:?}")]
    UnsupportedMethod {
        /// Method as registered.
        method: String,
    },

    /// The path-parameter translator rejected a path.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// Path as registered.
        path: String,
        /// Translator message.
        reason: String,
    },

    /// A response status code outside `100..=999`.
    #[error("{method} {path}: invalid response status {status}")]
    InvalidStatus {
        /// Operation method.
        method: String,
        /// Operation path.
        path: String,
        /// Offending status.
        status: u16,
    },

    /// The same method and path were committed twice.
    #[error("{method} {path}: operation already exists")]
    DuplicateOperation {
        /// Operation method.
        method: String,
        /// Operation path.
        path: String,
    },

    /// Two responses for the same status on one operation.
    #[error("{method} {path}: duplicate response for status {status}")]
    DuplicateResponse {
        /// Operation method.
        method: String,
        /// Operation path.
        path: String,
        /// Status key (`"200"`, `"default"`, ...).
        status: String,
    },

    /// Two different schemas were registered under one component name.
    #[error("conflicting definitions for schema component {name:?}")]
    ConflictingSchema {
        /// Component name after rewriting.
        name: String,
    },

    /// The document engine rejected a schema fragment.
    #[error("{context}: {reason}")]
    Schema {
        /// Where the schema was being attached.
        context: String,
        /// Engine message.
        reason: String,
    },

    /// Encoding the document failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Writing the document to disk failed.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Aggregate of everything collected while compiling the route tree.
    #[error(transparent)]
    Spec(#[from] SpecError),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml_ng::Error> for Error {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Snapshot of every error collected during compilation, in arrival order.
///
/// Renders as:
/// ```text
/// Spec errors:
/// - first error
/// - second error
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpecError {
    errors: Vec<Error>,
}

impl SpecError {
    /// Returns the collected errors in arrival order.
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Returns the number of collected errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Spec errors:")?;
        for err in &self.errors {
            write!(f, "\n- {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SpecError {}

/// Thread-safe, append-only error accumulator.
///
/// Never reset, never deduplicated, no size cap.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Mutex<Vec<Error>>,
}

impl ErrorCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error.
    pub fn add(&self, err: Error) {
        tracing::warn!(error = %err, "route error collected");
        self.errors.lock().push(err);
    }

    /// Appends the error of `result`, if any.
    pub fn add_result(&self, result: Result<(), Error>) {
        if let Err(err) = result {
            self.add(err);
        }
    }

    /// Returns `true` if at least one error has been collected.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.lock().is_empty()
    }

    /// Returns the number of collected errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    /// Returns `true` if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_errors()
    }

    /// Returns a copy of the collected errors in arrival order.
    #[must_use]
    pub fn errors(&self) -> Vec<Error> {
        self.errors.lock().clone()
    }

    /// Returns the aggregate error, or `None` if nothing was collected.
    #[must_use]
    pub fn to_spec_error(&self) -> Option<SpecError> {
        let errors = self.errors.lock();
        if errors.is_empty() {
            return None;
        }
        Some(SpecError {
            errors: errors.clone(),
        })
    }

    /// Returns `Err` with the aggregate error if anything was collected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spec`] when the collector is non-empty.
    pub fn check(&self) -> Result<(), Error> {
        match self.to_spec_error() {
            Some(err) => Err(Error::Spec(err)),
            None => Ok(()),
        }
    }
}
