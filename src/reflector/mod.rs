//! Version reflectors: the per-OpenAPI-version document builders.
//!
//! A [`Reflector`] owns one document. The router hands it every visible
//! route exactly once, during compilation; the reflector turns each into an
//! operation, records whatever goes wrong in its [`ErrorCollector`], and
//! keeps going. [`new_reflector`] picks the implementation from the
//! configured `openapi_version`:
//!
//! | version  | reflector                      | document model            |
//! |----------|--------------------------------|---------------------------|
//! | `3.0.x`  | [`v3_0::OpenApi30Reflector`]   | [`openapiv3::OpenAPI`]    |
//! | `3.1.x`  | [`v3_1::OpenApi31Reflector`]   | [`utoipa::openapi::OpenApi`] |
//! | other    | [`UnsupportedReflector`]       | none                      |
//!
//! [`ErrorCollector`]: crate::error::ErrorCollector

pub mod operation;
pub mod v3_0;
pub mod v3_1;

use std::fmt;

use serde::Serialize;

use crate::config::Config;
use crate::error::Error;
use crate::option::OperationOption;

/// A version-specific document builder.
pub trait Reflector: Send + fmt::Debug {
    /// The `openapi` field this reflector emits.
    fn openapi_version(&self) -> &str;

    /// Commits one route. Failures are collected, never returned.
    fn add(&mut self, method: &str, path: &str, options: &[OperationOption]);

    /// The document built so far, or `None` if this reflector cannot build one.
    fn document(&self) -> Option<Document<'_>>;

    /// Returns the aggregate of every collected error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spec`] if anything was collected, or
    /// [`Error::UnsupportedVersion`] for an unsupported version.
    fn validate(&self) -> Result<(), Error>;
}

/// Borrowed view of a built document, serializable in either version.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum Document<'a> {
    /// OpenAPI 3.0.x.
    V3_0(&'a openapiv3::OpenAPI),
    /// OpenAPI 3.1.x.
    V3_1(&'a utoipa::openapi::OpenApi),
}

/// Supported OpenAPI version families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFamily {
    /// `3.0.x`
    V3_0,
    /// `3.1.x`
    V3_1,
}

impl VersionFamily {
    /// Classifies a version string of the form `3.0.N` or `3.1.N`, with an
    /// optional `-suffix`.
    #[must_use]
    pub fn detect(version: &str) -> Option<Self> {
        let core = version.split_once('-').map_or(version, |(core, _)| core);
        let mut parts = core.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        if patch.is_empty() || !patch.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match (major, minor) {
            ("3", "0") => Some(Self::V3_0),
            ("3", "1") => Some(Self::V3_1),
            _ => None,
        }
    }
}

/// Creates the reflector matching `config.openapi_version`.
#[must_use]
pub fn new_reflector(config: &Config) -> Box<dyn Reflector> {
    match VersionFamily::detect(&config.openapi_version) {
        Some(VersionFamily::V3_0) => Box::new(v3_0::OpenApi30Reflector::new(config)),
        Some(VersionFamily::V3_1) => Box::new(v3_1::OpenApi31Reflector::new(config)),
        None => {
            tracing::warn!(
                version = %config.openapi_version,
                "unsupported OpenAPI version, no document will be generated"
            );
            Box::new(UnsupportedReflector::new(config.openapi_version.clone()))
        }
    }
}

/// Stand-in for an unsupported version: accepts routes, builds nothing.
#[derive(Debug, Clone)]
pub struct UnsupportedReflector {
    version: String,
}

impl UnsupportedReflector {
    /// Creates the stand-in for `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl Reflector for UnsupportedReflector {
    fn openapi_version(&self) -> &str {
        &self.version
    }

    fn add(&mut self, method: &str, path: &str, _options: &[OperationOption]) {
        tracing::trace!(method, path, "route ignored by unsupported reflector");
    }

    fn document(&self) -> Option<Document<'_>> {
        None
    }

    fn validate(&self) -> Result<(), Error> {
        Err(Error::UnsupportedVersion(self.version.clone()))
    }
}
