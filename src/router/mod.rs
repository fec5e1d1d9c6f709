//! The public registration API and the compile-once document generator.
//!
//! A [`Router`] is a cheap, cloneable handle to one node of a shared route
//! tree. Registration only records data. The first terminal call
//! ([`Router::validate`], [`Router::generate_schema`],
//! [`Router::write_schema_to`], ...) on any handle compiles the whole tree
//! into the reflector exactly once; later calls reuse the result.
//!
//! ```
//! use routespec::{option, Config, Router, Structure};
//!
//! let router = Router::new(Config::new().title("Pets"));
//! let pets = router.group("/pets", [option::group_tags(&["pets"])]);
//! pets.get("/", [option::summary("List pets")]);
//! pets.get("/{id}", [option::summary("Get a pet"), option::response(404, Structure::empty(), &[])]);
//!
//! assert!(router.validate().is_ok());
//! let yaml = router.generate_schema("yaml").unwrap_or_default();
//! assert!(String::from_utf8_lossy(&yaml).contains("/pets/{id}"));
//! ```

pub mod tree;

use std::path::Path;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

pub use tree::{CompileStats, NodeId, RouteEntry, RouteTree};

use crate::config::Config;
use crate::error::Error;
use crate::format::Format;
use crate::option::{GroupOption, OperationOption};
use crate::reflector::{self, Reflector};

#[derive(Debug)]
struct Shared {
    config: Config,
    tree: Mutex<RouteTree>,
    reflector: Mutex<Box<dyn Reflector>>,
    compiled: OnceLock<CompileStats>,
}

impl Shared {
    fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    fn compile(&self) -> CompileStats {
        *self.compiled.get_or_init(|| {
            let mut tree = self.tree.lock();
            tree.seal();
            let mut reflector = self.reflector.lock();
            let stats = tree.compile(reflector.as_mut());
            tracing::debug!(
                routes = stats.routes,
                hidden_groups = stats.hidden_groups,
                openapi = reflector.openapi_version(),
                "route tree compiled"
            );
            stats
        })
    }
}

/// Handle to a node of a route tree.
///
/// Clones share the same tree; handles returned by [`Router::group`] point
/// at child nodes of it.
#[derive(Debug, Clone)]
pub struct Router {
    shared: Arc<Shared>,
    node: NodeId,
}

impl Router {
    /// Creates a root router, selecting the reflector from
    /// `config.openapi_version`.
    ///
    /// Never fails: an unsupported version surfaces from [`Router::validate`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        let reflector = reflector::new_reflector(&config);
        Self::with_reflector(config, reflector)
    }

    /// Creates a root router around a custom reflector.
    #[must_use]
    pub fn with_reflector(config: Config, reflector: Box<dyn Reflector>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                tree: Mutex::new(RouteTree::new()),
                reflector: Mutex::new(reflector),
                compiled: OnceLock::new(),
            }),
            node: NodeId::ROOT,
        }
    }

    /// Document configuration of the tree.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Normalised prefix of this node.
    #[must_use]
    pub fn prefix(&self) -> String {
        self.shared.tree.lock().prefix(self.node).to_string()
    }

    /// `true` once the tree has been compiled.
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.shared.is_compiled()
    }

    /// Registers `method path` under this node.
    ///
    /// The path is joined with the node prefix and cleaned. Nothing is
    /// validated until the tree is compiled.
    pub fn add(
        &self,
        method: &str,
        path: &str,
        options: impl IntoIterator<Item = OperationOption>,
    ) -> RouteHandle {
        if self.shared.is_compiled() {
            tracing::warn!(method, path, "route registered after compilation is ignored");
        }
        let index = self
            .shared
            .tree
            .lock()
            .add_route(self.node, method, path, options.into_iter().collect());
        RouteHandle {
            shared: Arc::clone(&self.shared),
            node: self.node,
            index,
        }
    }

    /// Registers a `GET` route.
    pub fn get(&self, path: &str, options: impl IntoIterator<Item = OperationOption>) -> RouteHandle {
        self.add("GET", path, options)
    }

    /// Registers a `POST` route.
    pub fn post(&self, path: &str, options: impl IntoIterator<Item = OperationOption>) -> RouteHandle {
        self.add("POST", path, options)
    }

    /// Registers a `PUT` route.
    pub fn put(&self, path: &str, options: impl IntoIterator<Item = OperationOption>) -> RouteHandle {
        self.add("PUT", path, options)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&self, path: &str, options: impl IntoIterator<Item = OperationOption>) -> RouteHandle {
        self.add("DELETE", path, options)
    }

    /// Registers a `PATCH` route.
    pub fn patch(&self, path: &str, options: impl IntoIterator<Item = OperationOption>) -> RouteHandle {
        self.add("PATCH", path, options)
    }

    /// Registers a `HEAD` route.
    pub fn head(&self, path: &str, options: impl IntoIterator<Item = OperationOption>) -> RouteHandle {
        self.add("HEAD", path, options)
    }

    /// Registers an `OPTIONS` route.
    pub fn options(&self, path: &str, options: impl IntoIterator<Item = OperationOption>) -> RouteHandle {
        self.add("OPTIONS", path, options)
    }

    /// Registers a `TRACE` route.
    pub fn trace(&self, path: &str, options: impl IntoIterator<Item = OperationOption>) -> RouteHandle {
        self.add("TRACE", path, options)
    }

    /// Creates a child group whose prefix is this node's prefix plus `prefix`.
    #[must_use]
    pub fn group(&self, prefix: &str, options: impl IntoIterator<Item = GroupOption>) -> Self {
        if self.shared.is_compiled() {
            tracing::warn!(prefix, "group created after compilation is ignored");
        }
        let node = self
            .shared
            .tree
            .lock()
            .add_group(self.node, prefix, options.into_iter().collect());
        match node {
            Some(node) => Self {
                shared: Arc::clone(&self.shared),
                node,
            },
            None => self.clone(),
        }
    }

    /// Creates a child group and hands it to `build`.
    pub fn route(
        &self,
        prefix: &str,
        options: impl IntoIterator<Item = GroupOption>,
        build: impl FnOnce(&Self),
    ) -> Self {
        let group = self.group(prefix, options);
        build(&group);
        group
    }

    /// Appends group options to this node. They apply to every route under
    /// it, including ones registered earlier.
    pub fn use_options(&self, options: impl IntoIterator<Item = GroupOption>) -> &Self {
        let mut tree = self.shared.tree.lock();
        if tree.is_sealed() {
            tracing::warn!(prefix = %tree.prefix(self.node), "group options added after compilation are ignored");
        }
        tree.use_options(self.node, options);
        self
    }

    /// Compiles the tree (once) and returns the aggregate of every error
    /// collected while doing so.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spec`] if any route failed, or
    /// [`Error::UnsupportedVersion`] for an unsupported OpenAPI version.
    pub fn validate(&self) -> Result<(), Error> {
        self.shared.compile();
        self.shared.reflector.lock().validate()
    }

    /// Validates and encodes the document.
    ///
    /// # Errors
    ///
    /// Returns the validation error, or [`Error::Serialization`].
    pub fn generate(&self, format: Format) -> Result<Vec<u8>, Error> {
        self.validate()?;
        let reflector = self.shared.reflector.lock();
        let document = reflector
            .document()
            .ok_or_else(|| Error::UnsupportedVersion(reflector.openapi_version().to_string()))?;
        format.encode(&document)
    }

    /// Validates and encodes the document; `format` is `yaml`, `yml`,
    /// `json` or empty (YAML).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] before compiling anything if
    /// the format is unknown, otherwise as [`Router::generate`].
    pub fn generate_schema(&self, format: &str) -> Result<Vec<u8>, Error> {
        let format = Format::parse(format)?;
        self.generate(format)
    }

    /// The document as YAML.
    ///
    /// # Errors
    ///
    /// As [`Router::generate`].
    pub fn marshal_yaml(&self) -> Result<Vec<u8>, Error> {
        self.generate(Format::Yaml)
    }

    /// The document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// As [`Router::generate`].
    pub fn marshal_json(&self) -> Result<Vec<u8>, Error> {
        self.generate(Format::Json)
    }

    /// Writes the document to `path`: JSON for a `.json` extension, YAML
    /// otherwise.
    ///
    /// # Errors
    ///
    /// As [`Router::generate`], plus [`Error::Io`] if the write fails.
    pub fn write_schema_to(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let format = Format::from_path(path);
        let bytes = self.generate(format)?;
        std::fs::write(path, &bytes).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        tracing::info!(path = %path.display(), %format, bytes = bytes.len(), "schema written");
        Ok(())
    }
}

/// Handle to one registered route, for attaching options later.
#[derive(Debug, Clone)]
pub struct RouteHandle {
    shared: Arc<Shared>,
    node: NodeId,
    index: Option<usize>,
}

impl RouteHandle {
    /// Appends options to the route.
    ///
    /// Ignored with a warning once the tree has been compiled.
    pub fn with(&self, options: impl IntoIterator<Item = OperationOption>) -> &Self {
        let Some(index) = self.index else {
            return self;
        };
        let mut tree = self.shared.tree.lock();
        if tree.is_sealed() {
            let route = tree
                .route(self.node, index)
                .map(|route| format!("{} {}", route.method, route.path));
            tracing::warn!(?route, "options added after compilation are ignored");
            return self;
        }
        tree.extend_route(self.node, index, options);
        self
    }

    /// Method of the route as registered.
    #[must_use]
    pub fn method(&self) -> Option<String> {
        let index = self.index?;
        self.shared
            .tree
            .lock()
            .route(self.node, index)
            .map(|route| route.method.clone())
    }

    /// Full normalised path of the route.
    #[must_use]
    pub fn path(&self) -> Option<String> {
        let index = self.index?;
        self.shared
            .tree
            .lock()
            .route(self.node, index)
            .map(|route| route.path.clone())
    }
}
