//! `axum` integration.
//!
//! ```
//! use routespec::adapter::axum::ApiRouter;
//! use routespec::{option, Config};
//!
//! async fn list_pets() -> &'static str {
//!     "[]"
//! }
//!
//! let app: axum::Router = ApiRouter::new(Config::new().title("Pets"))
//!     .nest("/pets", [option::group_tags(&["pets"])], |pets| {
//!         pets.get("/", list_pets, [option::summary("List pets")])
//!     })
//!     .into_router();
//! # let _ = app;
//! ```

use std::fmt;
use std::path::Path;

use ::axum::handler::Handler;
use ::axum::http::{StatusCode, header};
use ::axum::response::{Html, IntoResponse, Response};
use ::axum::routing::{MethodFilter, MethodRouter, get, on};

use crate::config::{Config, DocsConfig};
use crate::docs;
use crate::format::Format;
use crate::option::{GroupOption, OperationOption};
use crate::router::Router;

/// An `axum::Router` that documents every route it serves.
///
/// Paths use axum's `{param}` syntax, which is also OpenAPI's.
pub struct ApiRouter<S = ()> {
    spec: Router,
    inner: ::axum::Router<S>,
}

impl<S> fmt::Debug for ApiRouter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRouter")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl<S> ApiRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates an empty router documented with `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            spec: Router::new(config),
            inner: ::axum::Router::new(),
        }
    }

    /// The route tree behind this router.
    #[must_use]
    pub fn spec(&self) -> &Router {
        &self.spec
    }

    /// Serves `handler` for `GET path`.
    #[must_use]
    pub fn get<H, T>(
        self,
        path: &str,
        handler: H,
        options: impl IntoIterator<Item = OperationOption>,
    ) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route("GET", path, on(MethodFilter::GET, handler), options)
    }

    /// Serves `handler` for `POST path`.
    #[must_use]
    pub fn post<H, T>(
        self,
        path: &str,
        handler: H,
        options: impl IntoIterator<Item = OperationOption>,
    ) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route("POST", path, on(MethodFilter::POST, handler), options)
    }

    /// Serves `handler` for `PUT path`.
    #[must_use]
    pub fn put<H, T>(
        self,
        path: &str,
        handler: H,
        options: impl IntoIterator<Item = OperationOption>,
    ) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route("PUT", path, on(MethodFilter::PUT, handler), options)
    }

    /// Serves `handler` for `DELETE path`.
    #[must_use]
    pub fn delete<H, T>(
        self,
        path: &str,
        handler: H,
        options: impl IntoIterator<Item = OperationOption>,
    ) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route("DELETE", path, on(MethodFilter::DELETE, handler), options)
    }

    /// Serves `handler` for `PATCH path`.
    #[must_use]
    pub fn patch<H, T>(
        self,
        path: &str,
        handler: H,
        options: impl IntoIterator<Item = OperationOption>,
    ) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route("PATCH", path, on(MethodFilter::PATCH, handler), options)
    }

    /// Mounts `method_router` at `path` and documents it as `method`.
    ///
    /// The path is joined with the current group prefix before it reaches
    /// axum.
    #[must_use]
    pub fn route(
        mut self,
        method: &str,
        path: &str,
        method_router: MethodRouter<S>,
        options: impl IntoIterator<Item = OperationOption>,
    ) -> Self {
        let handle = self.spec.add(method, path, options);
        let full = handle
            .path()
            .unwrap_or_else(|| crate::path::join(&self.spec.prefix(), path));
        tracing::debug!(method, path = %full, "mounting route");
        self.inner = self.inner.route(&full, method_router);
        self
    }

    /// Registers routes under a group built by `build`.
    #[must_use]
    pub fn nest(
        self,
        prefix: &str,
        options: impl IntoIterator<Item = GroupOption>,
        build: impl FnOnce(Self) -> Self,
    ) -> Self {
        let parent = self.spec.clone();
        let child = Self {
            spec: self.spec.group(prefix, options),
            inner: self.inner,
        };
        let child = build(child);
        Self {
            spec: parent,
            inner: child.inner,
        }
    }

    /// Appends group options to the current group.
    #[must_use]
    pub fn use_options(self, options: impl IntoIterator<Item = GroupOption>) -> Self {
        self.spec.use_options(options);
        self
    }

    /// Finishes the router, mounting the documentation routes unless they
    /// are disabled.
    #[must_use]
    pub fn into_router(self) -> ::axum::Router<S> {
        let docs = &self.spec.config().docs;
        if docs.disabled {
            return self.inner;
        }
        let docs_router = docs_routes(&self.spec, docs);
        self.inner.merge(docs_router)
    }
}

/// Routes serving the generated document at `docs.spec_path` and a
/// Swagger UI page at `docs.docs_path`.
///
/// The document is generated on first request; a tree that fails
/// validation is answered with `500` and the aggregated error text.
pub fn docs_routes<S>(spec: &Router, docs: &DocsConfig) -> ::axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let format = Format::from_path(Path::new(&docs.spec_path));
    let spec = spec.clone();
    let page = docs::render_page(docs);
    ::axum::Router::new()
        .route(
            &docs.spec_path,
            get(move || {
                let spec = spec.clone();
                async move { serve_spec(&spec, format) }
            }),
        )
        .route(
            &docs.docs_path,
            get(move || {
                let page = page.clone();
                async move { Html(page) }
            }),
        )
}

fn serve_spec(spec: &Router, format: Format) -> Response {
    match spec.generate(format) {
        Ok(bytes) => ([(header::CONTENT_TYPE, format.mime())], bytes).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to generate OpenAPI document");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
