//! # routespec
//!
//! Builds OpenAPI 3.0 and 3.1 documents from nested route-group
//! registrations.
//!
//! Routes and groups are recorded in a tree as they are registered. The
//! tree is compiled into a document the first time it is validated or
//! serialized, so options attached to a group apply to every route under
//! it no matter when either was added.
//!
//! ## Architecture
//!
//! ```text
//! Router / ApiRouter (router/, adapter/)
//!     │
//!     ├── RouteTree            deferred groups and routes
//!     ├── GroupConfig          tags, security, hide, deprecated
//!     │
//!     ├── Reflector            one per OpenAPI family (reflector/)
//!     │     ├── 3.0.x          openapiv3 model, downgraded schemas
//!     │     └── 3.1.x          utoipa model
//!     │
//!     └── Format               YAML or JSON output
//! ```
//!
//! ## Example
//!
//! ```
//! use routespec::config::{Config, SecurityScheme};
//! use routespec::{option, Router, Structure};
//!
//! #[derive(utoipa::ToSchema)]
//! struct Pet {
//!     id: i64,
//!     name: String,
//! }
//!
//! let config = Config::new()
//!     .title("Pet Store")
//!     .security_scheme("bearerAuth", SecurityScheme::bearer());
//! let router = Router::new(config);
//! let pets = router.group(
//!     "/pets",
//!     [option::group_tags(&["pets"]), option::group_security("bearerAuth", &[])],
//! );
//! pets.get("/{id}", [option::response(200, Structure::of::<Pet>(), &[])]);
//!
//! let Ok(json) = router.generate_schema("json") else { panic!() };
//! let json = String::from_utf8_lossy(&json);
//! assert!(json.contains("#/components/schemas/Pet"));
//! ```

pub mod adapter;
pub mod config;
pub mod docs;
pub mod error;
pub mod format;
pub mod option;
pub mod path;
pub mod reflector;
pub mod router;
pub mod schema;

pub use config::Config;
pub use error::{Error, ErrorCollector, SpecError};
pub use format::Format;
pub use router::{RouteHandle, Router};
pub use schema::{SchemaHooks, Structure};
