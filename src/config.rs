//! Document-level configuration.
//!
//! Everything here is set once, when the [`crate::Router`] is created, before
//! any route is known. The shapes are version-neutral; each reflector maps
//! them into its own document model.
//!
//! [`Config::from_env`] follows 12-factor style like the rest of our services:
//! settings come from environment variables (or a `.env` file via `dotenvy`).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::path::PathParser;
use crate::schema::SchemaHooks;

/// Default OpenAPI document version.
pub const DEFAULT_OPENAPI_VERSION: &str = "3.0.3";
/// Default document title.
pub const DEFAULT_TITLE: &str = "API Documentation";
/// Default API version.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Top-level document configuration.
///
/// Built with chaining setters:
///
/// ```
/// use routespec::config::{Config, SecurityScheme, Server};
///
/// let config = Config::new()
///     .openapi_version("3.1.0")
///     .title("Pet Store")
///     .server(Server::new("https://api.example.com").description("production"))
///     .security_scheme("bearerAuth", SecurityScheme::bearer_with_format("JWT"));
/// assert_eq!(config.title, "Pet Store");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAPI document version (`3.0.x` or `3.1.x`).
    pub openapi_version: String,
    /// API title.
    pub title: String,
    /// API version.
    pub version: String,
    /// API description.
    pub description: Option<String>,
    /// Servers, in declaration order.
    pub servers: Vec<Server>,
    /// Contact information.
    pub contact: Option<Contact>,
    /// License information.
    pub license: Option<License>,
    /// Document-level external documentation.
    pub external_docs: Option<ExternalDocs>,
    /// Tag declarations, in declaration order.
    pub tags: Vec<Tag>,
    /// Security schemes by name.
    pub security_schemes: BTreeMap<String, SecurityScheme>,
    /// Optional path-parameter translator.
    pub path_parser: Option<Arc<dyn PathParser>>,
    /// Type-introspection customisation.
    pub hooks: SchemaHooks,
    /// Documentation UI settings, used by framework adapters.
    pub docs: DocsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openapi_version: DEFAULT_OPENAPI_VERSION.to_string(),
            title: DEFAULT_TITLE.to_string(),
            version: DEFAULT_VERSION.to_string(),
            description: None,
            servers: Vec::new(),
            contact: None,
            license: None,
            external_docs: None,
            tags: Vec::new(),
            security_schemes: BTreeMap::new(),
            path_parser: None,
            hooks: SchemaHooks::default(),
            docs: DocsConfig::default(),
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file, then
    /// reads `ROUTESPEC_OPENAPI_VERSION`, `ROUTESPEC_TITLE`,
    /// `ROUTESPEC_VERSION`, `ROUTESPEC_DESCRIPTION`, `ROUTESPEC_SERVER_URL`
    /// and `ROUTESPEC_DOCS_DISABLED`. Unset variables keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::new()
            .openapi_version(env_or("ROUTESPEC_OPENAPI_VERSION", DEFAULT_OPENAPI_VERSION))
            .title(env_or("ROUTESPEC_TITLE", DEFAULT_TITLE))
            .version(env_or("ROUTESPEC_VERSION", DEFAULT_VERSION));

        if let Ok(description) = std::env::var("ROUTESPEC_DESCRIPTION") {
            config = config.description(description);
        }
        if let Ok(url) = std::env::var("ROUTESPEC_SERVER_URL") {
            config = config.server(Server::new(url));
        }
        config.docs.disabled = parse_env_bool("ROUTESPEC_DOCS_DISABLED", false);
        config
    }

    /// Sets the OpenAPI document version.
    #[must_use]
    pub fn openapi_version(mut self, version: impl Into<String>) -> Self {
        self.openapi_version = version.into();
        self
    }

    /// Sets the API title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the API description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a server.
    #[must_use]
    pub fn server(mut self, server: Server) -> Self {
        self.servers.push(server);
        self
    }

    /// Sets the contact information.
    #[must_use]
    pub fn contact(mut self, contact: Contact) -> Self {
        self.contact = Some(contact);
        self
    }

    /// Sets the license.
    #[must_use]
    pub fn license(mut self, license: License) -> Self {
        self.license = Some(license);
        self
    }

    /// Sets document-level external documentation.
    #[must_use]
    pub fn external_docs(mut self, docs: ExternalDocs) -> Self {
        self.external_docs = Some(docs);
        self
    }

    /// Appends a tag declaration.
    #[must_use]
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Registers a security scheme under `name`.
    #[must_use]
    pub fn security_scheme(mut self, name: impl Into<String>, scheme: SecurityScheme) -> Self {
        self.security_schemes.insert(name.into(), scheme);
        self
    }

    /// Installs a path-parameter translator.
    #[must_use]
    pub fn path_parser(mut self, parser: impl PathParser + 'static) -> Self {
        self.path_parser = Some(Arc::new(parser));
        self
    }

    /// Replaces the type-introspection hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: SchemaHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replaces the documentation UI settings.
    #[must_use]
    pub fn docs(mut self, docs: DocsConfig) -> Self {
        self.docs = docs;
        self
    }
}

/// A server the API is reachable at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    /// Server URL, possibly templated with `{variable}`s.
    pub url: String,
    /// Optional description.
    pub description: Option<String>,
    /// Template variables by name.
    pub variables: BTreeMap<String, ServerVariable>,
}

impl Server {
    /// Creates a server with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
            variables: BTreeMap::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a template variable.
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, variable: ServerVariable) -> Self {
        self.variables.insert(name.into(), variable);
        self
    }
}

/// Substitution variable of a server URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVariable {
    /// Default value.
    pub default: String,
    /// Allowed values (empty means unrestricted).
    pub enum_values: Vec<String>,
    /// Optional description.
    pub description: Option<String>,
}

impl ServerVariable {
    /// Creates a variable with the given default.
    #[must_use]
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            enum_values: Vec::new(),
            description: None,
        }
    }

    /// Restricts the allowed values.
    #[must_use]
    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// API contact information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    /// Contact name.
    pub name: Option<String>,
    /// Contact URL.
    pub url: Option<String>,
    /// Contact email.
    pub email: Option<String>,
}

/// API license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
    /// License name.
    pub name: String,
    /// License URL.
    pub url: Option<String>,
}

impl License {
    /// Creates a license with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }

    /// Sets the license URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Link to external documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDocs {
    /// Target URL.
    pub url: String,
    /// Optional description.
    pub description: Option<String>,
}

impl ExternalDocs {
    /// Creates a link to `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Tag declaration with optional metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag name, as referenced by operations.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional external documentation.
    pub external_docs: Option<ExternalDocs>,
}

impl Tag {
    /// Creates a tag with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            external_docs: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets external documentation.
    #[must_use]
    pub fn external_docs(mut self, docs: ExternalDocs) -> Self {
        self.external_docs = Some(docs);
        self
    }
}

/// Location of an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    /// Request header.
    Header,
    /// Query string.
    Query,
    /// Cookie.
    Cookie,
}

/// Security scheme.
///
/// Serializes to the OpenAPI security scheme object, which has the same
/// shape in 3.0 and 3.1 for the kinds supported here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum SecurityScheme {
    /// API key carried in a header, query parameter or cookie.
    #[serde(rename = "apiKey")]
    ApiKey {
        /// Header, parameter or cookie name.
        name: String,
        /// Where the key is carried.
        #[serde(rename = "in")]
        location: ApiKeyLocation,
        /// Optional description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// HTTP authentication (`bearer`, `basic`, ...).
    #[serde(rename = "http")]
    Http {
        /// Authorization scheme name.
        scheme: String,
        /// Bearer token format hint.
        #[serde(rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
        bearer_format: Option<String>,
        /// Optional description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// OAuth 2.0.
    #[serde(rename = "oauth2")]
    OAuth2 {
        /// Supported flows.
        flows: OAuthFlows,
        /// Optional description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl SecurityScheme {
    /// API key scheme.
    #[must_use]
    pub fn api_key(name: impl Into<String>, location: ApiKeyLocation) -> Self {
        Self::ApiKey {
            name: name.into(),
            location,
            description: None,
        }
    }

    /// HTTP bearer scheme.
    #[must_use]
    pub fn bearer() -> Self {
        Self::Http {
            scheme: "bearer".to_string(),
            bearer_format: None,
            description: None,
        }
    }

    /// HTTP bearer scheme with a token format hint (e.g. `JWT`).
    #[must_use]
    pub fn bearer_with_format(format: impl Into<String>) -> Self {
        Self::Http {
            scheme: "bearer".to_string(),
            bearer_format: Some(format.into()),
            description: None,
        }
    }

    /// HTTP basic scheme.
    #[must_use]
    pub fn basic() -> Self {
        Self::Http {
            scheme: "basic".to_string(),
            bearer_format: None,
            description: None,
        }
    }

    /// OAuth 2.0 scheme.
    #[must_use]
    pub fn oauth2(flows: OAuthFlows) -> Self {
        Self::OAuth2 {
            flows,
            description: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Self::ApiKey { description, .. }
            | Self::Http { description, .. }
            | Self::OAuth2 { description, .. } => *description = Some(text.into()),
        }
        self
    }
}

/// The four standard OAuth 2.0 flows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlows {
    /// Implicit flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<OAuthFlow>,
    /// Resource owner password flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<OAuthFlow>,
    /// Client credentials flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_credentials: Option<OAuthFlow>,
    /// Authorization code flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<OAuthFlow>,
}

/// One OAuth 2.0 flow.
///
/// Use the per-flow constructors so the URLs each flow requires are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlow {
    /// Authorization endpoint (implicit, authorization code).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    /// Token endpoint (password, client credentials, authorization code).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    /// Refresh endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
    /// Scope name to description.
    pub scopes: BTreeMap<String, String>,
}

impl OAuthFlow {
    /// Implicit flow.
    #[must_use]
    pub fn implicit(authorization_url: impl Into<String>) -> Self {
        Self {
            authorization_url: Some(authorization_url.into()),
            ..Self::default()
        }
    }

    /// Resource owner password flow.
    #[must_use]
    pub fn password(token_url: impl Into<String>) -> Self {
        Self {
            token_url: Some(token_url.into()),
            ..Self::default()
        }
    }

    /// Client credentials flow.
    #[must_use]
    pub fn client_credentials(token_url: impl Into<String>) -> Self {
        Self {
            token_url: Some(token_url.into()),
            ..Self::default()
        }
    }

    /// Authorization code flow.
    #[must_use]
    pub fn authorization_code(
        authorization_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            authorization_url: Some(authorization_url.into()),
            token_url: Some(token_url.into()),
            ..Self::default()
        }
    }

    /// Sets the refresh URL.
    #[must_use]
    pub fn refresh_url(mut self, url: impl Into<String>) -> Self {
        self.refresh_url = Some(url.into());
        self
    }

    /// Adds a scope.
    #[must_use]
    pub fn scope(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.scopes.insert(name.into(), description.into());
        self
    }
}

/// Settings for the documentation UI served by framework adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsConfig {
    /// Page title.
    pub title: String,
    /// Path of the HTML documentation page.
    pub docs_path: String,
    /// Path the generated document is served at. A `.json` suffix serves
    /// JSON, anything else YAML.
    pub spec_path: String,
    /// Do not mount documentation routes at all.
    pub disabled: bool,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            docs_path: "/docs".to_string(),
            spec_path: "/docs/openapi.yaml".to_string(),
            disabled: false,
        }
    }
}

/// Reads an environment variable, returning `default` when unset.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new();
        assert_eq!(config.openapi_version, "3.0.3");
        assert_eq!(config.title, "API Documentation");
        assert_eq!(config.version, "1.0.0");
        assert!(config.servers.is_empty());
        assert_eq!(config.docs.docs_path, "/docs");
        assert_eq!(config.docs.spec_path, "/docs/openapi.yaml");
    }

    const ENV_KEYS: [&str; 6] = [
        "ROUTESPEC_OPENAPI_VERSION",
        "ROUTESPEC_TITLE",
        "ROUTESPEC_VERSION",
        "ROUTESPEC_DESCRIPTION",
        "ROUTESPEC_SERVER_URL",
        "ROUTESPEC_DOCS_DISABLED",
    ];

    #[test]
    #[allow(unsafe_code)]
    fn from_env_reads_and_falls_back() {
        let values = [
            "3.1.0",
            "Env Pets",
            "4.2.0",
            "from the environment",
            "https://env.example",
            "TRUE",
        ];
        for (key, value) in ENV_KEYS.iter().zip(values) {
            // SAFETY: these keys are only touched by this test.
            unsafe { std::env::set_var(key, value) };
        }
        let config = Config::from_env();
        assert_eq!(config.openapi_version, "3.1.0");
        assert_eq!(config.title, "Env Pets");
        assert_eq!(config.version, "4.2.0");
        assert_eq!(config.description.as_deref(), Some("from the environment"));
        assert_eq!(
            config.servers.first().map(|s| s.url.as_str()),
            Some("https://env.example")
        );
        assert!(config.docs.disabled);

        for key in ENV_KEYS {
            // SAFETY: as above.
            unsafe { std::env::remove_var(key) };
        }
        let config = Config::from_env();
        assert_eq!(config.openapi_version, DEFAULT_OPENAPI_VERSION);
        assert_eq!(config.title, DEFAULT_TITLE);
        assert_eq!(config.version, DEFAULT_VERSION);
        assert!(config.description.is_none());
        assert!(config.servers.is_empty());
        assert!(!config.docs.disabled);
    }

    #[test]
    #[allow(unsafe_code)]
    fn env_bool_parsing() {
        const KEY: &str = "ROUTESPEC_TEST_ENV_BOOL";
        for (raw, default, expected) in [
            ("1", false, true),
            ("true", false, true),
            ("True", false, true),
            ("0", true, false),
            ("FALSE", true, false),
            ("yes", false, false),
            ("yes", true, true),
        ] {
            // SAFETY: the key is unique to this test.
            unsafe { std::env::set_var(KEY, raw) };
            assert_eq!(parse_env_bool(KEY, default), expected, "{raw:?}");
        }
        // SAFETY: as above.
        unsafe { std::env::remove_var(KEY) };
        assert!(parse_env_bool(KEY, true));
        assert!(!parse_env_bool(KEY, false));
    }

    #[test]
    fn setters_chain() {
        let config = Config::new()
            .title("Pets")
            .version("2.0.0")
            .description("pet api")
            .server(Server::new("https://a.example").description("a"))
            .server(Server::new("https://b.example"))
            .tag(Tag::new("pets").description("Pet operations"))
            .security_scheme("key", SecurityScheme::api_key("X-Key", ApiKeyLocation::Header));

        assert_eq!(config.title, "Pets");
        assert_eq!(config.description.as_deref(), Some("pet api"));
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.tags.len(), 1);
        assert!(config.security_schemes.contains_key("key"));
    }

    #[test]
    fn security_scheme_serializes_to_openapi_shape() {
        let scheme = SecurityScheme::api_key("X-API-Key", ApiKeyLocation::Header)
            .with_description("service key");
        let Ok(value) = serde_json::to_value(&scheme) else {
            panic!("serialization failed");
        };
        assert_eq!(
            value,
            serde_json::json!({
                "type": "apiKey",
                "name": "X-API-Key",
                "in": "header",
                "description": "service key",
            })
        );

        let Ok(value) = serde_json::to_value(SecurityScheme::bearer_with_format("JWT")) else {
            panic!("serialization failed");
        };
        assert_eq!(
            value,
            serde_json::json!({"type": "http", "scheme": "bearer", "bearerFormat": "JWT"})
        );
    }

    #[test]
    fn oauth_flows_serialize_camel_case() {
        let flows = OAuthFlows {
            client_credentials: Some(
                OAuthFlow::client_credentials("https://auth.example/token").scope("read", "Read"),
            ),
            ..OAuthFlows::default()
        };
        let Ok(value) = serde_json::to_value(SecurityScheme::oauth2(flows)) else {
            panic!("serialization failed");
        };
        assert_eq!(
            value,
            serde_json::json!({
                "type": "oauth2",
                "flows": {
                    "clientCredentials": {
                        "tokenUrl": "https://auth.example/token",
                        "scopes": {"read": "Read"},
                    }
                }
            })
        );
    }
}
