//! OpenAPI 3.1.x reflector, built on the [`utoipa::openapi`] document model.
//!
//! utoipa speaks the 3.1 dialect natively, so schemas from the schema engine
//! enter the document unchanged.

use std::sync::Arc;

use http::Method;
use utoipa::openapi::content::ContentBuilder;
use utoipa::openapi::path::{Operation, OperationBuilder, ParameterBuilder, ParameterIn, PathItem};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::response::ResponseBuilder;
use utoipa::openapi::schema::{ObjectBuilder, Schema, Type};
use utoipa::openapi::security::{
    ApiKey, ApiKeyValue, AuthorizationCode, ClientCredentials, Flow, Http, HttpAuthScheme, Implicit,
    OAuth2, Password, Scopes, SecurityScheme,
};
use utoipa::openapi::server::{Server, ServerVariableBuilder};
use utoipa::openapi::tag::Tag;
use utoipa::openapi::{
    Components, Contact, Content, Deprecated, ExternalDocs, Info, License, OpenApi, Paths, RefOr,
    Required,
};

use super::operation::{self, OperationContext, RouteTarget};
use super::{Document, Reflector};
use crate::config::{self, ApiKeyLocation, Config};
use crate::error::{Error, ErrorCollector};
use crate::option::{ContentConfig, OperationConfig, OperationOption, SecurityRequirement};
use crate::path::{self, PathParser};
use crate::schema::{Definition, ResolvedSchema, SchemaHooks};

/// Version string utoipa writes into every document.
pub const OPENAPI_31: &str = "3.1.0";

/// Builds an OpenAPI 3.1.x document.
#[derive(Debug)]
pub struct OpenApi31Reflector {
    document: OpenApi,
    hooks: SchemaHooks,
    path_parser: Option<Arc<dyn PathParser>>,
    errors: ErrorCollector,
}

impl OpenApi31Reflector {
    /// Creates a reflector with the document metadata from `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let errors = ErrorCollector::new();
        if config.openapi_version != OPENAPI_31 {
            tracing::debug!(
                requested = %config.openapi_version,
                emitted = OPENAPI_31,
                "3.1 documents are always written as 3.1.0"
            );
        }
        let mut document = OpenApi::new(info(config), Paths::new());
        if !config.servers.is_empty() {
            document.servers = Some(config.servers.iter().map(server).collect());
        }
        if !config.tags.is_empty() {
            document.tags = Some(config.tags.iter().map(tag).collect());
        }
        document.external_docs = config.external_docs.as_ref().map(external_docs);
        for (name, scheme) in &config.security_schemes {
            match security_scheme(scheme) {
                Ok(scheme) => {
                    document
                        .components
                        .get_or_insert_with(Components::default)
                        .security_schemes
                        .insert(name.clone(), scheme);
                }
                Err(reason) => errors.add(Error::Schema {
                    context: format!("security scheme {name:?}"),
                    reason,
                }),
            }
        }
        Self {
            document,
            hooks: config.hooks.clone(),
            path_parser: config.path_parser.clone(),
            errors,
        }
    }

    /// The document built so far.
    #[must_use]
    pub fn openapi(&self) -> &OpenApi {
        &self.document
    }

    fn try_add(&mut self, method: &str, path: &str, options: &[OperationOption]) -> Result<(), Error> {
        let target = RouteTarget::parse(method, path, self.path_parser.as_deref())?;
        let config = OperationConfig::resolve(options);
        let context = Operation31::new(&target, &self.hooks);
        let Some(Operation31 {
            operation,
            definitions,
            ..
        }) = operation::build(context, &config)?
        else {
            tracing::debug!(method = %target.method, path = %target.path, "operation hidden");
            return Ok(());
        };
        self.commit(&target, operation, definitions)
    }

    fn commit(
        &mut self,
        target: &RouteTarget,
        operation: Operation,
        definitions: Vec<Definition>,
    ) -> Result<(), Error> {
        if let Some(item) = self.document.paths.paths.get(&target.path) {
            if is_occupied(item, &target.method) {
                return Err(target.duplicate());
            }
        }
        let components = self.document.components.as_ref();
        let definitions = operation::merge_definitions(definitions, |name| {
            components.and_then(|c| c.schemas.get(name))
        })?;

        if !definitions.is_empty() {
            self.document
                .components
                .get_or_insert_with(Components::default)
                .schemas
                .extend(definitions);
        }
        let item = self
            .document
            .paths
            .paths
            .entry(target.path.clone())
            .or_default();
        let Some(slot) = slot_mut(item, &target.method) else {
            return Err(Error::UnsupportedMethod {
                method: target.method.to_string(),
            });
        };
        *slot = Some(operation);
        tracing::debug!(method = %target.method, path = %target.path, "operation added");
        Ok(())
    }
}

impl Reflector for OpenApi31Reflector {
    fn openapi_version(&self) -> &str {
        OPENAPI_31
    }

    fn add(&mut self, method: &str, path: &str, options: &[OperationOption]) {
        let result = self.try_add(method, path, options);
        self.errors.add_result(result);
    }

    fn document(&self) -> Option<Document<'_>> {
        Some(Document::V3_1(&self.document))
    }

    fn validate(&self) -> Result<(), Error> {
        self.errors.check()
    }
}

struct Operation31<'a> {
    target: &'a RouteTarget,
    hooks: &'a SchemaHooks,
    operation: Operation,
    definitions: Vec<Definition>,
}

impl<'a> Operation31<'a> {
    fn new(target: &'a RouteTarget, hooks: &'a SchemaHooks) -> Self {
        let mut operation = OperationBuilder::new().build();
        let parameters: Vec<_> = path::parameters(&target.path)
            .into_iter()
            .map(|name| {
                ParameterBuilder::new()
                    .name(name)
                    .parameter_in(ParameterIn::Path)
                    .required(Required::True)
                    .schema(Some(Schema::Object(
                        ObjectBuilder::new().schema_type(Type::String).build(),
                    )))
                    .build()
            })
            .collect();
        if !parameters.is_empty() {
            operation.parameters = Some(parameters);
        }
        Self {
            target,
            hooks,
            operation,
            definitions: Vec::new(),
        }
    }

    fn content(&mut self, resolved: Option<ResolvedSchema>) -> Content {
        let Some(resolved) = resolved else {
            return ContentBuilder::new().build();
        };
        self.definitions.extend(resolved.definitions);
        ContentBuilder::new().schema(Some(resolved.schema)).build()
    }
}

impl OperationContext for Operation31<'_> {
    fn set_deprecated(&mut self) {
        self.operation.deprecated = Some(Deprecated::True);
    }

    fn set_operation_id(&mut self, id: &str) {
        self.operation.operation_id = Some(id.to_string());
    }

    fn set_summary(&mut self, summary: &str) {
        self.operation.summary = Some(summary.to_string());
    }

    fn set_description(&mut self, description: &str) {
        self.operation.description = Some(description.to_string());
    }

    fn set_tags(&mut self, tags: &[String]) {
        self.operation.tags = Some(tags.to_vec());
    }

    fn add_security(&mut self, requirement: &SecurityRequirement) {
        self.operation
            .security
            .get_or_insert_with(Vec::new)
            .push(utoipa::openapi::security::SecurityRequirement::new(
                requirement.name.clone(),
                requirement.scopes.clone(),
            ));
    }

    fn add_request(&mut self, content: &ContentConfig) -> Result<(), Error> {
        let resolved = self.hooks.resolve(&content.structure);
        if resolved.is_none() && content.content_type.is_none() {
            return Ok(());
        }
        let content_type = operation::content_type(content, resolved.as_ref());
        let media = self.content(resolved);
        let body = self.operation.request_body.get_or_insert_with(|| {
            RequestBodyBuilder::new()
                .required(Some(Required::True))
                .build()
        });
        if let Some(description) = &content.description {
            body.description = Some(description.clone());
        }
        body.content.insert(content_type, media);
        Ok(())
    }

    fn add_response(&mut self, content: &ContentConfig) -> Result<(), Error> {
        let key = self.target.response_key(content)?;
        let resolved = self.hooks.resolve(&content.structure);
        let media = if resolved.is_some() || content.content_type.is_some() {
            let content_type = operation::content_type(content, resolved.as_ref());
            Some((content_type, self.content(resolved)))
        } else {
            None
        };

        match self.operation.responses.responses.get_mut(&key) {
            Some(RefOr::T(response)) => match media {
                Some((content_type, media)) if !response.content.contains_key(&content_type) => {
                    response.content.insert(content_type, media);
                }
                _ => return Err(self.target.duplicate_response(&key)),
            },
            Some(RefOr::Ref(_)) => return Err(self.target.duplicate_response(&key)),
            None => {
                let mut response = ResponseBuilder::new()
                    .description(operation::response_description(content))
                    .build();
                if let Some((content_type, media)) = media {
                    response.content.insert(content_type, media);
                }
                self.operation
                    .responses
                    .responses
                    .insert(key, RefOr::T(response));
            }
        }
        Ok(())
    }
}

fn is_occupied(item: &PathItem, method: &Method) -> bool {
    match *method {
        Method::GET => item.get.is_some(),
        Method::PUT => item.put.is_some(),
        Method::POST => item.post.is_some(),
        Method::DELETE => item.delete.is_some(),
        Method::OPTIONS => item.options.is_some(),
        Method::HEAD => item.head.is_some(),
        Method::PATCH => item.patch.is_some(),
        Method::TRACE => item.trace.is_some(),
        _ => false,
    }
}

fn slot_mut<'a>(item: &'a mut PathItem, method: &Method) -> Option<&'a mut Option<Operation>> {
    match *method {
        Method::GET => Some(&mut item.get),
        Method::PUT => Some(&mut item.put),
        Method::POST => Some(&mut item.post),
        Method::DELETE => Some(&mut item.delete),
        Method::OPTIONS => Some(&mut item.options),
        Method::HEAD => Some(&mut item.head),
        Method::PATCH => Some(&mut item.patch),
        Method::TRACE => Some(&mut item.trace),
        _ => None,
    }
}

fn info(config: &Config) -> Info {
    let mut info = Info::new(config.title.clone(), config.version.clone());
    info.description.clone_from(&config.description);
    info.contact = config.contact.as_ref().map(|c| {
        let mut contact = Contact::new();
        contact.name.clone_from(&c.name);
        contact.url.clone_from(&c.url);
        contact.email.clone_from(&c.email);
        contact
    });
    info.license = config.license.as_ref().map(|l| {
        let mut license = License::new(l.name.clone());
        license.url.clone_from(&l.url);
        license
    });
    info
}

fn server(server: &config::Server) -> Server {
    let mut out = Server::new(server.url.clone());
    out.description.clone_from(&server.description);
    if !server.variables.is_empty() {
        out.variables = Some(
            server
                .variables
                .iter()
                .map(|(name, variable)| {
                    let mut value = ServerVariableBuilder::new().build();
                    value.default_value.clone_from(&variable.default);
                    value.description.clone_from(&variable.description);
                    if !variable.enum_values.is_empty() {
                        value.enum_values = Some(variable.enum_values.clone());
                    }
                    (name.clone(), value)
                })
                .collect(),
        );
    }
    out
}

fn tag(tag: &config::Tag) -> Tag {
    let mut out = Tag::new(tag.name.clone());
    out.description.clone_from(&tag.description);
    out.external_docs = tag.external_docs.as_ref().map(external_docs);
    out
}

fn external_docs(docs: &config::ExternalDocs) -> ExternalDocs {
    let mut out = ExternalDocs::new(docs.url.clone());
    out.description.clone_from(&docs.description);
    out
}

fn security_scheme(scheme: &config::SecurityScheme) -> Result<SecurityScheme, String> {
    match scheme {
        config::SecurityScheme::ApiKey {
            name,
            location,
            description,
        } => {
            let value = match description {
                Some(description) => ApiKeyValue::with_description(name.clone(), description.clone()),
                None => ApiKeyValue::new(name.clone()),
            };
            Ok(SecurityScheme::ApiKey(match location {
                ApiKeyLocation::Header => ApiKey::Header(value),
                ApiKeyLocation::Query => ApiKey::Query(value),
                ApiKeyLocation::Cookie => ApiKey::Cookie(value),
            }))
        }
        config::SecurityScheme::Http {
            scheme,
            bearer_format,
            description,
        } => {
            let mut http = Http::new(http_auth_scheme(scheme)?);
            http.bearer_format.clone_from(bearer_format);
            http.description.clone_from(description);
            Ok(SecurityScheme::Http(http))
        }
        config::SecurityScheme::OAuth2 { flows, description } => {
            let flows = oauth_flows(flows)?;
            Ok(SecurityScheme::OAuth2(match description {
                Some(description) => OAuth2::with_description(flows, description.clone()),
                None => OAuth2::new(flows),
            }))
        }
    }
}

fn http_auth_scheme(scheme: &str) -> Result<HttpAuthScheme, String> {
    match scheme.to_ascii_lowercase().as_str() {
        "basic" => Ok(HttpAuthScheme::Basic),
        "bearer" => Ok(HttpAuthScheme::Bearer),
        "digest" => Ok(HttpAuthScheme::Digest),
        "hoba" => Ok(HttpAuthScheme::Hoba),
        "mutual" => Ok(HttpAuthScheme::Mutual),
        "negotiate" => Ok(HttpAuthScheme::Negotiate),
        "oauth" => Ok(HttpAuthScheme::OAuth),
        "scram-sha-1" => Ok(HttpAuthScheme::ScramSha1),
        "scram-sha-256" => Ok(HttpAuthScheme::ScramSha256),
        "vapid" => Ok(HttpAuthScheme::Vapid),
        other => Err(format!("unknown HTTP authentication scheme {other:?}")),
    }
}

fn oauth_flows(flows: &config::OAuthFlows) -> Result<Vec<Flow>, String> {
    fn scopes(flow: &config::OAuthFlow) -> Scopes {
        Scopes::from_iter(flow.scopes.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
    fn required(url: Option<&String>, flow: &str, field: &str) -> Result<String, String> {
        url.cloned()
            .ok_or_else(|| format!("{flow} flow requires {field}"))
    }

    let mut out = Vec::new();
    if let Some(flow) = &flows.implicit {
        let authorization = required(flow.authorization_url.as_ref(), "implicit", "authorizationUrl")?;
        out.push(Flow::Implicit(match &flow.refresh_url {
            Some(refresh) => Implicit::with_refresh_url(authorization, scopes(flow), refresh.clone()),
            None => Implicit::new(authorization, scopes(flow)),
        }));
    }
    if let Some(flow) = &flows.password {
        let token = required(flow.token_url.as_ref(), "password", "tokenUrl")?;
        out.push(Flow::Password(match &flow.refresh_url {
            Some(refresh) => Password::with_refresh_url(token, scopes(flow), refresh.clone()),
            None => Password::new(token, scopes(flow)),
        }));
    }
    if let Some(flow) = &flows.client_credentials {
        let token = required(flow.token_url.as_ref(), "clientCredentials", "tokenUrl")?;
        out.push(Flow::ClientCredentials(match &flow.refresh_url {
            Some(refresh) => {
                ClientCredentials::with_refresh_url(token, scopes(flow), refresh.clone())
            }
            None => ClientCredentials::new(token, scopes(flow)),
        }));
    }
    if let Some(flow) = &flows.authorization_code {
        let authorization = required(
            flow.authorization_url.as_ref(),
            "authorizationCode",
            "authorizationUrl",
        )?;
        let token = required(flow.token_url.as_ref(), "authorizationCode", "tokenUrl")?;
        out.push(Flow::AuthorizationCode(match &flow.refresh_url {
            Some(refresh) => AuthorizationCode::with_refresh_url(
                authorization,
                token,
                scopes(flow),
                refresh.clone(),
            ),
            None => AuthorizationCode::new(authorization, token, scopes(flow)),
        }));
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::panic, dead_code)]
mod tests {
    use super::*;
    use crate::config::{OAuthFlow, OAuthFlows};
    use crate::option;
    use crate::schema::Structure;

    #[derive(utoipa::ToSchema)]
    struct Pet {
        id: i64,
        name: String,
        nickname: Option<String>,
    }

    mod other {
        #[derive(utoipa::ToSchema)]
        pub struct Pet {
            pub species: String,
        }
    }

    fn reflector() -> OpenApi31Reflector {
        OpenApi31Reflector::new(&Config::new().openapi_version("3.1.0").title("Pets"))
    }

    fn json(reflector: &OpenApi31Reflector) -> serde_json::Value {
        let Ok(value) = serde_json::to_value(reflector.openapi()) else {
            panic!("serialize failed");
        };
        value
    }

    #[test]
    fn document_is_always_3_1_0() {
        let reflector =
            OpenApi31Reflector::new(&Config::new().openapi_version("3.1.1").title("Pets"));
        assert_eq!(reflector.openapi_version(), "3.1.0");
        let value = json(&reflector);
        assert_eq!(value["openapi"], "3.1.0");
        assert_eq!(value["info"]["title"], "Pets");
    }

    #[test]
    fn schemas_keep_the_3_1_dialect() {
        let mut reflector = reflector();
        reflector.add(
            "PUT",
            "/pets/{id}",
            &[
                option::request(Structure::of::<Pet>(), &[]),
                option::response(200, Structure::of::<Pet>(), &[]),
            ],
        );
        assert!(reflector.validate().is_ok());
        let value = json(&reflector);
        let op = &value["paths"]["/pets/{id}"]["put"];
        assert_eq!(op["parameters"][0]["name"], "id");
        assert_eq!(op["parameters"][0]["required"], true);
        assert_eq!(op["requestBody"]["required"], true);
        assert_eq!(
            op["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Pet"
        );
        let nickname = &value["components"]["schemas"]["Pet"]["properties"]["nickname"];
        assert!(nickname.get("nullable").is_none());
    }

    #[test]
    fn operation_metadata() {
        let mut reflector = reflector();
        reflector.add(
            "delete",
            "/pets/{id}",
            &[
                option::summary("Delete"),
                option::description("Deletes a pet"),
                option::deprecated(),
                option::tags(&["pets", "admin"]),
                option::security("oauth", &["write"]),
                option::response(204, Structure::empty(), &[]),
                option::response(0, Structure::empty(), &[option::default_response(), option::content_description("Error")]),
            ],
        );
        assert!(reflector.validate().is_ok());
        let value = json(&reflector);
        let op = &value["paths"]["/pets/{id}"]["delete"];
        assert_eq!(op["summary"], "Delete");
        assert_eq!(op["description"], "Deletes a pet");
        assert_eq!(op["deprecated"], true);
        assert_eq!(op["tags"], serde_json::json!(["pets", "admin"]));
        assert_eq!(op["security"][0]["oauth"], serde_json::json!(["write"]));
        assert_eq!(op["responses"]["204"]["description"], "No Content");
        assert_eq!(op["responses"]["default"]["description"], "Error");
    }

    #[test]
    fn security_schemes_are_typed() {
        let flows = OAuthFlows {
            client_credentials: Some(OAuthFlow::client_credentials("https://auth/token").scope("read", "Read")),
            ..OAuthFlows::default()
        };
        let config = Config::new()
            .openapi_version("3.1.0")
            .security_scheme("basic", config::SecurityScheme::basic())
            .security_scheme("key", config::SecurityScheme::api_key("token", ApiKeyLocation::Query))
            .security_scheme("oauth", config::SecurityScheme::oauth2(flows).with_description("OAuth"));
        let reflector = OpenApi31Reflector::new(&config);
        assert!(reflector.validate().is_ok());
        let value = json(&reflector);
        let schemes = &value["components"]["securitySchemes"];
        assert_eq!(schemes["basic"]["type"], "http");
        assert_eq!(schemes["basic"]["scheme"], "basic");
        assert_eq!(schemes["key"]["in"], "query");
        assert_eq!(schemes["oauth"]["description"], "OAuth");
        assert_eq!(
            schemes["oauth"]["flows"]["clientCredentials"]["tokenUrl"],
            "https://auth/token"
        );
    }

    #[test]
    fn unknown_http_scheme_is_collected() {
        let scheme = config::SecurityScheme::Http {
            scheme: "magic".to_string(),
            bearer_format: None,
            description: None,
        };
        let reflector =
            OpenApi31Reflector::new(&Config::new().openapi_version("3.1.0").security_scheme("m", scheme));
        assert!(matches!(reflector.validate(), Err(Error::Spec(_))));
    }

    #[test]
    fn duplicate_operation_keeps_first() {
        let mut reflector = reflector();
        reflector.add("GET", "/pets", &[option::operation_id("first")]);
        reflector.add("GET", "/pets", &[option::operation_id("second")]);
        let Err(Error::Spec(spec)) = reflector.validate() else {
            panic!("expected aggregate error");
        };
        assert_eq!(spec.len(), 1);
        assert_eq!(json(&reflector)["paths"]["/pets"]["get"]["operationId"], "first");
    }

    #[test]
    fn conflicting_definitions_are_rejected() {
        let mut reflector = reflector();
        reflector.add(
            "POST",
            "/pets",
            &[
                option::request(Structure::of::<Pet>(), &[]),
                option::response(200, Structure::of::<other::Pet>(), &[]),
            ],
        );
        reflector.add("GET", "/pets", &[option::response(200, Structure::of::<Pet>(), &[])]);
        reflector.add(
            "GET",
            "/animals",
            &[option::response(200, Structure::of::<other::Pet>(), &[])],
        );
        let Err(Error::Spec(spec)) = reflector.validate() else {
            panic!("expected aggregate error");
        };
        assert_eq!(spec.len(), 2);
        assert!(spec
            .errors()
            .iter()
            .all(|err| matches!(err, Error::ConflictingSchema { name } if name == "Pet")));
        let value = json(&reflector);
        assert!(value["paths"]["/pets"].get("post").is_none());
        assert!(value["paths"]["/pets"].get("get").is_some());
        assert!(value["components"]["schemas"]["Pet"]["properties"].get("id").is_some());
    }
}
