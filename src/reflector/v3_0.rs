//! OpenAPI 3.0.x reflector, built on the [`openapiv3`] document model.
//!
//! Schemas come out of the schema engine in the 3.1 dialect; they are
//! rewritten by [`crate::schema::downgrade`] and parsed into
//! [`openapiv3::Schema`] before they enter the document.

use std::sync::Arc;

use http::Method;
use openapiv3::{
    Components, Contact, ExternalDocumentation, Info, License, MediaType, OpenAPI, Operation,
    Parameter, PathItem, ReferenceOr, RequestBody, Response, Schema, Server, ServerVariable,
    StatusCode, Tag,
};
use utoipa::openapi::RefOr;

use super::operation::{self, OperationContext, RouteTarget};
use super::{Document, Reflector};
use crate::config::{self, Config};
use crate::error::{Error, ErrorCollector};
use crate::option::{ContentConfig, OperationConfig, OperationOption, SecurityRequirement};
use crate::path::{self, PathParser};
use crate::schema::{ResolvedSchema, SchemaHooks, downgrade};

/// Builds an OpenAPI 3.0.x document.
#[derive(Debug)]
pub struct OpenApi30Reflector {
    document: OpenAPI,
    hooks: SchemaHooks,
    path_parser: Option<Arc<dyn PathParser>>,
    errors: ErrorCollector,
}

impl OpenApi30Reflector {
    /// Creates a reflector with the document metadata from `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let errors = ErrorCollector::new();
        let mut document = OpenAPI {
            openapi: config.openapi_version.clone(),
            info: info(config),
            servers: config.servers.iter().map(server).collect(),
            tags: config.tags.iter().map(tag).collect(),
            external_docs: config.external_docs.as_ref().map(external_docs),
            ..OpenAPI::default()
        };
        for (name, scheme) in &config.security_schemes {
            match security_scheme(scheme) {
                Ok(scheme) => {
                    document
                        .components
                        .get_or_insert_with(Components::default)
                        .security_schemes
                        .insert(name.clone(), ReferenceOr::Item(scheme));
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
    pub fn openapi(&self) -> &OpenAPI {
        &self.document
    }

    fn try_add(&mut self, method: &str, path: &str, options: &[OperationOption]) -> Result<(), Error> {
        let target = RouteTarget::parse(method, path, self.path_parser.as_deref())?;
        let config = OperationConfig::resolve(options);
        let context = Operation30::new(&target, &self.hooks)?;
        let Some(Operation30 {
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
        definitions: Vec<(String, ReferenceOr<Schema>)>,
    ) -> Result<(), Error> {
        if let Some(ReferenceOr::Item(item)) = self.document.paths.paths.get(&target.path) {
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
            .or_insert_with(|| ReferenceOr::Item(PathItem::default()));
        let ReferenceOr::Item(item) = item else {
            return Err(target.schema_error("path item is a reference"));
        };
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

impl Reflector for OpenApi30Reflector {
    fn openapi_version(&self) -> &str {
        &self.document.openapi
    }

    fn add(&mut self, method: &str, path: &str, options: &[OperationOption]) {
        let result = self.try_add(method, path, options);
        self.errors.add_result(result);
    }

    fn document(&self) -> Option<Document<'_>> {
        Some(Document::V3_0(&self.document))
    }

    fn validate(&self) -> Result<(), Error> {
        self.errors.check()
    }
}

/// A 3.0 operation under construction, plus the definitions it references.
struct Operation30<'a> {
    target: &'a RouteTarget,
    hooks: &'a SchemaHooks,
    operation: Operation,
    definitions: Vec<(String, ReferenceOr<Schema>)>,
}

impl<'a> Operation30<'a> {
    fn new(target: &'a RouteTarget, hooks: &'a SchemaHooks) -> Result<Self, Error> {
        let mut operation = Operation::default();
        for name in path::parameters(&target.path) {
            let parameter = serde_json::from_value::<Parameter>(serde_json::json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": {"type": "string"},
            }))
            .map_err(|err| target.schema_error(err.to_string()))?;
            operation.parameters.push(ReferenceOr::Item(parameter));
        }
        Ok(Self {
            target,
            hooks,
            operation,
            definitions: Vec::new(),
        })
    }

    fn media_type(&mut self, resolved: Option<&ResolvedSchema>) -> Result<MediaType, Error> {
        let Some(resolved) = resolved else {
            return Ok(MediaType::default());
        };
        for (name, schema) in &resolved.definitions {
            let converted = convert(schema)
                .map_err(|reason| self.target.schema_error(format!("schema {name}: {reason}")))?;
            self.definitions.push((name.clone(), converted));
        }
        let schema = convert(&resolved.schema).map_err(|reason| self.target.schema_error(reason))?;
        Ok(MediaType {
            schema: Some(schema),
            ..MediaType::default()
        })
    }
}

impl OperationContext for Operation30<'_> {
    fn set_deprecated(&mut self) {
        self.operation.deprecated = true;
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
        self.operation.tags = tags.to_vec();
    }

    fn add_security(&mut self, requirement: &SecurityRequirement) {
        self.operation
            .security
            .get_or_insert_with(Vec::new)
            .push(openapiv3::SecurityRequirement::from_iter([(
                requirement.name.clone(),
                requirement.scopes.clone(),
            )]));
    }

    fn add_request(&mut self, content: &ContentConfig) -> Result<(), Error> {
        let resolved = self.hooks.resolve(&content.structure);
        if resolved.is_none() && content.content_type.is_none() {
            return Ok(());
        }
        let content_type = operation::content_type(content, resolved.as_ref());
        let media = self.media_type(resolved.as_ref())?;
        let body = self.operation.request_body.get_or_insert_with(|| {
            ReferenceOr::Item(RequestBody {
                required: true,
                ..RequestBody::default()
            })
        });
        let ReferenceOr::Item(body) = body else {
            return Err(self.target.schema_error("request body is a reference"));
        };
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
            Some((content_type, self.media_type(resolved.as_ref())?))
        } else {
            None
        };

        let responses = &mut self.operation.responses;
        let existing = if content.is_default {
            responses.default.as_mut()
        } else {
            responses
                .responses
                .get_mut(&StatusCode::Code(content.http_status))
        };
        match existing {
            Some(ReferenceOr::Item(response)) => match media {
                Some((content_type, media)) if !response.content.contains_key(&content_type) => {
                    response.content.insert(content_type, media);
                }
                _ => return Err(self.target.duplicate_response(&key)),
            },
            Some(ReferenceOr::Reference { .. }) => {
                return Err(self.target.duplicate_response(&key));
            }
            None => {
                let mut response = Response {
                    description: operation::response_description(content),
                    ..Response::default()
                };
                if let Some((content_type, media)) = media {
                    response.content.insert(content_type, media);
                }
                if content.is_default {
                    responses.default = Some(ReferenceOr::Item(response));
                } else {
                    responses.responses.insert(
                        StatusCode::Code(content.http_status),
                        ReferenceOr::Item(response),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Serializes a schema, rewrites it to the 3.0 dialect and parses it back.
fn convert(schema: &RefOr<utoipa::openapi::schema::Schema>) -> Result<ReferenceOr<Schema>, String> {
    let mut value = serde_json::to_value(schema).map_err(|err| err.to_string())?;
    downgrade::to_openapi_30(&mut value);
    serde_json::from_value(value).map_err(|err| err.to_string())
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
    Info {
        title: config.title.clone(),
        description: config.description.clone(),
        contact: config.contact.as_ref().map(contact),
        license: config.license.as_ref().map(license),
        version: config.version.clone(),
        ..Info::default()
    }
}

fn contact(contact: &config::Contact) -> Contact {
    Contact {
        name: contact.name.clone(),
        url: contact.url.clone(),
        email: contact.email.clone(),
        ..Contact::default()
    }
}

fn license(license: &config::License) -> License {
    License {
        name: license.name.clone(),
        url: license.url.clone(),
        ..License::default()
    }
}

fn server(server: &config::Server) -> Server {
    Server {
        url: server.url.clone(),
        description: server.description.clone(),
        variables: (!server.variables.is_empty()).then(|| {
            server
                .variables
                .iter()
                .map(|(name, variable)| {
                    (
                        name.clone(),
                        ServerVariable {
                            enumeration: variable.enum_values.clone(),
                            default: variable.default.clone(),
                            description: variable.description.clone(),
                            ..ServerVariable::default()
                        },
                    )
                })
                .collect()
        }),
        ..Server::default()
    }
}

fn tag(tag: &config::Tag) -> Tag {
    Tag {
        name: tag.name.clone(),
        description: tag.description.clone(),
        external_docs: tag.external_docs.as_ref().map(external_docs),
        ..Tag::default()
    }
}

fn external_docs(docs: &config::ExternalDocs) -> ExternalDocumentation {
    ExternalDocumentation {
        url: docs.url.clone(),
        description: docs.description.clone(),
        ..ExternalDocumentation::default()
    }
}

fn security_scheme(scheme: &config::SecurityScheme) -> Result<openapiv3::SecurityScheme, String> {
    let value = serde_json::to_value(scheme).map_err(|err| err.to_string())?;
    serde_json::from_value(value).map_err(|err| err.to_string())
}

#[cfg(test)]
#[allow(clippy::panic, dead_code)]
mod tests {
    use super::*;
    use crate::config::{ApiKeyLocation, OAuthFlow, OAuthFlows};
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

    fn reflector() -> OpenApi30Reflector {
        OpenApi30Reflector::new(&Config::new().title("Pets").version("2.0.0"))
    }

    fn json(reflector: &OpenApi30Reflector) -> serde_json::Value {
        let Ok(value) = serde_json::to_value(reflector.openapi()) else {
            panic!("serialize failed");
        };
        value
    }

    #[test]
    fn document_metadata_comes_from_config() {
        let config = Config::new()
            .title("Pets")
            .version("2.0.0")
            .description("Pet store")
            .server(config::Server::new("https://api.example.com").description("prod"))
            .tag(config::Tag::new("pets").description("Pet operations"))
            .license(config::License::new("MIT"));
        let value = json(&OpenApi30Reflector::new(&config));
        assert_eq!(value["openapi"], "3.0.3");
        assert_eq!(value["info"]["title"], "Pets");
        assert_eq!(value["info"]["version"], "2.0.0");
        assert_eq!(value["info"]["license"]["name"], "MIT");
        assert_eq!(value["servers"][0]["url"], "https://api.example.com");
        assert_eq!(value["tags"][0]["description"], "Pet operations");
    }

    #[test]
    fn security_schemes_are_registered() {
        let flows = OAuthFlows {
            authorization_code: Some(
                OAuthFlow::authorization_code("https://auth/authorize", "https://auth/token")
                    .scope("read", "Read access"),
            ),
            ..OAuthFlows::default()
        };
        let config = Config::new()
            .security_scheme("bearerAuth", config::SecurityScheme::bearer_with_format("JWT"))
            .security_scheme("apiKey", config::SecurityScheme::api_key("X-Key", ApiKeyLocation::Header))
            .security_scheme("oauth", config::SecurityScheme::oauth2(flows));
        let reflector = OpenApi30Reflector::new(&config);
        assert!(reflector.validate().is_ok());
        let value = json(&reflector);
        let schemes = &value["components"]["securitySchemes"];
        assert_eq!(schemes["bearerAuth"]["scheme"], "bearer");
        assert_eq!(schemes["bearerAuth"]["bearerFormat"], "JWT");
        assert_eq!(schemes["apiKey"]["in"], "header");
        assert_eq!(
            schemes["oauth"]["flows"]["authorizationCode"]["scopes"]["read"],
            "Read access"
        );
    }

    #[test]
    fn operation_with_request_and_responses() {
        let mut reflector = reflector();
        reflector.add(
            "post",
            "/pets/{id}",
            &[
                option::operation_id("updatePet"),
                option::summary("Update a pet"),
                option::tags(&["pets"]),
                option::security("bearerAuth", &[]),
                option::request(Structure::of::<Pet>(), &[]),
                option::response(200, Structure::of::<Pet>(), &[]),
                option::response(404, Structure::empty(), &[]),
            ],
        );
        assert!(reflector.validate().is_ok());
        let value = json(&reflector);
        let op = &value["paths"]["/pets/{id}"]["post"];
        assert_eq!(op["operationId"], "updatePet");
        assert_eq!(op["description"], "Update a pet");
        assert_eq!(op["tags"], serde_json::json!(["pets"]));
        assert_eq!(op["security"][0]["bearerAuth"], serde_json::json!([]));
        assert_eq!(op["parameters"][0]["name"], "id");
        assert_eq!(op["parameters"][0]["in"], "path");
        assert_eq!(op["parameters"][0]["required"], true);
        assert_eq!(
            op["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Pet"
        );
        assert_eq!(op["responses"]["200"]["description"], "OK");
        assert_eq!(op["responses"]["404"]["description"], "Not Found");
        assert!(op["responses"]["404"].get("content").is_none_or(|c| c.as_object().is_some_and(serde_json::Map::is_empty)));
        let pet = &value["components"]["schemas"]["Pet"];
        assert_eq!(pet["type"], "object");
        assert_eq!(pet["properties"]["nickname"]["nullable"], true);
    }

    #[test]
    fn string_responses_are_text_plain() {
        let mut reflector = reflector();
        reflector.add("GET", "/health", &[option::response(200, Structure::of::<String>(), &[])]);
        let value = json(&reflector);
        assert_eq!(
            value["paths"]["/health"]["get"]["responses"]["200"]["content"]["text/plain"]["schema"]["type"],
            "string"
        );
    }

    #[test]
    fn same_status_with_new_content_type_merges() {
        let mut reflector = reflector();
        reflector.add(
            "GET",
            "/pets",
            &[
                option::response(200, Structure::of::<Pet>(), &[]),
                option::response(200, Structure::of::<Pet>(), &[option::content_type("application/xml")]),
            ],
        );
        assert!(reflector.validate().is_ok());
        let value = json(&reflector);
        let content = &value["paths"]["/pets"]["get"]["responses"]["200"]["content"];
        assert!(content.get("application/json").is_some());
        assert!(content.get("application/xml").is_some());
    }

    #[test]
    fn attachment_errors_are_collected_and_skip_the_route() {
        let mut reflector = reflector();
        reflector.add(
            "GET",
            "/pets",
            &[
                option::response(200, Structure::of::<Pet>(), &[]),
                option::response(200, Structure::of::<Pet>(), &[]),
            ],
        );
        reflector.add("GET", "/status", &[option::response(1000, Structure::empty(), &[])]);
        reflector.add("CONNECT", "/tunnel", &[]);
        reflector.add("GET", "/ok", &[]);

        let Err(Error::Spec(spec)) = reflector.validate() else {
            panic!("expected aggregate error");
        };
        assert_eq!(spec.len(), 3);
        assert!(matches!(spec.errors().first(), Some(Error::DuplicateResponse { .. })));
        assert!(matches!(spec.errors().get(1), Some(Error::InvalidStatus { status: 1000, .. })));
        assert!(matches!(spec.errors().get(2), Some(Error::UnsupportedMethod { .. })));

        let value = json(&reflector);
        assert!(value["paths"].get("/pets").is_none());
        assert!(value["paths"].get("/ok").is_some());
    }

    #[test]
    fn duplicate_operations_are_rejected() {
        let mut reflector = reflector();
        reflector.add("GET", "/pets", &[option::summary("first")]);
        reflector.add("get", "/pets", &[option::summary("second")]);
        let Err(Error::Spec(spec)) = reflector.validate() else {
            panic!("expected aggregate error");
        };
        assert!(matches!(spec.errors().first(), Some(Error::DuplicateOperation { .. })));
        assert_eq!(json(&reflector)["paths"]["/pets"]["get"]["summary"], "first");
    }

    #[test]
    fn conflicting_definitions_are_rejected() {
        let mut reflector = reflector();
        reflector.add("GET", "/pets", &[option::response(200, Structure::of::<Pet>(), &[])]);
        reflector.add("GET", "/animals", &[option::response(200, Structure::of::<other::Pet>(), &[])]);
        let Err(Error::Spec(spec)) = reflector.validate() else {
            panic!("expected aggregate error");
        };
        assert!(matches!(
            spec.errors().first(),
            Some(Error::ConflictingSchema { name }) if name == "Pet"
        ));
    }

    #[test]
    fn conflicting_definitions_within_one_route_are_rejected() {
        let mut reflector = reflector();
        reflector.add(
            "POST",
            "/pets",
            &[
                option::request(Structure::of::<Pet>(), &[]),
                option::response(200, Structure::of::<other::Pet>(), &[]),
            ],
        );
        let Err(Error::Spec(spec)) = reflector.validate() else {
            panic!("expected aggregate error");
        };
        assert!(matches!(
            spec.errors().first(),
            Some(Error::ConflictingSchema { name }) if name == "Pet"
        ));
        let value = json(&reflector);
        assert!(value["paths"].get("/pets").is_none());
        assert!(value["components"]["schemas"].get("Pet").is_none());
    }

    #[test]
    fn repeated_identical_definitions_are_accepted() {
        let mut reflector = reflector();
        reflector.add(
            "PUT",
            "/pets/{id}",
            &[
                option::request(Structure::of::<Pet>(), &[]),
                option::response(200, Structure::of::<Pet>(), &[]),
            ],
        );
        reflector.add("GET", "/pets/{id}", &[option::response(200, Structure::of::<Pet>(), &[])]);
        assert!(reflector.validate().is_ok());
    }

    #[test]
    fn hidden_operation_is_absent() {
        let mut reflector = reflector();
        reflector.add("GET", "/secret", &[option::hide()]);
        assert!(reflector.validate().is_ok());
        assert!(json(&reflector)["paths"].get("/secret").is_none());
    }
}
