//! routespec demo: documents a small pet store and writes the result.
//!
//! The output file is taken from `ROUTESPEC_OUTPUT` (default
//! `openapi.yaml`); a `.json` extension writes JSON. Set
//! `ROUTESPEC_LOG_JSON=1` for JSON log lines.

use tracing_subscriber::EnvFilter;

use routespec::config::{
    ApiKeyLocation, Contact, License, OAuthFlow, OAuthFlows, SecurityScheme, Server, Tag,
};
use routespec::{Config, Router, Structure, option};

/// A pet in the store.
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
struct Pet {
    /// Unique identifier.
    id: i64,
    /// Display name.
    name: String,
    /// Free-form tag.
    tag: Option<String>,
}

/// One page of pets.
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
struct PetPage {
    /// Pets on this page.
    items: Vec<Pet>,
    /// Cursor of the next page.
    next: Option<String>,
}

/// Payload for creating a pet.
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
struct NewPet {
    /// Display name.
    name: String,
    /// Free-form tag.
    tag: Option<String>,
}

/// Error body.
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
struct ApiError {
    /// Machine-readable code.
    code: i32,
    /// Human-readable message.
    message: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("ROUTESPEC_LOG_JSON").is_ok_and(|v| v == "1" || v == "true") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = petstore_config(Config::from_env());
    let output = std::env::var("ROUTESPEC_OUTPUT").unwrap_or_else(|_| "openapi.yaml".to_string());
    tracing::info!(openapi = %config.openapi_version, %output, "building pet store document");

    let router = Router::new(config);
    register_routes(&router);

    router.validate()?;
    router.write_schema_to(&output)?;
    Ok(())
}

fn petstore_config(config: Config) -> Config {
    config
        .contact(Contact {
            name: Some("API Support".to_string()),
            email: Some("support@example.com".to_string()),
            ..Contact::default()
        })
        .license(License::new("MIT").url("https://opensource.org/licenses/MIT"))
        .server(Server::new("http://localhost:8080").description("Local development"))
        .tag(Tag::new("pets").description("Everything about pets"))
        .tag(Tag::new("store").description("Orders"))
        .security_scheme("bearerAuth", SecurityScheme::bearer_with_format("JWT"))
        .security_scheme(
            "apiKey",
            SecurityScheme::api_key("X-API-Key", ApiKeyLocation::Header),
        )
        .security_scheme(
            "oauth",
            SecurityScheme::oauth2(OAuthFlows {
                client_credentials: Some(
                    OAuthFlow::client_credentials("https://auth.example.com/token")
                        .scope("pets:read", "Read pets")
                        .scope("pets:write", "Modify pets"),
                ),
                ..OAuthFlows::default()
            }),
        )
}

fn register_routes(router: &Router) {
    let not_found = || option::response(404, Structure::of::<ApiError>(), &[]);

    router.route(
        "/pets",
        [
            option::group_tags(&["pets"]),
            option::group_security("bearerAuth", &[]),
        ],
        |pets| {
            pets.get(
                "/",
                [
                    option::operation_id("listPets"),
                    option::summary("List all pets"),
                    option::response(200, Structure::of::<PetPage>(), &[]),
                ],
            );
            pets.post(
                "/",
                [
                    option::operation_id("createPet"),
                    option::summary("Create a pet"),
                    option::security("oauth", &["pets:write"]),
                    option::request(Structure::of::<NewPet>(), &[]),
                    option::response(201, Structure::of::<Pet>(), &[]),
                    option::response(
                        0,
                        Structure::of::<ApiError>(),
                        &[option::default_response()],
                    ),
                ],
            );
            pets.get(
                "/{petId}",
                [
                    option::operation_id("showPetById"),
                    option::summary("Info for a specific pet"),
                    option::response(200, Structure::of::<Pet>(), &[]),
                    not_found(),
                ],
            );
            pets.get(
                "/{petId}/photo",
                [
                    option::summary("Pet photo"),
                    option::response(
                        200,
                        Structure::empty(),
                        &[option::content_type("image/png")],
                    ),
                    not_found(),
                ],
            );
            pets.delete("/{petId}", [option::operation_id("deletePet"), not_found()])
                .with([option::deprecated()]);
        },
    );

    router.route("/store", [option::group_tags(&["store"])], |store| {
        store.get(
            "/inventory",
            [
                option::summary("Returns pet inventories"),
                option::security("apiKey", &[]),
                option::response(200, Structure::empty(), &[]),
            ],
        );
    });

    let admin = router.group("/admin", [option::group_hidden()]);
    admin.post("/reindex", [option::summary("Rebuild search index")]);
}
