//! # kcadmin-core
//!
//! Authentication and request construction for the Keycloak admin REST API.
//!
//! This crate takes care of the part of an admin client that has decisions to make:
//! - **Credentials**: password grant, client-credentials grant, or a token supplied by a callback
//! - **Realms**: tokens may come from an authentication realm other than the one being managed
//! - **URLs**: servers before Keycloak 17 serve everything under `/auth`, newer ones do not
//! - **Bodies**: a pluggable [`JsonSerializer`] controls field casing and `null` handling
//!
//! Resource endpoints (users, groups, clients...) are left to the caller, who appends
//! paths to the [`ResolvedRequest`] returned by [`KeycloakClient::base_request`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kcadmin_core::KeycloakClient;
//! # use serde::Deserialize;
//! # #[derive(Debug, Deserialize)]
//! # struct UserRepresentation { id: String, username: String }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KeycloakClient::builder()
//!     .with_base_url("https://idp.example.com")
//!     .with_auth_segment(false)
//!     .with_authentication_realm("master")
//!     .with_password("admin", "admin")
//!     .build()?;
//!
//! // The token is requested from `master`, the users are listed in `tenant-a`
//! let request = client.base_request("tenant-a").await?;
//! let users: Vec<UserRepresentation> = request
//!     .get_json(request.admin_realm_url("tenant-a", ["users"]))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Credential strategies
//!
//! | Builder method          | Grant                | Client id                  |
//! |-------------------------|----------------------|----------------------------|
//! | `with_password`         | `password`           | `admin-cli`                |
//! | `with_client_secret`    | `client_credentials` | the authentication realm   |
//! | `with_token_provider`   | none, no network     | n/a                        |
//!
//! The client id can be overridden with `with_client_id`.
//!
//! ## Serializer
//!
//! Bodies are written with camelCase keys and without `null` fields by default.
//! Map fields such as `attributes` or a protocol mapper `config` keep their keys as they are.
//! Use [`KeycloakClient::set_serializer`] to change it:
//!
//! ```rust
//! use kcadmin_core::{FieldCasing, KeycloakClient, NamingPolicy};
//!
//! # async fn example(client: &KeycloakClient) -> Result<(), Box<dyn std::error::Error>> {
//! let policy = NamingPolicy::new(FieldCasing::SnakeCase).with_omit_nulls(false);
//! client.set_serializer(Some(policy.shared())).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Token reuse
//!
//! Every base request obtains a new token unless
//! [`with_token_cache`](KeycloakClientBuilder::with_token_cache) is enabled.

mod client;

pub use self::client::{
    ADMIN_CLI_CLIENT_ID, AuthenticationError, BearerToken, ClientConfig, ConfigurationError,
    CredentialStrategy, Credentials, FieldCasing, GrantType, JsonSerializer, KeycloakClient,
    KeycloakClientBuilder, KeycloakClientError, NamingPolicy, RealmResolver, ResolvedRequest,
    SecureString, SerializerError, SharedSerializer, TokenProvider, UrlBuilder,
};
