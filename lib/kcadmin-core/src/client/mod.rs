use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

mod auth;
pub use self::auth::{
    ADMIN_CLI_CLIENT_ID, AuthenticationError, CredentialStrategy, Credentials, SecureString,
    TokenProvider,
};

mod base_url;
pub use self::base_url::UrlBuilder;

mod builder;
pub use self::builder::KeycloakClientBuilder;

mod config;
pub use self::config::ClientConfig;

mod error;
pub use self::error::{ConfigurationError, KeycloakClientError};

mod realm;
pub use self::realm::RealmResolver;

mod request;
pub use self::request::ResolvedRequest;

mod serializer;
pub use self::serializer::{
    FieldCasing, JsonSerializer, NamingPolicy, SerializerError, SharedSerializer,
};

mod token;
use self::token::TokenCache;
pub use self::token::{BearerToken, GrantType};

/// Client for the Keycloak admin REST API.
///
/// The client owns an immutable [`ClientConfig`] and a replaceable serializer. Each call to
/// [`base_request`](Self::base_request) resolves the authentication realm, obtains a
/// bearer token and returns a [`ResolvedRequest`] ready for resource-specific paths.
///
/// # Example
///
/// ```rust,no_run
/// use kcadmin_core::KeycloakClient;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = KeycloakClient::with_password("https://idp.example.com", "admin", "admin")?;
///
/// let request = client.base_request("master").await?;
/// let realms: Vec<serde_json::Value> = request
///     .get_json(request.url(["admin", "realms"]))
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Thread Safety
///
/// The client is cheap to clone and can be shared across tasks. The serializer is held
/// behind an async lock: replacing it never races with a concurrent `base_request`, and
/// every request keeps the serializer that was current when it was created.
#[derive(Debug, Clone)]
pub struct KeycloakClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    serializer: Arc<RwLock<SharedSerializer>>,
    token_cache: Option<TokenCache>,
}

// Create
impl KeycloakClient {
    /// Creates a builder.
    pub fn builder() -> KeycloakClientBuilder {
        KeycloakClientBuilder::default()
    }

    /// Client using the resource-owner password grant, with the `/auth` segment.
    ///
    /// # Errors
    ///
    /// Fails if `base_url` is not a valid base URL.
    pub fn with_password(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecureString>,
    ) -> Result<Self, ConfigurationError> {
        Self::builder()
            .with_base_url(base_url)
            .with_password(username, password)
            .build()
    }

    /// Client using the client-credentials grant, with the `/auth` segment.
    ///
    /// # Errors
    ///
    /// Fails if `base_url` is not a valid base URL.
    pub fn with_client_secret(
        base_url: impl Into<String>,
        client_secret: impl Into<SecureString>,
    ) -> Result<Self, ConfigurationError> {
        Self::builder()
            .with_base_url(base_url)
            .with_client_secret(client_secret)
            .build()
    }

    /// Client using tokens from `provider`, with the `/auth` segment.
    ///
    /// # Errors
    ///
    /// Fails if `base_url` is not a valid base URL.
    pub fn with_token_provider<F>(
        base_url: impl Into<String>,
        provider: F,
    ) -> Result<Self, ConfigurationError>
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::builder()
            .with_base_url(base_url)
            .with_token_provider(provider)
            .build()
    }
}

// Configuration
impl KeycloakClient {
    /// The immutable configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The serializer currently in effect.
    pub async fn serializer(&self) -> SharedSerializer {
        Arc::clone(&*self.serializer.read().await)
    }

    /// Replaces the serializer used by subsequent base requests.
    ///
    /// Requests created before the call keep their serializer.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigurationError::MissingSerializer`] when `serializer` is `None`;
    /// the current serializer is then left in place.
    pub async fn set_serializer(
        &self,
        serializer: Option<SharedSerializer>,
    ) -> Result<(), ConfigurationError> {
        let serializer = serializer.ok_or(ConfigurationError::MissingSerializer)?;
        debug!(?serializer, "replacing serializer");
        *self.serializer.write().await = serializer;
        Ok(())
    }

    /// Token endpoint used for `requested_realm`, after realm resolution.
    ///
    /// # Errors
    ///
    /// Fails if the effective realm is empty.
    pub fn token_endpoint(&self, requested_realm: &str) -> Result<url::Url, ConfigurationError> {
        let realm = self.config.realms().resolve(requested_realm);
        self.config.urls().token_endpoint(realm)
    }
}

// Requests
impl KeycloakClient {
    /// Builds an authenticated request base for `requested_realm`.
    ///
    /// The token is obtained from the authentication realm when one is configured,
    /// from `requested_realm` otherwise.
    ///
    /// # Errors
    ///
    /// - [`KeycloakClientError::Authentication`] if no token could be obtained
    /// - [`KeycloakClientError::Configuration`] if the effective realm is empty
    /// - [`KeycloakClientError::Transport`] if the token endpoint is unreachable
    pub async fn base_request(
        &self,
        requested_realm: &str,
    ) -> Result<ResolvedRequest, KeycloakClientError> {
        let realm = self.config.realms().resolve(requested_realm);
        debug!(%requested_realm, authentication_realm = %realm, "resolving base request");

        let token = self.obtain_token(realm).await?;
        let serializer = self.serializer().await;

        ResolvedRequest::new(
            self.http.clone(),
            self.config.base_url().clone(),
            realm,
            token,
            serializer,
        )
    }

    async fn obtain_token(&self, realm: &str) -> Result<BearerToken, KeycloakClientError> {
        let strategy = self.config.strategy();
        // Provider tokens are the callback's business.
        let cache = self
            .token_cache
            .as_ref()
            .filter(|_| strategy.grant_type().is_some());

        if let Some(cache) = cache
            && let Some(token) = cache.get(realm).await
        {
            debug!(%realm, "reusing cached token");
            return Ok(token);
        }

        let token = strategy
            .obtain_token(&self.http, self.config.urls(), realm)
            .await?;

        if let Some(cache) = cache {
            cache.set(realm, token.clone()).await;
        }
        Ok(token)
    }
}
