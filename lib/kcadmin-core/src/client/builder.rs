use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use super::auth::{CredentialStrategy, Credentials, SecureString, TokenProvider};
use super::base_url::UrlBuilder;
use super::config::ClientConfig;
use super::realm::RealmResolver;
use super::serializer::{NamingPolicy, SharedSerializer};
use super::token::TokenCache;
use super::{ConfigurationError, KeycloakClient};

/// Builder for creating `KeycloakClient` instances.
///
/// # Default Configuration
///
/// - **`/auth` segment**: included (servers before Keycloak 17)
/// - **Authentication realm**: none, tokens are requested from the realm being managed
/// - **Serializer**: camelCase field names, `null` fields omitted
/// - **Token cache**: disabled, every base request obtains a fresh token
///
/// Exactly one of [`with_password`](Self::with_password),
/// [`with_client_secret`](Self::with_client_secret) or
/// [`with_token_provider`](Self::with_token_provider) must be called.
///
/// # Example
///
/// ```rust
/// use kcadmin_core::KeycloakClient;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = KeycloakClient::builder()
///     .with_base_url("https://idp.example.com")
///     .with_auth_segment(false)              // Keycloak 17 and later
///     .with_authentication_realm("master")   // admin user lives in master
///     .with_password("admin", "admin")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KeycloakClientBuilder {
    client: reqwest::Client,
    base_url: Option<String>,
    include_auth_segment: bool,
    authentication_realm: Option<String>,
    credentials: Vec<Credentials>,
    client_id: Option<String>,
    token_cache: Option<Duration>,
    serializer: SharedSerializer,
}

impl KeycloakClientBuilder {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Fails with a [`ConfigurationError`] if:
    /// - no base URL was set, or it cannot be used as a base
    /// - no credentials, or more than one kind of credentials, were set
    /// - the username, password or client secret is empty
    pub fn build(self) -> Result<KeycloakClient, ConfigurationError> {
        let Self {
            client,
            base_url,
            include_auth_segment,
            authentication_realm,
            credentials,
            client_id,
            token_cache,
            serializer,
        } = self;

        let base_url = base_url.ok_or(ConfigurationError::MissingBaseUrl)?;
        let urls = UrlBuilder::new(&base_url, include_auth_segment)?;

        let mut credentials = credentials.into_iter();
        let Some(first) = credentials.next() else {
            return Err(ConfigurationError::MissingCredentials);
        };
        if let Some(second) = credentials.next() {
            return Err(ConfigurationError::AmbiguousCredentials {
                first: first.kind(),
                second: second.kind(),
            });
        }
        if first.is_empty() {
            return Err(ConfigurationError::EmptyCredentials { kind: first.kind() });
        }

        let mut strategy = CredentialStrategy::new(first);
        if let Some(client_id) = client_id {
            strategy = strategy.with_client_id(client_id);
        }

        let config = ClientConfig::new(urls, RealmResolver::new(authentication_realm), strategy);

        Ok(KeycloakClient {
            http: client,
            config: Arc::new(config),
            serializer: Arc::new(RwLock::new(serializer)),
            token_cache: token_cache.map(TokenCache::new),
        })
    }

    /// Sets the server URL, e.g. `https://idp.example.com`.
    ///
    /// Trailing slashes are ignored.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets whether the legacy `/auth` path segment is used.
    ///
    /// Keycloak 17 removed it: set this to `false` for those servers.
    #[must_use]
    pub fn with_auth_segment(mut self, include_auth_segment: bool) -> Self {
        self.include_auth_segment = include_auth_segment;
        self
    }

    /// Requests tokens from `realm` instead of the realm being managed.
    ///
    /// An empty value means no override.
    #[must_use]
    pub fn with_authentication_realm(mut self, realm: impl Into<String>) -> Self {
        self.authentication_realm = Some(realm.into());
        self
    }

    /// Authenticates with the resource-owner password grant.
    #[must_use]
    pub fn with_password(
        mut self,
        username: impl Into<String>,
        password: impl Into<SecureString>,
    ) -> Self {
        self.credentials.push(Credentials::Password {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Authenticates with the client-credentials grant.
    ///
    /// Unless [`with_client_id`](Self::with_client_id) is used, the realm name is sent as client id.
    #[must_use]
    pub fn with_client_secret(mut self, client_secret: impl Into<SecureString>) -> Self {
        self.credentials
            .push(Credentials::ClientSecret(client_secret.into()));
        self
    }

    /// Uses tokens supplied by `provider`, no token request is ever sent.
    #[must_use]
    pub fn with_token_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.credentials
            .push(Credentials::TokenProvider(TokenProvider::new(provider)));
        self
    }

    /// Overrides the OAuth2 client id sent to the token endpoint.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Reuses tokens per realm until they expire within `refresh_threshold`.
    ///
    /// Tokens from a token provider are never cached, nor are tokens whose response
    /// carries no `expires_in`.
    #[must_use]
    pub fn with_token_cache(mut self, refresh_threshold: Duration) -> Self {
        self.token_cache = Some(refresh_threshold);
        self
    }

    /// Sets the initial serializer.
    #[must_use]
    pub fn with_serializer(mut self, serializer: SharedSerializer) -> Self {
        self.serializer = serializer;
        self
    }

    /// Uses a preconfigured reqwest client (timeouts, proxies, TLS).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

impl Default for KeycloakClientBuilder {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
            include_auth_segment: true,
            authentication_realm: None,
            credentials: Vec::new(),
            client_id: None,
            token_cache: None,
            serializer: NamingPolicy::default().shared(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn should_build_with_defaults() {
        let client = KeycloakClient::builder()
            .with_base_url("https://idp.example.com")
            .with_password("admin", "admin")
            .build()
            .expect("should build client");

        let config = client.config();
        assert_eq!(config.base_url().as_str(), "https://idp.example.com/auth/");
        assert!(config.includes_auth_segment());
        assert_eq!(config.authentication_realm(), None);
        assert!(matches!(
            config.strategy().credentials(),
            Credentials::Password { username, .. } if username == "admin"
        ));
    }

    #[test]
    fn should_require_base_url() {
        let result = KeycloakClient::builder()
            .with_client_secret("secret")
            .build();

        assert_eq!(result.err(), Some(ConfigurationError::MissingBaseUrl));
    }

    #[test]
    fn should_require_credentials() {
        let result = KeycloakClient::builder()
            .with_base_url("https://idp.example.com")
            .build();

        assert_eq!(result.err(), Some(ConfigurationError::MissingCredentials));
    }

    #[test]
    fn should_reject_ambiguous_credentials() {
        let result = KeycloakClient::builder()
            .with_base_url("https://idp.example.com")
            .with_password("admin", "admin")
            .with_token_provider(|| "token".to_string())
            .build();

        assert_eq!(
            result.err(),
            Some(ConfigurationError::AmbiguousCredentials {
                first: "password",
                second: "token provider",
            })
        );
    }

    #[rstest]
    #[case::empty_secret(KeycloakClient::builder().with_client_secret(""), "client secret")]
    #[case::empty_password(KeycloakClient::builder().with_password("admin", ""), "password")]
    #[case::empty_username(KeycloakClient::builder().with_password("", "admin"), "password")]
    #[case::all_empty(KeycloakClient::builder().with_password("", ""), "password")]
    fn should_reject_empty_credentials(
        #[case] builder: KeycloakClientBuilder,
        #[case] kind: &'static str,
    ) {
        let result = builder.with_base_url("https://idp.example.com").build();

        assert_eq!(result.err(), Some(ConfigurationError::EmptyCredentials { kind }));
    }

    #[test]
    fn should_accept_token_provider_without_inputs() {
        let result = KeycloakClient::builder()
            .with_base_url("https://idp.example.com")
            .with_token_provider(String::new)
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn should_reject_invalid_base_url() {
        let result = KeycloakClient::builder()
            .with_base_url("idp.example.com")
            .with_client_secret("secret")
            .build();

        assert!(matches!(
            result.err(),
            Some(ConfigurationError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn should_ignore_empty_authentication_realm() {
        let client = KeycloakClient::builder()
            .with_base_url("https://idp.example.com")
            .with_authentication_realm("")
            .with_client_secret("secret")
            .build()
            .expect("should build client");

        assert_eq!(client.config().authentication_realm(), None);
    }

    #[test]
    fn should_redact_secrets_in_debug() {
        let builder = KeycloakClient::builder()
            .with_base_url("https://idp.example.com")
            .with_password("admin", "very-secret-password");

        let debug_str = format!("{builder:?}");

        assert!(debug_str.contains("admin"));
        assert!(!debug_str.contains("very-secret-password"));
    }
}
