use std::fmt;
use std::sync::Arc;

use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::KeycloakClientError;
use super::base_url::UrlBuilder;
use super::token::{BearerToken, GrantType, TokenForm, request_token};

/// Client id used by the resource-owner password grant when none is configured.
pub const ADMIN_CLI_CLIENT_ID: &str = "admin-cli";

/// Errors raised while obtaining a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum AuthenticationError {
    /// The token provider callback returned an empty string.
    #[display("Token provider returned an empty token")]
    EmptyToken,

    /// The identity provider refused the credentials.
    #[display("Credentials rejected by realm '{realm}' (status {status_code}): {message}")]
    Rejected {
        /// Realm the token was requested from.
        realm: String,
        /// HTTP status returned by the token endpoint.
        status_code: u16,
        /// Error description extracted from the response.
        message: String,
    },

    /// The token endpoint answered with something that is not a usable token.
    #[display("Invalid token response: {reason}")]
    InvalidTokenResponse {
        /// What was wrong with the response.
        reason: String,
    },

    /// The token cannot be carried in an HTTP header.
    #[display("Bearer token contains invalid characters: {message}")]
    InvalidBearerToken {
        /// Description of the invalid characters.
        message: String,
    },
}

/// Secure wrapper for sensitive string data that zeroes its memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureString(String);

impl SecureString {
    /// Creates a new secure string from the provided value.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns a reference to the inner string value.
    ///
    /// # Security Note
    /// The returned reference should not be stored for extended periods
    /// to minimize exposure time of sensitive data.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn mask_sensitive(value: &str) -> String {
        if value.len() <= 8 {
            "***".to_string()
        } else {
            let head = value.get(..4).unwrap_or_default();
            let tail = value.get(value.len() - 4..).unwrap_or_default();
            format!("{head}...{tail}")
        }
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureString")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::mask_sensitive(&self.0))
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

/// Zero-argument callback supplying an externally obtained bearer token.
///
/// The value is used as-is on every request; refreshing it is the callback's business.
#[derive(Clone)]
pub struct TokenProvider(Arc<dyn Fn() -> String + Send + Sync>);

impl TokenProvider {
    /// Wraps a callback.
    pub fn new<F>(provider: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self(Arc::new(provider))
    }

    /// Invokes the callback.
    pub fn token(&self) -> String {
        (self.0)()
    }
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TokenProvider").field(&"<callback>").finish()
    }
}

/// The credential material a client authenticates with.
///
/// Exactly one variant is selected when the client is built.
#[derive(Clone)]
pub enum Credentials {
    /// Resource-owner password grant.
    Password {
        /// Login of the administrative user.
        username: String,
        /// Password of the administrative user.
        password: SecureString,
    },

    /// Client-credentials grant with a confidential client secret.
    ClientSecret(SecureString),

    /// Externally supplied token, no network call is made.
    TokenProvider(TokenProvider),
}

impl Credentials {
    /// Short human readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::ClientSecret(_) => "client secret",
            Self::TokenProvider(_) => "token provider",
        }
    }

    /// Returns `true` if a username, password or client secret is empty.
    ///
    /// A token provider is only checked when it is called.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Password { username, password } => username.is_empty() || password.is_empty(),
            Self::ClientSecret(secret) => secret.is_empty(),
            Self::TokenProvider(_) => false,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::ClientSecret(_) => f.debug_tuple("ClientSecret").field(&"[REDACTED]").finish(),
            Self::TokenProvider(provider) => {
                f.debug_tuple("TokenProvider").field(provider).finish()
            }
        }
    }
}

/// Turns the configured [`Credentials`] into bearer tokens.
#[derive(Debug, Clone)]
pub struct CredentialStrategy {
    credentials: Credentials,
    client_id: Option<String>,
}

impl CredentialStrategy {
    /// Creates a strategy for the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            client_id: None,
        }
    }

    /// Overrides the OAuth2 client id sent to the token endpoint.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// The configured credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The grant sent to the token endpoint, `None` for a token provider.
    pub fn grant_type(&self) -> Option<GrantType> {
        match self.credentials {
            Credentials::Password { .. } => Some(GrantType::Password),
            Credentials::ClientSecret(_) => Some(GrantType::ClientCredentials),
            Credentials::TokenProvider(_) => None,
        }
    }

    /// Client id presented for `realm`.
    ///
    /// Password grants default to `admin-cli`, client-credentials grants to the realm name.
    pub fn client_id<'a>(&'a self, realm: &'a str) -> &'a str {
        match (&self.client_id, &self.credentials) {
            (Some(client_id), _) => client_id.as_str(),
            (None, Credentials::ClientSecret(_)) => realm,
            (None, _) => ADMIN_CLI_CLIENT_ID,
        }
    }

    /// Obtains a bearer token valid for `realm`.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthenticationError`] when the callback yields an empty token or the
    /// identity provider rejects the credentials, and with a transport error when the token
    /// endpoint cannot be reached.
    pub async fn obtain_token(
        &self,
        http: &reqwest::Client,
        urls: &UrlBuilder,
        realm: &str,
    ) -> Result<BearerToken, KeycloakClientError> {
        let form = match &self.credentials {
            Credentials::TokenProvider(provider) => {
                let token = provider.token();
                if token.is_empty() {
                    return Err(AuthenticationError::EmptyToken.into());
                }
                debug!(%realm, "using token from provider");
                return Ok(BearerToken::new(token));
            }
            Credentials::Password { username, password } => TokenForm::password(
                self.client_id(realm),
                username,
                password.as_str(),
            ),
            Credentials::ClientSecret(secret) => {
                TokenForm::client_credentials(self.client_id(realm), secret.as_str())
            }
        };

        let endpoint = urls.token_endpoint(realm)?;
        request_token(http, endpoint, realm, &form).await
    }
}
