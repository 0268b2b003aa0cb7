//! Token endpoint exchange, bearer tokens and the optional token cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::HeaderValue;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::KeycloakClientError;
use super::auth::AuthenticationError;

/// OAuth2 grant sent to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    /// Resource-owner password credentials.
    Password,
    /// Client credentials.
    ClientCredentials,
}

impl GrantType {
    /// Value of the `grant_type` form field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Form-encoded body of a token request.
#[derive(Serialize)]
pub(crate) struct TokenForm<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
}

impl<'a> TokenForm<'a> {
    pub(crate) fn password(client_id: &'a str, username: &'a str, password: &'a str) -> Self {
        Self {
            grant_type: GrantType::Password.as_str(),
            client_id,
            username: Some(username),
            password: Some(password),
            client_secret: None,
        }
    }

    pub(crate) fn client_credentials(client_id: &'a str, client_secret: &'a str) -> Self {
        Self {
            grant_type: GrantType::ClientCredentials.as_str(),
            client_id,
            username: None,
            password: None,
            client_secret: Some(client_secret),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Posts `form` to `endpoint` and extracts the `access_token` of the answer.
pub(crate) async fn request_token(
    http: &reqwest::Client,
    endpoint: Url,
    realm: &str,
    form: &TokenForm<'_>,
) -> Result<BearerToken, KeycloakClientError> {
    let body = serde_urlencoded::to_string(form)?;

    debug!(grant_type = form.grant_type, %realm, %endpoint, "requesting token");
    let response = http
        .post(endpoint)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(ACCEPT, "application/json")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        warn!(%realm, status = status.as_u16(), "token request rejected");
        return Err(AuthenticationError::Rejected {
            realm: realm.to_string(),
            status_code: status.as_u16(),
            message: rejection_message(&bytes),
        }
        .into());
    }

    let payload: TokenResponse =
        serde_json::from_slice(&bytes).map_err(|err| AuthenticationError::InvalidTokenResponse {
            reason: err.to_string(),
        })?;

    let Some(access_token) = payload.access_token.filter(|token| !token.is_empty()) else {
        return Err(AuthenticationError::InvalidTokenResponse {
            reason: "missing access_token".to_string(),
        }
        .into());
    };

    let token = match payload.expires_in {
        Some(seconds) => BearerToken::with_expiry(access_token, Duration::from_secs(seconds)),
        None => BearerToken::new(access_token),
    };
    Ok(token)
}

fn rejection_message(body: &[u8]) -> String {
    match serde_json::from_slice::<TokenErrorResponse>(body) {
        Ok(TokenErrorResponse {
            error,
            error_description: Some(description),
        }) => format!("{error}: {description}"),
        Ok(TokenErrorResponse { error, .. }) => error,
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

/// A bearer token with optional expiration tracking.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BearerToken {
    secret: String,
    #[zeroize(skip)]
    expires_at: Option<Instant>,
}

impl BearerToken {
    /// Creates a token without known expiry.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: None,
        }
    }

    /// Creates a token expiring after `expires_in`.
    pub fn with_expiry(secret: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_at: Some(Instant::now() + expires_in),
        }
    }

    /// Returns the raw token value.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns `true` if the token expires within `threshold`.
    ///
    /// Tokens without a known expiry never need a refresh.
    pub fn should_refresh(&self, threshold: Duration) -> bool {
        self.expires_at
            .is_some_and(|exp| Instant::now() + threshold >= exp)
    }

    /// Builds the `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Fails if the token contains characters not allowed in a header.
    pub fn to_header_value(&self) -> Result<HeaderValue, AuthenticationError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.secret)).map_err(
            |err| AuthenticationError::InvalidBearerToken {
                message: err.to_string(),
            },
        )?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Per-realm token cache, only used when enabled on the builder.
#[derive(Debug, Clone)]
pub(crate) struct TokenCache {
    tokens: Arc<RwLock<HashMap<String, BearerToken>>>,
    refresh_threshold: Duration,
}

impl TokenCache {
    pub(crate) fn new(refresh_threshold: Duration) -> Self {
        Self {
            tokens: Arc::default(),
            refresh_threshold,
        }
    }

    /// Returns the token of `realm` unless it is about to expire.
    pub(crate) async fn get(&self, realm: &str) -> Option<BearerToken> {
        let guard = self.tokens.read().await;
        guard
            .get(realm)
            .filter(|token| !token.should_refresh(self.refresh_threshold))
            .cloned()
    }

    /// Stores the token of `realm`. Tokens without a known expiry are not kept.
    pub(crate) async fn set(&self, realm: &str, token: BearerToken) {
        if token.expires_at.is_none() {
            debug!(%realm, "token has no expiry, not caching it");
            return;
        }
        let mut guard = self.tokens.write().await;
        guard.insert(realm.to_string(), token);
    }
}
