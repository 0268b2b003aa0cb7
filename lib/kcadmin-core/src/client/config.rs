use url::Url;

use super::auth::CredentialStrategy;
use super::base_url::UrlBuilder;
use super::realm::RealmResolver;

/// Immutable client configuration, created by
/// [`KeycloakClientBuilder::build`](super::KeycloakClientBuilder::build).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    urls: UrlBuilder,
    realms: RealmResolver,
    strategy: CredentialStrategy,
}

impl ClientConfig {
    pub(crate) fn new(
        urls: UrlBuilder,
        realms: RealmResolver,
        strategy: CredentialStrategy,
    ) -> Self {
        Self {
            urls,
            realms,
            strategy,
        }
    }

    /// Base URL of admin requests, including the `/auth` segment when enabled.
    pub fn base_url(&self) -> &Url {
        self.urls.base_url()
    }

    /// Whether the legacy `/auth` segment is used.
    pub fn includes_auth_segment(&self) -> bool {
        self.urls.includes_auth_segment()
    }

    /// The authentication realm override.
    pub fn authentication_realm(&self) -> Option<&str> {
        self.realms.authentication_realm()
    }

    /// URL construction.
    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    /// Realm resolution.
    pub fn realms(&self) -> &RealmResolver {
        &self.realms
    }

    /// How tokens are obtained.
    pub fn strategy(&self) -> &CredentialStrategy {
        &self.strategy
    }
}
