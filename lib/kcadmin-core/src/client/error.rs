use super::auth::AuthenticationError;
use super::serializer::SerializerError;

/// Errors that can occur when using the [`KeycloakClient`](super::KeycloakClient).
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum KeycloakClientError {
    /// No bearer token could be obtained.
    ///
    /// Returned unchanged from the credential strategy, never retried.
    #[display("Authentication failed: {_0}")]
    Authentication(AuthenticationError),

    /// The client configuration cannot be used.
    #[display("Invalid configuration: {_0}")]
    Configuration(ConfigurationError),

    /// Network or timeout failure from the underlying reqwest client.
    ///
    /// Passed through without interpretation.
    #[display("Transport error: {_0}")]
    Transport(reqwest::Error),

    /// Token request form could not be encoded.
    #[display("Cannot encode token request: {_0}")]
    FormEncoding(serde_urlencoded::ser::Error),

    /// Request or response body (de)serialization failure.
    #[display("Serialization error: {_0}")]
    Serializer(SerializerError),

    /// A resource endpoint answered with a non-success status.
    #[display("Unexpected status code {status_code} for {url}: {body}")]
    #[from(skip)]
    UnexpectedStatusCode {
        /// The HTTP status received.
        status_code: u16,
        /// The requested URL.
        url: String,
        /// The response body, for debugging.
        body: String,
    },
}

/// Invalid or incomplete client configuration.
///
/// Detected when the client is built, or when a serializer is replaced.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum ConfigurationError {
    /// No base URL was provided.
    #[display("A base URL is required")]
    MissingBaseUrl,

    /// The base URL cannot be used to build request URLs.
    #[display("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// None of password, client secret or token provider was configured.
    #[display("No credentials configured: use a password, a client secret or a token provider")]
    MissingCredentials,

    /// More than one credential variant was configured.
    #[display("Ambiguous credentials: both {first} and {second} are configured")]
    AmbiguousCredentials {
        /// First configured variant.
        first: &'static str,
        /// Second configured variant.
        second: &'static str,
    },

    /// A username, password or client secret is empty.
    #[display("Empty {kind} credentials")]
    EmptyCredentials {
        /// The configured variant.
        kind: &'static str,
    },

    /// An absent serializer was supplied.
    #[display("A serializer is required")]
    MissingSerializer,

    /// The token endpoint needs a realm name.
    #[display("Realm name cannot be empty")]
    EmptyRealm,
}
