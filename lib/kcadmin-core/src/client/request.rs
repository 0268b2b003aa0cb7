use std::fmt;

use http::{HeaderValue, Method};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::KeycloakClientError;
use super::base_url::append_segments;
use super::serializer::{SerializerError, SharedSerializer};
use super::token::BearerToken;

/// An authenticated request base, produced by
/// [`KeycloakClient::base_request`](super::KeycloakClient::base_request).
///
/// Holds the base URL, the bearer token and the serializer that was configured at the
/// time it was created. Replacing the client serializer afterwards does not affect it.
///
/// # Example
///
/// ```rust,no_run
/// use kcadmin_core::KeycloakClient;
/// # use serde::Deserialize;
/// # #[derive(Deserialize)]
/// # struct User { id: String, username: String }
///
/// # async fn example(client: &KeycloakClient) -> Result<(), Box<dyn std::error::Error>> {
/// let request = client.base_request("tenant-a").await?;
/// let url = request.admin_realm_url("tenant-a", ["users"]);
/// let users: Vec<User> = request.get_json(url).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResolvedRequest {
    http: reqwest::Client,
    base_url: Url,
    authentication_realm: String,
    token: BearerToken,
    authorization: HeaderValue,
    serializer: SharedSerializer,
}

impl ResolvedRequest {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: Url,
        authentication_realm: &str,
        token: BearerToken,
        serializer: SharedSerializer,
    ) -> Result<Self, KeycloakClientError> {
        let authorization = token.to_header_value()?;
        Ok(Self {
            http,
            base_url,
            authentication_realm: authentication_realm.to_string(),
            token,
            authorization,
            serializer,
        })
    }

    /// The base URL, ending with `/`, e.g. `https://idp.example.com/auth/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The realm the token was obtained from.
    pub fn authentication_realm(&self) -> &str {
        &self.authentication_realm
    }

    /// The `Authorization` header value: `Bearer <token>`.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token.secret())
    }

    /// The bearer token attached to the request.
    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    /// The serializer bound to this request.
    pub fn serializer(&self) -> &SharedSerializer {
        &self.serializer
    }

    /// Base URL followed by the given path segments (percent-encoded).
    pub fn url<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        append_segments(&self.base_url, segments)
    }

    /// URL of an admin resource of `realm`: `{base}admin/realms/{realm}/{segments...}`.
    pub fn admin_realm_url<I>(&self, realm: &str, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let realm_url = append_segments(&self.base_url, ["admin", "realms", realm]);
        append_segments(&realm_url, segments)
    }

    /// Starts a request carrying the bearer token.
    pub fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, "application/json")
    }

    /// Encodes `body` with the bound serializer.
    ///
    /// # Errors
    ///
    /// Fails if `body` cannot be represented as JSON.
    pub fn encode<T>(&self, body: &T) -> Result<Vec<u8>, SerializerError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(body)?;
        self.serializer.encode(value)
    }

    /// Decodes `body` with the bound serializer.
    ///
    /// # Errors
    ///
    /// Fails if `body` is not valid JSON or does not match `T`.
    pub fn decode<T>(&self, body: &[u8]) -> Result<T, SerializerError>
    where
        T: DeserializeOwned,
    {
        let value = self.serializer.decode(body)?;
        serde_path_to_error::deserialize(value).map_err(|err| SerializerError::Decode {
            path: err.path().to_string(),
            error: err.into_inner(),
        })
    }

    /// Sends a request with an optional JSON body and decodes the JSON answer.
    ///
    /// An empty answer decodes like `null`, so `()` or `Option<_>` can be used for
    /// endpoints that return no content.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, on non-success statuses and on (de)serialization errors.
    pub async fn send_json<B, R>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<R, KeycloakClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.request(method.clone(), url.clone());
        if let Some(body) = body {
            let bytes = self.encode(body)?;
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(bytes);
        }

        debug!(%method, %url, "sending...");
        let response = request.send().await?;
        let status = response.status();
        debug!(%status, "...receiving");
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(KeycloakClientError::UnexpectedStatusCode {
                status_code: status.as_u16(),
                url: url.to_string(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let result = self.decode(&bytes)?;
        Ok(result)
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// See [`Self::send_json`].
    pub async fn get_json<R>(&self, url: Url) -> Result<R, KeycloakClientError>
    where
        R: DeserializeOwned,
    {
        self.send_json::<(), R>(Method::GET, url, None).await
    }
}

impl fmt::Debug for ResolvedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedRequest")
            .field("base_url", &self.base_url.as_str())
            .field("authentication_realm", &self.authentication_realm)
            .field("authorization", &"[REDACTED]")
            .field("serializer", &self.serializer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::client::serializer::{FieldCasing, NamingPolicy};

    fn create_request(serializer: SharedSerializer) -> ResolvedRequest {
        let base_url = Url::parse("https://idp.example.com/auth/").expect("valid url");
        ResolvedRequest::new(
            reqwest::Client::new(),
            base_url,
            "master",
            BearerToken::new("abc"),
            serializer,
        )
        .expect("should create request")
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct UserRepresentation {
        username: String,
        first_name: Option<String>,
        email_verified: bool,
    }

    #[test]
    fn should_expose_bearer_header() {
        let request = create_request(NamingPolicy::default().shared());

        assert_eq!(request.authorization_header(), "Bearer abc");
        assert_eq!(request.authentication_realm(), "master");
        assert_eq!(request.base_url().as_str(), "https://idp.example.com/auth/");
    }

    #[test]
    fn should_build_admin_realm_url() {
        let request = create_request(NamingPolicy::default().shared());

        let url = request.admin_realm_url("tenant a", ["users", "42", "groups"]);

        insta::assert_snapshot!(url, @"https://idp.example.com/auth/admin/realms/tenant%20a/users/42/groups");
    }

    #[test]
    fn should_build_url_from_segments() {
        let request = create_request(NamingPolicy::default().shared());

        let url = request.url(["admin", "serverinfo"]);

        assert_eq!(url.as_str(), "https://idp.example.com/auth/admin/serverinfo");
    }

    #[test]
    fn should_attach_authorization_to_request() {
        let request = create_request(NamingPolicy::default().shared());

        let built = request
            .request(Method::GET, request.url(["admin", "realms"]))
            .build()
            .expect("should build request");

        assert_eq!(
            built.headers().get(AUTHORIZATION).expect("has authorization"),
            "Bearer abc"
        );
        assert_eq!(built.url().as_str(), "https://idp.example.com/auth/admin/realms");
    }

    #[test]
    fn should_encode_with_bound_serializer() {
        let request = create_request(NamingPolicy::default().shared());
        let user = UserRepresentation {
            username: "jdoe".to_string(),
            first_name: None,
            email_verified: true,
        };

        let body = request.encode(&user).expect("should encode");

        insta::assert_snapshot!(String::from_utf8_lossy(&body), @r#"{"emailVerified":true,"username":"jdoe"}"#);
    }

    #[test]
    fn should_decode_with_bound_serializer() {
        let request = create_request(NamingPolicy::new(FieldCasing::PascalCase).shared());

        let user: UserRepresentation = request
            .decode(br#"{"Username":"jdoe","FirstName":"John","EmailVerified":false}"#)
            .expect("should decode");

        assert_eq!(
            user,
            UserRepresentation {
                username: "jdoe".to_string(),
                first_name: Some("John".to_string()),
                email_verified: false,
            }
        );
    }

    #[test]
    fn should_report_decode_path() {
        let request = create_request(NamingPolicy::default().shared());

        let result =
            request.decode::<UserRepresentation>(br#"{"username":"jdoe","emailVerified":"yes"}"#);

        match result.expect_err("should fail") {
            SerializerError::Decode { path, .. } => assert_eq!(path, "email_verified"),
            other => panic!("Expected Decode error, got {other:?}"),
        }
    }

    #[test]
    fn should_redact_debug_output() {
        let request = create_request(NamingPolicy::default().shared());

        let debug_str = format!("{request:?}");

        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("abc\""));
    }
}
