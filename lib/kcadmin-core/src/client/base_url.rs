use url::Url;

use super::ConfigurationError;

const AUTH_SEGMENT: &str = "auth";

/// Builds the server URLs, with or without the legacy `/auth` segment.
///
/// Keycloak dropped the `/auth` prefix in version 17. The same flag drives both the
/// admin base URL and the token endpoint so that every request agrees on the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    base_url: Url,
    include_auth_segment: bool,
}

impl UrlBuilder {
    /// Parses `base_url` and appends the `auth` segment when requested.
    ///
    /// Trailing slashes, query and fragment of `base_url` are dropped. The resulting
    /// base URL always ends with a `/` so that relative segments can be appended.
    ///
    /// # Errors
    ///
    /// Fails if `base_url` is not an absolute URL that can carry a path.
    pub fn new(base_url: &str, include_auth_segment: bool) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };

        let mut url = Url::parse(base_url).map_err(|err| invalid(err.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base".to_string()));
        }
        url.set_query(None);
        url.set_fragment(None);

        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| invalid("URL cannot be used as a base".to_string()))?;
            segments.pop_if_empty();
            if include_auth_segment {
                segments.push(AUTH_SEGMENT);
            }
            segments.push("");
        }

        Ok(Self {
            base_url: url,
            include_auth_segment,
        })
    }

    /// The base URL of every admin request, e.g. `https://idp.example.com/auth/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether the legacy `/auth` segment is part of the URLs.
    pub fn includes_auth_segment(&self) -> bool {
        self.include_auth_segment
    }

    /// OpenID Connect token endpoint of `realm`.
    ///
    /// # Errors
    ///
    /// Fails if `realm` is empty.
    pub fn token_endpoint(&self, realm: &str) -> Result<Url, ConfigurationError> {
        if realm.is_empty() {
            return Err(ConfigurationError::EmptyRealm);
        }
        Ok(append_segments(
            &self.base_url,
            ["realms", realm, "protocol", "openid-connect", "token"],
        ))
    }
}

/// Appends percent-encoded path segments to `base`.
pub(crate) fn append_segments<I>(base: &Url, segments: I) -> Url
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty();
        path.extend(segments);
    }
    url
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::bare("https://idp.example.com", true, "https://idp.example.com/auth/")]
    #[case::trailing_slash("https://idp.example.com/", true, "https://idp.example.com/auth/")]
    #[case::many_slashes("https://idp.example.com///", true, "https://idp.example.com/auth/")]
    #[case::no_auth("https://idp.example.com", false, "https://idp.example.com/")]
    #[case::no_auth_trailing("https://idp.example.com//", false, "https://idp.example.com/")]
    #[case::sub_path("https://example.com/keycloak/", true, "https://example.com/keycloak/auth/")]
    #[case::sub_path_no_auth(
        "https://example.com/keycloak",
        false,
        "https://example.com/keycloak/"
    )]
    #[case::query_dropped("http://localhost:8080/?x=1#top", true, "http://localhost:8080/auth/")]
    fn should_build_base_url(
        #[case] base_url: &str,
        #[case] include_auth_segment: bool,
        #[case] expected: &str,
    ) {
        let urls = UrlBuilder::new(base_url, include_auth_segment).expect("valid base url");

        assert_eq!(urls.base_url().as_str(), expected);
        assert_eq!(
            urls.base_url().path().trim_end_matches('/').ends_with("/auth"),
            include_auth_segment
        );
    }

    #[rstest]
    #[case(true, "https://idp.example.com/auth/realms/master/protocol/openid-connect/token")]
    #[case(false, "https://idp.example.com/realms/master/protocol/openid-connect/token")]
    fn should_build_token_endpoint(#[case] include_auth_segment: bool, #[case] expected: &str) {
        let urls =
            UrlBuilder::new("https://idp.example.com", include_auth_segment).expect("valid url");

        let endpoint = urls.token_endpoint("master").expect("should build endpoint");

        assert_eq!(endpoint.as_str(), expected);
    }

    #[test]
    fn should_encode_realm_in_token_endpoint() {
        let urls = UrlBuilder::new("https://idp.example.com", false).expect("valid url");

        let endpoint = urls.token_endpoint("my realm/x").expect("should build endpoint");

        insta::assert_snapshot!(endpoint, @"https://idp.example.com/realms/my%20realm%2Fx/protocol/openid-connect/token");
    }

    #[test]
    fn should_reject_empty_realm() {
        let urls = UrlBuilder::new("https://idp.example.com", true).expect("valid url");

        let result = urls.token_endpoint("");

        assert_eq!(result, Err(ConfigurationError::EmptyRealm));
    }

    #[rstest]
    #[case("not-a-url")]
    #[case("mailto:admin@example.com")]
    #[case("")]
    fn should_reject_invalid_base_url(#[case] base_url: &str) {
        let result = UrlBuilder::new(base_url, true);

        match result.expect_err("should fail") {
            ConfigurationError::InvalidBaseUrl { url, .. } => assert_eq!(url, base_url),
            other => panic!("Expected InvalidBaseUrl, got {other:?}"),
        }
    }

    #[test]
    fn should_append_segments() {
        let urls = UrlBuilder::new("https://idp.example.com", true).expect("valid url");

        let url = append_segments(urls.base_url(), ["admin", "realms", "tenant-a", "users"]);

        assert_eq!(
            url.as_str(),
            "https://idp.example.com/auth/admin/realms/tenant-a/users"
        );
    }
}
