/// Picks the realm a token is requested from.
///
/// When an authentication realm is configured (e.g. a `master` service account
/// administering a tenant realm), it wins over the realm being managed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealmResolver {
    authentication_realm: Option<String>,
}

impl RealmResolver {
    /// Creates a resolver. An empty override is treated as no override.
    pub fn new(authentication_realm: Option<String>) -> Self {
        Self {
            authentication_realm: authentication_realm.filter(|realm| !realm.is_empty()),
        }
    }

    /// The configured override, if any.
    pub fn authentication_realm(&self) -> Option<&str> {
        self.authentication_realm.as_deref()
    }

    /// Returns the effective realm for `requested_realm`.
    pub fn resolve<'a>(&'a self, requested_realm: &'a str) -> &'a str {
        self.authentication_realm
            .as_deref()
            .unwrap_or(requested_realm)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("tenant-a")]
    #[case("master")]
    #[case("")]
    fn should_always_use_override(#[case] requested: &str) {
        let resolver = RealmResolver::new(Some("master".to_string()));

        assert_eq!(resolver.resolve(requested), "master");
    }

    #[rstest]
    #[case::absent(None)]
    #[case::empty(Some(String::new()))]
    fn should_keep_requested_realm_without_override(#[case] authentication_realm: Option<String>) {
        let resolver = RealmResolver::new(authentication_realm);

        assert_eq!(resolver.authentication_realm(), None);
        for requested in ["tenant-a", "master", ""] {
            assert_eq!(resolver.resolve(requested), requested);
        }
    }
}
