//! Pluggable JSON body encoding.
//!
//! A [`JsonSerializer`] decides how request bodies are written and how response
//! bodies are read back. The default, [`NamingPolicy::default`], matches what the
//! Keycloak admin API expects: camelCase field names, `null` fields omitted.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use cruet::*;
use serde_json::{Map, Value};

/// Errors raised while encoding or decoding bodies.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum SerializerError {
    /// The body is not valid JSON, or a value cannot be represented as JSON.
    #[display("JSON error: {_0}")]
    Json(serde_json::Error),

    /// The JSON does not match the expected Rust type.
    #[display("Failed to deserialize JSON at '{path}': {error}")]
    #[from(skip)]
    Decode {
        /// Location of the mismatch in the document.
        path: String,
        /// The underlying error.
        error: serde_json::Error,
    },
}

/// Strategy encoding request bodies and decoding response bodies.
pub trait JsonSerializer: Debug + Send + Sync {
    /// Encodes a JSON value into a request body.
    ///
    /// # Errors
    ///
    /// Fails if the value cannot be written.
    fn encode(&self, value: Value) -> Result<Vec<u8>, SerializerError>;

    /// Decodes a response body. An empty body decodes to [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Fails if the body is not valid JSON.
    fn decode(&self, body: &[u8]) -> Result<Value, SerializerError>;
}

/// A serializer shared between the client and the requests it produced.
pub type SharedSerializer = Arc<dyn JsonSerializer>;

/// Casing applied to object keys on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldCasing {
    /// `realmName`
    #[default]
    CamelCase,
    /// `realm_name`
    SnakeCase,
    /// `RealmName`
    PascalCase,
    /// `realm-name`
    KebabCase,
    /// Keys are left untouched in both directions.
    Unchanged,
}

impl FieldCasing {
    fn to_wire(self, key: &str) -> String {
        match self {
            Self::CamelCase => key.to_camel_case(),
            Self::SnakeCase => key.to_snake_case(),
            Self::PascalCase => key.to_pascal_case(),
            Self::KebabCase => key.to_kebab_case(),
            Self::Unchanged => key.to_string(),
        }
    }

    fn from_wire(self, key: &str) -> String {
        match self {
            Self::Unchanged => key.to_string(),
            _ => key.to_snake_case(),
        }
    }
}

/// Fields of the Keycloak representations holding free-form maps
/// (`attributes`, protocol mapper `config`, client ids in `clientRoles`...).
const KEYCLOAK_MAP_FIELDS: &[&str] = &[
    "access",
    "application_scope_mappings",
    "attributes",
    "authentication_flow_binding_overrides",
    "browser_security_headers",
    "client_roles",
    "client_scope_mappings",
    "config",
    "registered_nodes",
    "smtp_server",
];

/// Serializer renaming field names and optionally dropping `null` fields.
///
/// Encoding renames Rust `snake_case` field names to the wire casing; decoding renames
/// wire field names back to `snake_case`.
///
/// Only keys made of ASCII letters, digits and `_` are field names. Other keys, such as
/// `saml.assertion.signature`, are kept as they are. The content of map fields
/// (see [`with_map_field`](Self::with_map_field)) is never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    casing: FieldCasing,
    omit_nulls: bool,
    map_fields: BTreeSet<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encode,
    Decode,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::new(FieldCasing::CamelCase)
    }
}

impl NamingPolicy {
    /// Creates a policy with the given casing that omits `null` fields.
    ///
    /// The map fields of the Keycloak representations are registered.
    pub fn new(casing: FieldCasing) -> Self {
        Self {
            casing,
            omit_nulls: true,
            map_fields: KEYCLOAK_MAP_FIELDS
                .iter()
                .map(|field| (*field).to_string())
                .collect(),
        }
    }

    /// Registers a field whose value is a map with user-defined keys.
    ///
    /// Either casing can be given: `clientRoles` and `client_roles` are the same field.
    #[must_use]
    pub fn with_map_field(mut self, field: &str) -> Self {
        self.map_fields.insert(field.to_snake_case());
        self
    }

    /// Fields whose content is left untouched, in `snake_case`.
    pub fn map_fields(&self) -> impl Iterator<Item = &str> {
        self.map_fields.iter().map(String::as_str)
    }

    /// Sets whether `null` fields are omitted from request bodies.
    #[must_use]
    pub fn with_omit_nulls(mut self, omit_nulls: bool) -> Self {
        self.omit_nulls = omit_nulls;
        self
    }

    /// The wire casing.
    pub fn casing(&self) -> FieldCasing {
        self.casing
    }

    /// Whether `null` fields are omitted.
    pub fn omits_nulls(&self) -> bool {
        self.omit_nulls
    }

    /// Wraps the policy for [`KeycloakClient::set_serializer`](crate::KeycloakClient::set_serializer).
    pub fn shared(self) -> SharedSerializer {
        Arc::new(self)
    }
}

impl NamingPolicy {
    fn is_map_field(&self, key: &str) -> bool {
        is_field_name(key) && self.map_fields.contains(&key.to_snake_case())
    }

    fn rename_key(&self, key: String, direction: Direction) -> String {
        if !is_field_name(&key) {
            return key;
        }
        match direction {
            Direction::Encode => self.casing.to_wire(&key),
            Direction::Decode => self.casing.from_wire(&key),
        }
    }

    fn rename_keys(&self, value: Value, direction: Direction) -> Value {
        let omit_nulls = self.omit_nulls && direction == Direction::Encode;
        match value {
            Value::Object(fields) => {
                let fields = fields
                    .into_iter()
                    .filter(|(_, field)| !(omit_nulls && field.is_null()))
                    .map(|(key, field)| {
                        let field = if self.is_map_field(&key) {
                            field
                        } else {
                            self.rename_keys(field, direction)
                        };
                        (self.rename_key(key, direction), field)
                    })
                    .collect::<Map<_, _>>();
                Value::Object(fields)
            }
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.rename_keys(item, direction))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl JsonSerializer for NamingPolicy {
    fn encode(&self, value: Value) -> Result<Vec<u8>, SerializerError> {
        let value = self.rename_keys(value, Direction::Encode);
        Ok(serde_json::to_vec(&value)?)
    }

    fn decode(&self, body: &[u8]) -> Result<Value, SerializerError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        let value = serde_json::from_slice(body)?;
        Ok(self.rename_keys(value, Direction::Decode))
    }
}

fn is_field_name(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}
