//! Field classification. A name starting with `__` marks the value as private;
//! the marker stays part of the name so it survives a round trip.

use std::fmt;

use crate::crypto::envelope::{open, seal, EnvelopeError, SecretKey};

/// Prefix that marks a field as private.
pub const PRIVATE_MARKER: &str = "__";

pub fn is_private_name(name: &str) -> bool {
    name.starts_with(PRIVATE_MARKER)
}

/// A decrypted field. Private values only ever reach disk through [`seal`].
#[derive(Clone, PartialEq, Eq)]
pub enum Field {
    Plain { name: String, value: String },
    Private { name: String, value: String },
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if is_private_name(&name) {
            Field::Private { name, value }
        } else {
            Field::Plain { name, value }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Field::Plain { name, .. } | Field::Private { name, .. } => name,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Field::Plain { value, .. } | Field::Private { value, .. } => value,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Field::Private { .. })
    }

    pub(crate) fn set_value(&mut self, new_value: String) {
        match self {
            Field::Plain { value, .. } | Field::Private { value, .. } => *value = new_value,
        }
    }

    /// Text written to the store: verbatim for plain fields, a fresh token for private ones.
    pub(crate) fn to_stored(&self, key: &SecretKey) -> Result<String, EnvelopeError> {
        match self {
            Field::Plain { value, .. } => Ok(value.clone()),
            Field::Private { value, .. } => seal(value.as_bytes(), key),
        }
    }

    /// Rebuilds a field from stored text, opening the token if the name is private.
    pub(crate) fn from_stored(
        name: &str,
        stored: &str,
        key: &SecretKey,
    ) -> Result<Self, EnvelopeError> {
        if !is_private_name(name) {
            return Ok(Field::new(name, stored));
        }
        let plaintext = open(stored, key)?;
        let value = String::from_utf8(plaintext)
            .map_err(|e| EnvelopeError::Format(format!("decrypted value is not UTF-8: {e}")))?;
        Ok(Field::new(name, value))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Plain { name, value } => f
                .debug_struct("Plain")
                .field("name", name)
                .field("value", value)
                .finish(),
            Field::Private { name, .. } => f
                .debug_struct("Private")
                .field("name", name)
                .field("value", &"<redacted>")
                .finish(),
        }
    }
}

/// Checks that a section name can be written as a `[name]` header and read back.
pub(crate) fn validate_section_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("section name is empty".to_string());
    }
    if name.trim() != name {
        return Err("section name has surrounding whitespace".to_string());
    }
    if name.contains(['[', ']', '\n', '\r']) {
        return Err("section name contains brackets or line breaks".to_string());
    }
    Ok(())
}

/// Checks that a field can be written as a `name = value` line and read back.
pub(crate) fn validate_field(name: &str, value: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("field name is empty".to_string());
    }
    if name.trim() != name {
        return Err("field name has surrounding whitespace".to_string());
    }
    if name.contains(['=', '\n', '\r']) {
        return Err("field name contains `=` or line breaks".to_string());
    }
    if name.starts_with(['[', '#', ';']) {
        return Err("field name starts with `[`, `#` or `;`".to_string());
    }
    if value.contains(['\n', '\r']) {
        return Err("value contains line breaks".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_field, validate_section_name, Field};
    use crate::crypto::envelope::{EnvelopeError, SecretKey};

    #[test]
    fn classifies_by_marker() {
        assert!(!Field::new("user", "ahmed").is_private());
        assert!(Field::new("__password", "weakpassword").is_private());
        assert!(!Field::new("_single", "x").is_private());
        assert_eq!(Field::new("__token", "t").name(), "__token");
    }

    #[test]
    fn plain_values_are_stored_verbatim() {
        let key = SecretKey::from_array([1; 32]);
        let field = Field::new("user", "ahmed");
        assert_eq!(field.to_stored(&key).unwrap(), "ahmed");
        assert_eq!(Field::from_stored("user", "ahmed", &key).unwrap(), field);
    }

    #[test]
    fn private_values_are_sealed_and_opened() {
        let key = SecretKey::from_array([2; 32]);
        let field = Field::new("__password", "weakpassword");
        let stored = field.to_stored(&key).unwrap();
        assert!(!stored.contains("weakpassword"));
        assert_eq!(Field::from_stored("__password", &stored, &key).unwrap(), field);
    }

    #[test]
    fn private_value_with_wrong_key_is_rejected() {
        let stored = Field::new("__pw", "x")
            .to_stored(&SecretKey::from_array([3; 32]))
            .unwrap();
        let err = Field::from_stored("__pw", &stored, &SecretKey::from_array([4; 32])).unwrap_err();
        assert!(matches!(err, EnvelopeError::Authentication));
    }

    #[test]
    fn debug_redacts_private_values() {
        let rendered = format!("{:?}", Field::new("__password", "weakpassword"));
        assert!(rendered.contains("__password"));
        assert!(!rendered.contains("weakpassword"));
    }

    #[test]
    fn validates_names_and_values() {
        assert!(validate_section_name("twitter_app1").is_ok());
        assert!(validate_section_name("").is_err());
        assert!(validate_section_name(" padded").is_err());
        assert!(validate_section_name("a]b").is_err());

        assert!(validate_field("user", "a = b").is_ok());
        assert!(validate_field("", "v").is_err());
        assert!(validate_field("a=b", "v").is_err());
        assert!(validate_field("#comment", "v").is_err());
        assert!(validate_field("[x", "v").is_err());
        assert!(validate_field("user", "line\nbreak").is_err());
    }
}
