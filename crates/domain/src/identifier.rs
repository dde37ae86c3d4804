//! Caller identity used as the key for lockout and write budgets.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use vaultgate_core::{AppError, AppResult, NonEmptyString};

/// Identifier shared by every caller that carries no identifying header.
pub const UNKNOWN_CLIENT_IDENTIFIER: &str = "unknown";

/// Edge-injected client address header trusted by default.
pub const DEFAULT_TRUSTED_CLIENT_IP_HEADER: &str = "cf-connecting-ip";

/// Standard proxy chain header; the left-most entry is the original client.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Longest identifier accepted from untrusted input.
pub const MAX_IDENTIFIER_LENGTH: usize = 256;

/// Rate-limit and lockout key for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIdentifier(String);

impl ClientIdentifier {
    /// Creates an identifier from an explicit value, such as a path segment.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = NonEmptyString::new(value)?;
        if value.as_str().len() > MAX_IDENTIFIER_LENGTH {
            return Err(AppError::Validation(format!(
                "identifier must be at most {MAX_IDENTIFIER_LENGTH} bytes"
            )));
        }

        Ok(Self(value.into()))
    }

    /// Returns the shared sentinel identifier.
    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT_IDENTIFIER.to_owned())
    }

    /// Derives the caller identity from request metadata.
    ///
    /// The trusted edge header wins when it carries a value. Otherwise the
    /// first entry of the forwarded-for chain is used. Callers with neither
    /// collapse into the [`UNKNOWN_CLIENT_IDENTIFIER`] bucket. Header values
    /// longer than [`MAX_IDENTIFIER_LENGTH`] bytes are cut at a character
    /// boundary.
    #[must_use]
    pub fn resolve(trusted_client_ip: Option<&str>, forwarded_for: Option<&str>) -> Self {
        if let Some(identifier) = trusted_client_ip.and_then(Self::from_header_value) {
            return identifier;
        }

        forwarded_for
            .and_then(|value| value.split(',').next())
            .and_then(Self::from_header_value)
            .unwrap_or_else(Self::unknown)
    }

    fn from_header_value(value: &str) -> Option<Self> {
        let value = value.trim();
        let end = value
            .char_indices()
            .map(|(index, character)| index + character.len_utf8())
            .take_while(|end| *end <= MAX_IDENTIFIER_LENGTH)
            .last()
            .unwrap_or(0);

        Self::new(&value[..end]).ok()
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns whether this is the shared sentinel bucket.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT_IDENTIFIER
    }
}

impl Display for ClientIdentifier {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<ClientIdentifier> for String {
    fn from(value: ClientIdentifier) -> Self {
        value.0
    }
}
