//! Account identity types.
//!
//! An external identity provider hands out an opaque identifier once a
//! principal is authenticated. The application maps it to a small numeric
//! [`LocalAccountKey`] that scopes warranty records on the backend.

use core::fmt;
use core::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::id::LocalAccountKey;

/// Errors that can occur when parsing an [`ExternalId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalIdError {
    /// The input string is empty or whitespace only.
    #[error("external id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("external id must be at most {max} bytes")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// An opaque identifier issued by the external authentication provider.
///
/// The value is kept exactly as issued; it is only checked for emptiness and
/// length.
///
/// ## Examples
///
/// ```
/// use warranty_core::ExternalId;
///
/// assert!(ExternalId::parse("Zx81kPq2").is_ok());
/// assert!(ExternalId::parse("").is_err());
/// assert!(ExternalId::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalId(String);

impl ExternalId {
    /// Maximum length of an external identifier in bytes.
    pub const MAX_LENGTH: usize = 256;

    /// Parse an `ExternalId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, whitespace only, or longer
    /// than [`Self::MAX_LENGTH`] bytes.
    pub fn parse(s: &str) -> Result<Self, ExternalIdError> {
        if s.trim().is_empty() {
            return Err(ExternalIdError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(ExternalIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ExternalId {
    type Err = ExternalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExternalId {
    type Error = ExternalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ExternalId> for String {
    fn from(id: ExternalId) -> Self {
        id.0
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur when building a [`KeySpace`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeySpaceError {
    /// Keys must be strictly positive.
    #[error("key space minimum must be at least 1 (got {0})")]
    NonPositive(i32),
    /// The range is empty.
    #[error("key space minimum {min} exceeds maximum {max}")]
    Inverted {
        /// Requested minimum.
        min: i32,
        /// Requested maximum.
        max: i32,
    },
}

/// Inclusive range from which new local account keys are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpace {
    min: i32,
    max: i32,
}

impl KeySpace {
    /// The historical range used by the mobile client: `1..=5000`.
    pub const DEFAULT: Self = Self { min: 1, max: 5000 };

    /// Create a key space covering `min..=max`.
    ///
    /// # Errors
    ///
    /// Returns an error if `min < 1` or `min > max`.
    pub const fn new(min: i32, max: i32) -> Result<Self, KeySpaceError> {
        if min < 1 {
            return Err(KeySpaceError::NonPositive(min));
        }
        if min > max {
            return Err(KeySpaceError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// Smallest key that can be drawn.
    #[must_use]
    pub const fn min(&self) -> i32 {
        self.min
    }

    /// Largest key that can be drawn.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Number of distinct keys in the space.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.max.abs_diff(self.min) as u64 + 1
    }

    /// A key space always holds at least one key.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Whether `key` lies inside the space.
    #[must_use]
    pub const fn contains(&self, key: LocalAccountKey) -> bool {
        key.as_i32() >= self.min && key.as_i32() <= self.max
    }

    /// The space as a range, suitable for uniform sampling.
    #[must_use]
    pub const fn range(&self) -> RangeInclusive<i32> {
        self.min..=self.max
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The pairing of an external identifier with its local account key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountIdentity {
    /// Identifier issued by the external auth provider.
    pub external_id: ExternalId,
    /// Key used against backend services.
    pub account_key: LocalAccountKey,
}

impl AccountIdentity {
    /// Pair an external id with its account key.
    #[must_use]
    pub const fn new(external_id: ExternalId, account_key: LocalAccountKey) -> Self {
        Self {
            external_id,
            account_key,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_external_ids() {
        assert!(ExternalId::parse("uidA").is_ok());
        assert!(ExternalId::parse("q0SH7vJ2cXhH9mZf3PZkQ2nJr1a2").is_ok());
        assert!(ExternalId::parse("a").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ExternalId::parse(""), Err(ExternalIdError::Empty));
        assert_eq!(ExternalId::parse(" \t"), Err(ExternalIdError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "x".repeat(ExternalId::MAX_LENGTH + 1);
        assert!(matches!(
            ExternalId::parse(&long),
            Err(ExternalIdError::TooLong { .. })
        ));
    }

    #[test]
    fn test_external_id_is_opaque() {
        let id = ExternalId::parse(" padded ").unwrap();
        assert_eq!(id.as_str(), " padded ");
    }

    #[test]
    fn test_external_id_deserialize_validates() {
        let parsed: Result<ExternalId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let parsed: ExternalId = serde_json::from_str("\"uidA\"").unwrap();
        assert_eq!(parsed.as_str(), "uidA");
    }

    #[test]
    fn test_default_key_space() {
        let space = KeySpace::default();
        assert_eq!(space.min(), 1);
        assert_eq!(space.max(), 5000);
        assert_eq!(space.len(), 5000);
        assert!(space.contains(LocalAccountKey::new(1)));
        assert!(space.contains(LocalAccountKey::new(5000)));
        assert!(!space.contains(LocalAccountKey::new(0)));
        assert!(!space.contains(LocalAccountKey::new(5001)));
    }

    #[test]
    fn test_key_space_validation() {
        assert_eq!(KeySpace::new(0, 10), Err(KeySpaceError::NonPositive(0)));
        assert_eq!(
            KeySpace::new(10, 9),
            Err(KeySpaceError::Inverted { min: 10, max: 9 })
        );
        let single = KeySpace::new(7, 7).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single.range(), 7..=7);
    }
}
