//! Opaque user/account identity.
//!
//! [`Identity`] is a newtype wrapper around `String` providing type safety
//! so that connection-registry keys cannot be confused with other strings.
//! Equality is exact, case-sensitive string match.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a message sender or recipient.
///
/// Names either an ordinary user or a public account. Used as the map key
/// in [`super::ConnectionRegistry`], as the delivery target recorded by
/// [`super::CorrelationTable`], and as a member of
/// [`super::PublicAccountSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Creates an `Identity` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identity is the empty string.
    ///
    /// Empty identities are rejected at validation time; this exists so the
    /// check is expressed in one place.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}
