//! Validated stream identifiers.
//!
//! A [`StreamId`] names one logical camera feed. It doubles as the name of the
//! feed's output directory and as a URL path segment, so only a conservative
//! character set is accepted.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

use crate::error::Error;

/// Maximum accepted identifier length in bytes.
pub const MAX_ID_LEN: usize = 128;

/// Caller-supplied key naming one stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamId(String);

impl StreamId {
    /// Validate and wrap an identifier.
    ///
    /// Accepts 1 to [`MAX_ID_LEN`] characters from `[A-Za-z0-9_.-]` that do
    /// not start with a dot.
    pub fn parse(raw: impl Into<String>) -> Result<Self, Error> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(Error::invalid_id("identifier is empty"));
        }
        if raw.len() > MAX_ID_LEN {
            return Err(Error::invalid_id(format!(
                "identifier longer than {MAX_ID_LEN} characters"
            )));
        }
        if raw.starts_with('.') {
            return Err(Error::invalid_id(format!("{raw:?} starts with '.'")));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(Error::invalid_id(format!(
                "{raw:?} contains disallowed character {c:?}"
            )));
        }

        Ok(Self(raw))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StreamId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StreamId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<StreamId> for String {
    fn from(id: StreamId) -> Self {
        id.0
    }
}
