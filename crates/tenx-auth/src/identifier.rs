//! Login identifiers.

use std::fmt;

use tenx_core::text::mask_identifier;

use crate::errors::{AuthError, Result};

/// An email address or phone number used to log in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identifier {
    /// Anything containing `@`.
    Email(String),
    /// Everything else.
    Phone(String),
}

impl Identifier {
    /// Classify a raw identifier. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::MissingIdentifier);
        }
        Ok(if raw.contains('@') {
            Self::Email(raw.to_owned())
        } else {
            Self::Phone(raw.to_owned())
        })
    }

    /// The identifier as supplied.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(s) | Self::Phone(s) => s,
        }
    }

    /// Whether this is an email address.
    pub fn is_email(&self) -> bool {
        matches!(self, Self::Email(_))
    }

    /// Delivery channel name.
    pub fn channel(&self) -> &'static str {
        if self.is_email() { "email" } else { "sms" }
    }

    /// Log-safe form: first three characters then `***`.
    pub fn masked(&self) -> String {
        mask_identifier(self.as_str())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}
