//! Branded ID newtypes for type safety.
//!
//! Each entity gets a distinct ID type wrapping a `String`, so a chat ID can
//! never be passed where a user ID is expected. Fresh IDs are UUID v7
//! (time-ordered); IDs received from the wire are accepted verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

fn new_v7() -> String {
    Uuid::now_v7().simple().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identifier of a chat session. Doubles as the remote `chatId`.
    ChatId
}

branded_id! {
    /// Identifier of a single chat message.
    MessageId
}

branded_id! {
    /// Identifier of an authenticated principal (the `user-id` header).
    UserId
}

branded_id! {
    /// Identifier of a mask template.
    MaskId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        let a = ChatId::new();
        let b = ChatId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn new_ids_are_simple_hex() {
        let id = MessageId::new();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn wire_ids_are_kept_verbatim() {
        let id = ChatId::from("V1StGXR8_Z5jdHi6B-myT");
        assert_eq!(id.as_str(), "V1StGXR8_Z5jdHi6B-myT");
    }

    #[test]
    fn serde_is_transparent() {
        let id = UserId::from("user-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user-42\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_and_deref() {
        let id = MaskId::from("mask-1");
        assert_eq!(id.to_string(), "mask-1");
        assert!(id.starts_with("mask"));
    }
}
