//! Identifier newtypes.
//!
//! All IDs are UUID-backed newtypes so they cannot be mixed up at call
//! sites. They serialize as plain UUID strings.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a flow instance.
    FlowId
}

uuid_id! {
    /// Unique identifier for a user.
    UserId
}

uuid_id! {
    /// Unique identifier for an identity.
    IdentityId
}

uuid_id! {
    /// Unique identifier for an authenticator.
    AuthenticatorId
}

uuid_id! {
    /// Unique identifier for a session.
    SessionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(FlowId::new(), FlowId::new());
        assert_ne!(UserId::new(), UserId::new());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn ids_serialize_as_uuid_strings() {
        let id = UserId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }
}
