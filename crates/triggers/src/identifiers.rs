//! Newtype domain identifiers.
//!
//! Every identifier the platform hands out is represented as a distinct newtype
//! wrapping a `String`. This prevents accidentally interchanging, for example,
//! a [`ConnectedAccountId`] with a [`TriggerInstanceId`] even though both are
//! opaque strings on the wire.
//!
//! All identifiers serialise transparently as their inner string, so they can
//! be used directly in request paths and response bodies.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Identifies the API client (account) that owns the session.
    ///
    /// Realtime registrations are keyed by this value: one active handler per
    /// client identifier.
    ClientId
}

string_id! {
    /// Identifies a caller's authorised linkage to a third-party application.
    ConnectedAccountId
}

string_id! {
    /// The platform name of a trigger definition (e.g. `"slack_receive_message"`).
    TriggerName
}

string_id! {
    /// Identifies a trigger configured against one connected account.
    ///
    /// The platform calls this `triggerId` on the status endpoint and
    /// `triggerInstanceId` on the delete endpoint; both name the same value.
    TriggerInstanceId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_identifier_is_rejected() {
        assert!(TriggerInstanceId::new("").is_none());
        assert!(ClientId::new(String::new()).is_none());
    }

    #[test]
    fn test_identifier_serialises_as_plain_string() {
        let id = TriggerInstanceId::new("ti_42").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ti_42\"");

        let parsed: ConnectedAccountId = serde_json::from_str("\"acc_1\"").unwrap();
        assert_eq!(parsed.as_str(), "acc_1");
        assert_eq!(parsed.to_string(), "acc_1");
    }
}
