//! Domain identifier types with proper encapsulation.
//!
//! Every entity is keyed by an opaque string. New identifiers are generated
//! as UUID v4; existing ones are rebuilt from their stored string.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Wrap an existing identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

entity_id!(
    /// Organization identifier.
    OrganizationId
);
entity_id!(
    /// User identifier.
    UserId
);
entity_id!(
    /// Group identifier.
    GroupId
);
entity_id!(
    /// Category identifier.
    CategoryId
);
entity_id!(
    /// Forecast identifier.
    ForecastId
);
entity_id!(
    /// Prediction identifier.
    PredictionId
);
entity_id!(
    /// AI conversation identifier.
    ConversationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ForecastId::generate(), ForecastId::generate());
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let id = GroupId::from("grp-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"grp-1\"");
        let parsed: GroupId = serde_json::from_str("\"grp-1\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn display_matches_as_str() {
        let id = UserId::new("user-42");
        assert_eq!(id.to_string(), id.as_str());
    }
}
