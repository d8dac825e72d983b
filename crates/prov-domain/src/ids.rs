use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(ClusterId);
uuid_id!(DataCentreId);
uuid_id!(NodeId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrips_through_uuid_string() {
        let id = NodeId::new();
        let parsed: Uuid = id.to_string().parse().unwrap();
        assert_eq!(parsed, id.as_uuid());
    }

    #[test]
    fn distinct_ids_are_not_equal() {
        assert_ne!(ClusterId::new(), ClusterId::new());
    }
}
