use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier type.
///
/// Each entity gets its own wrapper so that, for example, a `BookId`
/// can never be passed where a `GenreId` is expected.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id! {
    /// Unique identifier for a book in the catalog.
    BookId
}

entity_id! {
    /// Unique identifier for a genre.
    GenreId
}

entity_id! {
    /// Unique identifier for a podcast episode.
    PodcastId
}

entity_id! {
    /// Unique identifier for a registered user.
    UserId
}

entity_id! {
    /// Unique identifier for a contact-form submission.
    ContactId
}

entity_id! {
    /// Unique identifier for an order.
    OrderId
}

entity_id! {
    /// Unique identifier for a single order line item.
    OrderItemId
}

entity_id! {
    /// Unique identifier for a shipping address.
    AddressId
}

entity_id! {
    /// Unique identifier for a newsletter subscription.
    NewsletterId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_unique_ids() {
        let id1 = BookId::new();
        let id2 = BookId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = OrderId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn parses_from_string() {
        let id = GenreId::new();
        let parsed: GenreId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_malformed_string() {
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }

    #[test]
    fn serialization_roundtrip() {
        let id = ContactId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: ContactId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
