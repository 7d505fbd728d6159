//! The id types used by the service.

use crate::define_id;

define_id!(
    /// Identifies a registered account.
    UserId,
    "usr"
);

define_id!(
    /// Identifies an event that accepts registrations.
    EventId,
    "evt"
);

define_id!(
    /// Correlates log lines belonging to one HTTP request.
    RequestId,
    "req"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdError;
    use proptest::prelude::*;

    #[test]
    fn test_user_id_roundtrip() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!(id.to_string().starts_with("usr_"));
    }

    #[test]
    fn test_event_id_rejects_user_prefix() {
        let user = UserId::new().to_string();
        let err = user.parse::<EventId>().unwrap_err();
        assert!(matches!(err, IdError::InvalidPrefix { expected: "evt", .. }));
    }

    #[test]
    fn test_missing_separator() {
        let err = "evt01HV4Z2WQXKJNM8GPQY6VBKC3D".parse::<EventId>().unwrap_err();
        assert_eq!(err, IdError::MissingSeparator);
    }

    #[test]
    fn test_empty() {
        assert_eq!("".parse::<EventId>().unwrap_err(), IdError::Empty);
    }

    #[test]
    fn test_invalid_ulid() {
        // a Mongo-style object id is not a ULID
        let err = "evt_65a1f0c2e4b0a1b2c3d4e5f6".parse::<EventId>().unwrap_err();
        assert!(matches!(err, IdError::InvalidUlid(_)));
    }

    #[test]
    fn test_json_is_a_plain_string() {
        let id = EventId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let parsed: EventId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_prefixes_unique() {
        let prefixes = [UserId::PREFIX, EventId::PREFIX, RequestId::PREFIX];
        let unique: std::collections::HashSet<_> = prefixes.iter().collect();
        assert_eq!(prefixes.len(), unique.len());
    }

    proptest! {
        #[test]
        fn prop_parse_display_roundtrip(raw in any::<u128>()) {
            let id = EventId::from(crate::Ulid::from(raw));
            prop_assert_eq!(id.to_string().parse::<EventId>().unwrap(), id);
        }
    }
}
