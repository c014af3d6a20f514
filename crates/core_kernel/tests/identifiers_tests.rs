//! Tests for source keys and run identifiers

use core_kernel::{ClaimId, PayerId, TransactionId, RunId};
use std::collections::BTreeSet;
use uuid::Uuid;

mod source_key_tests {
    use super::*;

    #[test]
    fn test_display_is_the_raw_key() {
        let id = ClaimId::new("a1b2-c3").unwrap();
        assert_eq!(id.to_string(), "a1b2-c3");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id: TransactionId = " TX-9 ".parse().unwrap();
        assert_eq!(id.as_str(), "TX-9");
    }

    #[test]
    fn test_keys_order_lexicographically() {
        let keys: BTreeSet<ClaimId> = ["c", "a", "b"]
            .iter()
            .map(|k| ClaimId::new(k).unwrap())
            .collect();
        let ordered: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(ordered, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_serde_round_trip_is_a_plain_string() {
        let id = PayerId::new("PAYER-7").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"PAYER-7\"");
        let back: PayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_serde_rejects_blank_key() {
        let result: Result<ClaimId, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());
    }
}

mod run_id_tests {
    use super::*;

    #[test]
    fn test_new_v7_is_time_ordered() {
        let first = RunId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = RunId::new_v7();
        assert!(first < second);
    }

    #[test]
    fn test_display_has_prefix() {
        let uuid = Uuid::new_v4();
        let id = RunId::from_uuid(uuid);
        assert_eq!(id.to_string(), format!("RUN-{}", uuid));
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_parse_with_and_without_prefix() {
        let uuid = Uuid::new_v4();
        let with: RunId = format!("RUN-{}", uuid).parse().unwrap();
        let without: RunId = uuid.to_string().parse().unwrap();
        assert_eq!(with, without);
    }
}
