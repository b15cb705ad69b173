//! Shared test-only helpers (§10.4), parallel to the teacher's
//! `test_utils.rs`/`ledger/test_support.rs`: small assertions reused across
//! several modules' `#[cfg(test)]` blocks rather than copy-pasted into each.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializes `value`, deserializes it back, and asserts the round trip is
/// lossless. Used by snapshot/restore and wire-payload tests.
pub fn assert_round_trip_json<T>(value: &T)
where
    T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let json = serde_json::to_value(value).expect("serialize");
    let restored: T = serde_json::from_value(json).expect("deserialize");
    assert_eq!(value, &restored, "value did not round-trip through JSON");
}
