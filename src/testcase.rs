//! Save a fetched challenge (and later its result) to disk, or load one back
//! in place of fetching from the challenge server, for replay without
//! re-submitting.

use crate::domain::Order;
use crate::error::TestCaseError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(rename = "testId")]
    pub test_id: String,
    pub orders: Vec<Order>,
    #[serde(rename = "rateMicros")]
    pub rate_micros: u64,
    #[serde(rename = "minPickupMicros")]
    pub min_pickup_micros: u64,
    #[serde(rename = "maxPickupMicros")]
    pub max_pickup_micros: u64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub result: Option<String>,
    /// Unix seconds at which the test case was first saved.
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// Unix seconds at which this test case was last replayed.
    #[serde(default)]
    pub rerun_timestamp: Option<u64>,
}

pub fn save(path: impl AsRef<Path>, test_case: &TestCase) -> Result<(), TestCaseError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(test_case).expect("TestCase is always serializable");
    std::fs::write(path, json).map_err(|source| TestCaseError::Write {
        path: path.display().to_string(),
        source,
    })
}

pub fn load(path: impl AsRef<Path>) -> Result<TestCase, TestCaseError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| TestCaseError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| TestCaseError::Malformed {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Temp;

    fn sample() -> TestCase {
        TestCase {
            test_id: "t1".into(),
            orders: vec![Order {
                id: "o1".into(),
                name: "Burger".into(),
                temp: Temp::Hot,
                price: 5.5,
                freshness: 120,
            }],
            rate_micros: 500_000,
            min_pickup_micros: 4_000_000,
            max_pickup_micros: 8_000_000,
            seed: Some(7),
            result: None,
            timestamp: Some(1_700_000_000),
            rerun_timestamp: None,
        }
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.json");
        save(&path, &sample()).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.test_id, "t1");
        assert_eq!(loaded.orders.len(), 1);
        assert_eq!(loaded.seed, Some(7));
    }

    #[test]
    fn unknown_fields_are_ignored_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.json");
        std::fs::write(
            &path,
            r#"{"testId":"t1","orders":[],"rateMicros":1,"minPickupMicros":1,"maxPickupMicros":2,"unexpectedField":"ignored"}"#,
        )
        .unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.test_id, "t1");
        assert!(loaded.seed.is_none());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load("/nonexistent/path/case.json").unwrap_err();
        assert!(matches!(err, TestCaseError::Read { .. }));
    }
}
