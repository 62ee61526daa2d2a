//! Remote store seam and wire records.
//!
//! The store is an append-only collection service: the tracker bulk-appends
//! position records and, when a session closes, patches the session row with
//! its final totals. [`MemoryStore`] is the in-process implementation used by
//! demos and tests; the reqwest-backed [`crate::HttpStore`] lives behind the
//! `http` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::LocationSample;

/// Collection receiving one record per persisted GPS fix.
pub const POSITIONS_COLLECTION: &str = "positions";

/// Collection holding one row per tracking session.
pub const SESSIONS_COLLECTION: &str = "sessions";

/// The wire form of a buffered GPS fix.
///
/// Correlation fields are explicit options: a record written while auth state
/// is stale simply carries no `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl PositionRecord {
    /// Annotate a validated sample with its owning-session correlation.
    pub fn from_sample(
        sample: &LocationSample,
        session_id: Option<Uuid>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            lat: sample.point.latitude,
            lng: sample.point.longitude,
            accuracy: sample.accuracy,
            timestamp: sample.captured_at,
            session_id,
            user_id,
        }
    }
}

/// Final totals written when a session is marked closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub total_distance_m: f64,
    pub sample_count: usize,
}

/// Errors returned by remote store operations.
///
/// The tracker never surfaces these to the user: a failed bulk append leaves
/// the write buffer intact for the next trigger, and a failed session close
/// is logged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned HTTP {0}")]
    Status(u16),

    /// The payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialize(String),
}

/// An append-only remote collection store.
#[async_trait]
pub trait RemoteStore {
    /// Append every record in one bulk write. All-or-nothing: on an error the
    /// caller assumes none of the records were stored.
    async fn bulk_append(
        &self,
        collection: &str,
        records: &[PositionRecord],
    ) -> Result<(), StoreError>;

    /// Patch the identified row with the given fields.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &SessionPatch,
    ) -> Result<(), StoreError>;
}

/// In-process store for demos, doctests, and unit tests.
///
/// Records every call behind a mutex and supports injected append failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    appended: Mutex<HashMap<String, Vec<PositionRecord>>>,
    updates: Mutex<Vec<(String, String, SessionPatch)>>,
    append_calls: AtomicUsize,
    fail_appends: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records appended to a collection so far, in append order.
    pub fn records(&self, collection: &str) -> Vec<PositionRecord> {
        self.appended
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Every update call as (collection, id, fields).
    pub fn update_log(&self) -> Vec<(String, String, SessionPatch)> {
        self.updates.lock().unwrap().clone()
    }

    /// Number of `bulk_append` calls that reached the store (including
    /// injected failures).
    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::Relaxed)
    }

    /// Make subsequent `bulk_append` calls fail until cleared.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn bulk_append(
        &self,
        collection: &str,
        records: &[PositionRecord],
    ) -> Result<(), StoreError> {
        self.append_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_appends.load(Ordering::Relaxed) {
            return Err(StoreError::Transport("injected append failure".into()));
        }
        self.appended
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &SessionPatch,
    ) -> Result<(), StoreError> {
        self.updates
            .lock()
            .unwrap()
            .push((collection.to_string(), id.to_string(), fields.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpsPoint;

    fn sample_record() -> PositionRecord {
        let sample = LocationSample {
            point: GpsPoint::new(51.5007, -0.1246),
            accuracy: Some(8.0),
            captured_at: Utc::now(),
        };
        PositionRecord::from_sample(&sample, Some(Uuid::new_v4()), Some("user-1".into()))
    }

    #[test]
    fn test_record_json_omits_absent_correlation() {
        let sample = LocationSample {
            point: GpsPoint::new(51.5007, -0.1246),
            accuracy: None,
            captured_at: Utc::now(),
        };
        let record = PositionRecord::from_sample(&sample, None, None);
        let json = serde_json::to_value(&record).unwrap();

        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("lat"));
        assert!(obj.contains_key("lng"));
        assert!(obj.contains_key("timestamp"));
        assert!(!obj.contains_key("accuracy"));
        assert!(!obj.contains_key("session_id"));
        assert!(!obj.contains_key("user_id"));
    }

    #[test]
    fn test_record_json_round_trip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: PositionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[tokio::test]
    async fn test_memory_store_appends_in_order() {
        let store = MemoryStore::new();
        let first = sample_record();
        let second = sample_record();

        store
            .bulk_append(POSITIONS_COLLECTION, &[first.clone()])
            .await
            .unwrap();
        store
            .bulk_append(POSITIONS_COLLECTION, &[second.clone()])
            .await
            .unwrap();

        assert_eq!(store.records(POSITIONS_COLLECTION), vec![first, second]);
        assert_eq!(store.append_calls(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_injected_failure_stores_nothing() {
        let store = MemoryStore::new();
        store.set_fail_appends(true);

        let result = store
            .bulk_append(POSITIONS_COLLECTION, &[sample_record()])
            .await;
        assert!(result.is_err());
        assert!(store.records(POSITIONS_COLLECTION).is_empty());

        store.set_fail_appends(false);
        store
            .bulk_append(POSITIONS_COLLECTION, &[sample_record()])
            .await
            .unwrap();
        assert_eq!(store.records(POSITIONS_COLLECTION).len(), 1);
    }
}
