//! # Session Tracker
//!
//! Live GPS session tracking with batched persistence.
//!
//! This library provides:
//! - A tracking state machine (start / stop / reset) over a stream of raw
//!   location pushes
//! - Pairwise Haversine distance accumulation and live pace/duration metrics
//! - A time/size-triggered write buffer that batches position records into a
//!   remote store
//!
//! ## Features
//!
//! - **`http`** - Enable the reqwest-backed remote store
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use session_tracker::{
//!     LocationUpdate, MemoryStore, NoopPresentation, SessionTracker,
//!     SimulatedSource, TrackerConfig,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut tracker = SessionTracker::new(
//!     SimulatedSource::new(),
//!     MemoryStore::new(),
//!     NoopPresentation,
//!     TrackerConfig::default(),
//! );
//!
//! tracker.start().unwrap();
//! tracker.handle_sample(LocationUpdate::new(51.5007, -0.1246, Utc::now())).await;
//! tracker.handle_sample(LocationUpdate::new(51.5008, -0.1247, Utc::now())).await;
//! tracker.stop().await;
//!
//! // Two fixes roughly 13 meters apart
//! assert!(tracker.state().total_distance > 12.0);
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

// Geographic computation utilities
pub mod geo_utils;

// Presentation seam: metrics, notices, path rendering
pub mod presentation;

// Location source seam and the simulated source
pub mod source;

// Remote store seam, wire records, in-memory store
pub mod store;

// The session tracker itself
pub mod tracker;

// HTTP-backed remote store
#[cfg(feature = "http")]
pub mod http;

pub use presentation::{Metrics, NoopPresentation, Presentation, Severity};
pub use source::{
    LocationSource, PermissionState, SimulatedSource, SourceError, WatchId, WatchOptions,
};
pub use store::{
    MemoryStore, PositionRecord, RemoteStore, SessionPatch, StoreError, POSITIONS_COLLECTION,
    SESSIONS_COLLECTION,
};
pub use tracker::{SessionTracker, TrackState};

#[cfg(feature = "http")]
pub use http::HttpStore;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use session_tracker::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box for a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points. Returns `None` for an empty track.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self { min_lat, max_lat, min_lng, max_lng })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// One raw push from a location source.
///
/// Carries whatever the platform reported, unvalidated. The tracker turns it
/// into a [`LocationSample`] and drops it if the coordinates are out of range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the platform reports one.
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationUpdate {
    /// Create an update without an accuracy estimate.
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self { latitude, longitude, accuracy: None, timestamp }
    }

    /// Attach the platform's horizontal accuracy estimate.
    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy = Some(meters);
        self
    }
}

/// A validated GPS fix. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSample {
    pub point: GpsPoint,
    /// Horizontal accuracy in meters, `>= 0`, when reported.
    pub accuracy: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl LocationSample {
    /// Validate a raw update into a sample.
    ///
    /// Returns `None` for out-of-range or non-finite coordinates. A negative
    /// or non-finite accuracy is discarded but does not reject the fix.
    pub fn from_update(update: &LocationUpdate) -> Option<Self> {
        let point = GpsPoint::new(update.latitude, update.longitude);
        if !point.is_valid() {
            return None;
        }

        let accuracy = update.accuracy.filter(|a| a.is_finite() && *a >= 0.0);

        Some(Self { point, accuracy, captured_at: update.timestamp })
    }
}

/// Configuration for the session tracker's batching policy.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Buffered records that force a flush.
    /// Default: 10
    pub batch_size: usize,

    /// Time since the last successful flush after which the next ingested
    /// sample forces a flush, regardless of buffer length.
    /// Default: 15 seconds
    pub batch_interval: Duration,

    /// Cap on buffered records under sustained write failure. When the cap is
    /// reached the oldest records are dropped first.
    /// Default: None (unbounded, retry by accumulation)
    pub max_buffered: Option<usize>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_interval: Duration::from_millis(15_000),
            max_buffered: None,
        }
    }
}

/// Errors surfaced by tracker operations.
///
/// Remote-write failures never appear here: the tracker recovers them locally
/// by keeping the buffer for the next trigger (see [`StoreError`] for the
/// store-side taxonomy).
#[derive(Debug, Error)]
pub enum TrackError {
    /// Location sensing is not available on this platform.
    #[error("location sensing is not available")]
    CapabilityUnavailable,

    /// The location source rejected the subscription.
    #[error(transparent)]
    Source(#[from] SourceError),
}

// ============================================================================
// Tests
// ============================================================================
