//! The session tracker: tracking state machine and batched persistence.
//!
//! Turns a stream of raw location pushes into live presentation updates and a
//! durable, batched record of the path. One tracker owns one [`TrackState`]
//! and one write buffer; all mutation happens through `&mut self` on a
//! single-threaded event loop, so flushes are serialized by construction.
//!
//! State machine: Idle → Tracking → Idle via [`SessionTracker::start`] /
//! [`SessionTracker::stop`], with forced-stop edges for permission revocation
//! and source errors, and Idle → Idle via [`SessionTracker::reset`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::time::Instant;
use uuid::Uuid;

use crate::geo_utils;
use crate::presentation::{Metrics, Presentation, Severity};
use crate::source::{LocationSource, PermissionState, SourceError, WatchId, WatchOptions};
use crate::store::{
    PositionRecord, RemoteStore, SessionPatch, POSITIONS_COLLECTION, SESSIONS_COLLECTION,
};
use crate::{Bounds, GpsPoint, LocationSample, LocationUpdate, TrackError, TrackerConfig};

/// Live tracking state, owned by one [`SessionTracker`].
///
/// Stop preserves the recorded track for display and review; only reset
/// clears it. The start time is set iff tracking has ever been active since
/// the last reset.
#[derive(Debug, Clone)]
pub struct TrackState {
    /// Whether a watch is active right now.
    pub is_tracking: bool,
    /// Wall-clock start of the most recent activation.
    pub started_at: Option<DateTime<Utc>>,
    /// Accumulated pairwise Haversine distance in meters. Monotonically
    /// non-decreasing while active.
    pub total_distance: f64,
    /// Every recorded sample since the last reset, in arrival order.
    pub positions: Vec<LocationSample>,
    /// Running bounds of the recorded track, for fitting the view.
    pub bounds: Option<Bounds>,
    started_instant: Option<Instant>,
    activation_start: usize,
}

impl TrackState {
    fn new() -> Self {
        Self {
            is_tracking: false,
            started_at: None,
            total_distance: 0.0,
            positions: Vec::new(),
            bounds: None,
            started_instant: None,
            activation_start: 0,
        }
    }

    /// Time since the most recent activation started. Zero before the first
    /// start.
    pub fn elapsed(&self) -> Duration {
        self.started_instant.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }
}

/// Samples awaiting persistence, drained only on a successful flush.
#[derive(Debug)]
struct WriteBuffer {
    pending: Vec<PositionRecord>,
    last_flush: Instant,
}

impl WriteBuffer {
    fn new() -> Self {
        Self { pending: Vec::new(), last_flush: Instant::now() }
    }
}

/// Live GPS session tracker.
///
/// Ingests raw location pushes from a [`LocationSource`] driver, accumulates
/// the track and its metrics, and batches position records into a
/// [`RemoteStore`]. A flush fires when the buffer reaches
/// [`TrackerConfig::batch_size`] records OR the time since the last
/// successful flush exceeds [`TrackerConfig::batch_interval`] — either a
/// burst of samples or a lull eventually forces a write.
///
/// Persistence is best-effort, at-least-once: a failed flush keeps the buffer
/// for the next trigger and is never surfaced to the user beyond a logged
/// warning.
pub struct SessionTracker<S, R, P> {
    source: S,
    store: R,
    presentation: P,
    config: TrackerConfig,
    state: TrackState,
    buffer: WriteBuffer,
    watch: Option<WatchId>,
    session_id: Option<Uuid>,
    user_id: Option<String>,
}

impl<S, R, P> SessionTracker<S, R, P>
where
    S: LocationSource,
    R: RemoteStore,
    P: Presentation,
{
    pub fn new(source: S, store: R, presentation: P, config: TrackerConfig) -> Self {
        Self {
            source,
            store,
            presentation,
            config,
            state: TrackState::new(),
            buffer: WriteBuffer::new(),
            watch: None,
            session_id: None,
            user_id: None,
        }
    }

    /// Set the user correlation attached to subsequent buffered records.
    /// `None` while auth state is stale.
    pub fn set_user(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    pub fn state(&self) -> &TrackState {
        &self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    /// Records awaiting persistence.
    pub fn buffered_len(&self) -> usize {
        self.buffer.pending.len()
    }

    /// Identifier of the current activation's session, if one is open.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Begin a tracking activation.
    ///
    /// Fails with [`TrackError::CapabilityUnavailable`] when the source
    /// reports no location sensing. Subscribes for continuous pushes in
    /// high-accuracy mode, rejecting any cached fix. Calling start while
    /// already tracking is a logged no-op.
    pub fn start(&mut self) -> Result<(), TrackError> {
        if self.state.is_tracking {
            debug!("start ignored: already tracking");
            return Ok(());
        }
        if !self.source.is_available() {
            return Err(TrackError::CapabilityUnavailable);
        }

        self.state.is_tracking = true;
        self.state.started_at = Some(Utc::now());
        self.state.started_instant = Some(Instant::now());
        self.state.activation_start = self.state.positions.len();
        self.buffer.last_flush = Instant::now();

        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);

        let options = WatchOptions { high_accuracy: true, max_fix_age: Duration::ZERO };
        match self.source.subscribe(&options) {
            Ok(watch) => {
                self.watch = Some(watch);
                debug!("tracking started, session {session_id}");
                Ok(())
            }
            Err(err) => {
                self.state.is_tracking = false;
                self.session_id = None;
                Err(TrackError::Source(err))
            }
        }
    }

    /// Ingest one raw location push.
    ///
    /// Appends the fix to the live path, accumulates pairwise distance
    /// against the previous sample of the current activation, buffers the
    /// record for persistence, fires a flush when either batch trigger is
    /// met, and publishes updated metrics. Invalid fixes are logged and
    /// dropped; GPS jitter within valid ranges is not filtered.
    pub async fn handle_sample(&mut self, update: LocationUpdate) {
        if !self.state.is_tracking {
            debug!("sample ignored: not tracking");
            return;
        }

        let Some(sample) = LocationSample::from_update(&update) else {
            warn!(
                "dropping invalid fix: lat={} lng={}",
                update.latitude, update.longitude
            );
            return;
        };

        self.presentation.append_point(sample.point);
        extend_bounds(&mut self.state.bounds, sample.point);
        if let Some(bounds) = self.state.bounds {
            self.presentation.fit_view(&bounds);
        }

        if self.state.positions.len() > self.state.activation_start {
            let prev = &self.state.positions[self.state.positions.len() - 1];
            self.state.total_distance +=
                geo_utils::haversine_distance(&prev.point, &sample.point);
        }
        self.state.positions.push(sample);

        let record =
            PositionRecord::from_sample(&sample, self.session_id, self.user_id.clone());
        self.push_record(record);

        if self.buffer.pending.len() >= self.config.batch_size
            || self.buffer.last_flush.elapsed() > self.config.batch_interval
        {
            self.flush().await;
        }

        let metrics =
            Metrics::new(self.state.total_distance, self.state.elapsed().as_millis() as u64);
        self.presentation.update_metrics(&metrics);
    }

    /// Attempt one bulk append of the entire buffer.
    ///
    /// No-op when the buffer is empty: no store call, no state change. On
    /// success the buffer is cleared and the last-flush stamp updated; on
    /// failure the buffer is left intact and the records ride along to the
    /// next trigger.
    pub async fn flush(&mut self) {
        if self.buffer.pending.is_empty() {
            return;
        }

        match self
            .store
            .bulk_append(POSITIONS_COLLECTION, &self.buffer.pending)
            .await
        {
            Ok(()) => {
                debug!("flushed {} position record(s)", self.buffer.pending.len());
                self.buffer.pending.clear();
                self.buffer.last_flush = Instant::now();
            }
            Err(err) => {
                warn!(
                    "position flush failed, keeping {} buffered record(s): {err}",
                    self.buffer.pending.len()
                );
            }
        }
    }

    /// End the current activation.
    ///
    /// Unsubscribes synchronously before anything else, so no sample arrives
    /// once stop has begun. Drains the buffer with a final flush and marks
    /// the session closed with its final totals (best-effort). The recorded
    /// track is preserved for review.
    pub async fn stop(&mut self) {
        if let Some(watch) = self.watch.take() {
            self.source.unsubscribe(watch);
        }
        self.state.is_tracking = false;

        self.flush().await;

        if let Some(session_id) = self.session_id.take() {
            if let Some(started_at) = self.state.started_at {
                let patch = SessionPatch {
                    started_at,
                    ended_at: Utc::now(),
                    total_distance_m: self.state.total_distance,
                    sample_count: self.state.positions.len(),
                };
                if let Err(err) = self
                    .store
                    .update(SESSIONS_COLLECTION, &session_id.to_string(), &patch)
                    .await
                {
                    warn!("failed to close session {session_id}: {err}");
                }
            }
        }
    }

    /// Stop, then clear the recorded track and its metrics.
    pub async fn reset(&mut self) {
        self.stop().await;

        self.state.total_distance = 0.0;
        self.state.positions.clear();
        self.state.started_at = None;
        self.state.started_instant = None;
        self.state.bounds = None;
        self.state.activation_start = 0;

        self.presentation.set_path(&[]);
        self.presentation.update_metrics(&Metrics::default());
    }

    /// Platform notification that the permission state changed.
    ///
    /// A transition away from granted while tracking forces a stop and a
    /// user-visible notice.
    pub async fn handle_permission_change(&mut self, permission: PermissionState) {
        if permission == PermissionState::Granted || !self.state.is_tracking {
            return;
        }

        warn!("location permission revoked while tracking");
        self.stop().await;
        self.presentation
            .notice("Location permission revoked, tracking stopped", Severity::Error);
    }

    /// Platform-pushed location failure: fatal to the current activation.
    ///
    /// The activation is not retried; the user must start again explicitly.
    pub async fn handle_source_error(&mut self, error: SourceError) {
        warn!("location source error: {error}");
        self.stop().await;
        self.presentation
            .notice(&format!("Location error: {error}"), Severity::Error);
    }

    fn push_record(&mut self, record: PositionRecord) {
        self.buffer.pending.push(record);
        if let Some(cap) = self.config.max_buffered {
            let len = self.buffer.pending.len();
            if len > cap {
                let overflow = len - cap;
                self.buffer.pending.drain(..overflow);
                warn!("write buffer over cap, dropped {overflow} oldest record(s)");
            }
        }
    }
}

fn extend_bounds(bounds: &mut Option<Bounds>, point: GpsPoint) {
    match bounds {
        Some(b) => {
            b.min_lat = b.min_lat.min(point.latitude);
            b.max_lat = b.max_lat.max(point.latitude);
            b.min_lng = b.min_lng.min(point.longitude);
            b.max_lng = b.max_lng.max(point.longitude);
        }
        None => {
            *bounds = Some(Bounds {
                min_lat: point.latitude,
                max_lat: point.latitude,
                min_lng: point.longitude,
                max_lng: point.longitude,
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
