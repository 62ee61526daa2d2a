//! Location source seam.
//!
//! Mirrors the platform geolocation surface: a capability check, a permission
//! query, and a continuous watch subscription. Samples and errors themselves
//! are push-delivered by the platform driver straight to the tracker
//! ([`crate::SessionTracker::handle_sample`] and friends); this trait covers
//! the registration side of that contract.

use std::time::Duration;

use thiserror::Error;

/// Platform permission state for location sensing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// The user has not decided yet.
    Prompt,
}

/// Options for a continuous location watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Request the platform's high-accuracy mode.
    pub high_accuracy: bool,
    /// Maximum acceptable age of a cached fix. Zero rejects any cached fix.
    pub max_fix_age: Duration,
}

/// Handle for an active watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchId(pub u64);

/// Errors pushed by or returned from a location source.
///
/// These are fatal to the current activation: the tracker stops and surfaces
/// a notice, and the user must start again explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The platform could not produce a fix in time.
    #[error("location request timed out")]
    Timeout,

    /// Signal loss or no position available.
    #[error("position unavailable: {0}")]
    Unavailable(String),

    /// Any other platform-reported failure.
    #[error("platform error: {0}")]
    Platform(String),
}

/// A push-based location source.
///
/// `unsubscribe` must take effect synchronously: after it returns, no further
/// push may be delivered for that watch.
pub trait LocationSource {
    /// Whether location sensing exists on this platform at all.
    fn is_available(&self) -> bool;

    /// Current permission state. May change while a watch is active; the
    /// platform driver forwards such changes to the tracker.
    fn permission(&self) -> PermissionState;

    /// Register for continuous location pushes.
    fn subscribe(&mut self, options: &WatchOptions) -> Result<WatchId, SourceError>;

    /// Cancel an active watch.
    fn unsubscribe(&mut self, watch: WatchId);
}

/// A scriptable location source for demos and tests.
///
/// Pushes are delivered by the test/demo driver calling the tracker directly;
/// this type only plays the registration role, remembering what was asked of
/// it so assertions can inspect it.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    available: bool,
    permission: PermissionState,
    active_watch: Option<WatchId>,
    last_options: Option<WatchOptions>,
    next_watch: u64,
}

impl SimulatedSource {
    /// An available source with permission granted.
    pub fn new() -> Self {
        Self {
            available: true,
            permission: PermissionState::Granted,
            active_watch: None,
            last_options: None,
            next_watch: 1,
        }
    }

    /// A platform without location sensing.
    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new() }
    }

    pub fn set_permission(&mut self, permission: PermissionState) {
        self.permission = permission;
    }

    /// Whether a watch is currently registered.
    pub fn is_watching(&self) -> bool {
        self.active_watch.is_some()
    }

    /// The options of the most recent subscription.
    pub fn last_options(&self) -> Option<WatchOptions> {
        self.last_options
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationSource for SimulatedSource {
    fn is_available(&self) -> bool {
        self.available
    }

    fn permission(&self) -> PermissionState {
        self.permission
    }

    fn subscribe(&mut self, options: &WatchOptions) -> Result<WatchId, SourceError> {
        if !self.available {
            return Err(SourceError::Unavailable("no location sensing".into()));
        }
        let watch = WatchId(self.next_watch);
        self.next_watch += 1;
        self.active_watch = Some(watch);
        self.last_options = Some(*options);
        Ok(watch)
    }

    fn unsubscribe(&mut self, watch: WatchId) {
        if self.active_watch == Some(watch) {
            self.active_watch = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_unsubscribe_lifecycle() {
        let mut source = SimulatedSource::new();
        assert!(!source.is_watching());

        let options = WatchOptions { high_accuracy: true, max_fix_age: Duration::ZERO };
        let watch = source.subscribe(&options).unwrap();
        assert!(source.is_watching());
        assert_eq!(source.last_options(), Some(options));

        source.unsubscribe(watch);
        assert!(!source.is_watching());
    }

    #[test]
    fn test_unsubscribe_ignores_stale_handle() {
        let mut source = SimulatedSource::new();
        let options = WatchOptions { high_accuracy: true, max_fix_age: Duration::ZERO };
        let first = source.subscribe(&options).unwrap();
        source.unsubscribe(first);

        let second = source.subscribe(&options).unwrap();
        source.unsubscribe(first);
        assert!(source.is_watching());
        source.unsubscribe(second);
        assert!(!source.is_watching());
    }

    #[test]
    fn test_permission_state_is_scriptable() {
        let mut source = SimulatedSource::new();
        assert_eq!(source.permission(), PermissionState::Granted);
        source.set_permission(PermissionState::Denied);
        assert_eq!(source.permission(), PermissionState::Denied);
    }

    #[test]
    fn test_unavailable_source_rejects_subscription() {
        let mut source = SimulatedSource::unavailable();
        assert!(!source.is_available());
        let options = WatchOptions { high_accuracy: true, max_fix_age: Duration::ZERO };
        assert!(source.subscribe(&options).is_err());
    }
}
