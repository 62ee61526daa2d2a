//! Presentation seam: live metrics, notices, and path rendering.
//!
//! The rendering widget itself is a black box. The tracker pushes three kinds
//! of output through [`Presentation`]: metric updates after every sample,
//! discrete notices for errors and permission loss, and path primitives
//! (append a point, replace the whole path, fit the view to bounds).

use crate::{Bounds, GpsPoint};

/// Live session metrics published to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub distance_meters: f64,
    pub elapsed_ms: u64,
}

impl Metrics {
    pub fn new(distance_meters: f64, elapsed_ms: u64) -> Self {
        Self { distance_meters, elapsed_ms }
    }

    /// Pace in milliseconds per kilometer. Undefined until any distance has
    /// been covered.
    pub fn pace_ms_per_km(&self) -> Option<f64> {
        if self.distance_meters <= 0.0 {
            return None;
        }
        Some(self.elapsed_ms as f64 / (self.distance_meters / 1000.0))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self { distance_meters: 0.0, elapsed_ms: 0 }
    }
}

/// Severity of a discrete notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Receiver of tracker output.
pub trait Presentation {
    /// Updated distance and elapsed duration, published on every sample and
    /// zeroed on reset.
    fn update_metrics(&mut self, metrics: &Metrics);

    /// A discrete user-visible notice.
    fn notice(&mut self, message: &str, severity: Severity);

    /// Extend the rendered path by one point.
    fn append_point(&mut self, point: GpsPoint);

    /// Replace the rendered path wholesale (empty on reset).
    fn set_path(&mut self, points: &[GpsPoint]);

    /// Fit the view to the given bounds.
    fn fit_view(&mut self, bounds: &Bounds);
}

/// A presentation layer that discards everything. Useful for headless
/// drivers and doctests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPresentation;

impl Presentation for NoopPresentation {
    fn update_metrics(&mut self, _metrics: &Metrics) {}
    fn notice(&mut self, _message: &str, _severity: Severity) {}
    fn append_point(&mut self, _point: GpsPoint) {}
    fn set_path(&mut self, _points: &[GpsPoint]) {}
    fn fit_view(&mut self, _bounds: &Bounds) {}
}

// ============================================================================
// Formatting Helpers
// ============================================================================

/// Format an elapsed duration as `HH:MM:SS`.
pub fn format_duration(elapsed_ms: u64) -> String {
    let total_seconds = elapsed_ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Format a pace as `MM:SS` per kilometer, or `--:--` when undefined.
pub fn format_pace(ms_per_km: Option<f64>) -> String {
    let Some(ms_per_km) = ms_per_km else {
        return "--:--".to_string();
    };
    if !ms_per_km.is_finite() || ms_per_km <= 0.0 {
        return "--:--".to_string();
    }

    let total_seconds = (ms_per_km / 1000.0) as u64;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(999), "00:00:00");
        assert_eq!(format_duration(61_000), "00:01:01");
        assert_eq!(format_duration(3_723_000), "01:02:03");
    }

    #[test]
    fn test_pace_for_steady_run() {
        // 2 km in 10 minutes is a 5:00/km pace
        let metrics = Metrics::new(2000.0, 600_000);
        let pace = metrics.pace_ms_per_km().unwrap();
        assert!((pace - 300_000.0).abs() < 1e-6);
        assert_eq!(format_pace(Some(pace)), "05:00");
    }

    #[test]
    fn test_pace_undefined_at_zero_distance() {
        let metrics = Metrics::new(0.0, 600_000);
        assert_eq!(metrics.pace_ms_per_km(), None);
        assert_eq!(format_pace(None), "--:--");
    }

    #[test]
    fn test_format_pace_rejects_degenerate_values() {
        assert_eq!(format_pace(Some(f64::INFINITY)), "--:--");
        assert_eq!(format_pace(Some(-1.0)), "--:--");
    }
}
