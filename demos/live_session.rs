//! Live tracking session walkthrough with a simulated walk.
//!
//! Run with: cargo run --example live_session

use chrono::Utc;
use session_tracker::presentation::{format_duration, format_pace};
use session_tracker::{
    Bounds, GpsPoint, LocationSource, LocationUpdate, MemoryStore, Metrics, PermissionState,
    Presentation, SessionTracker, Severity, SimulatedSource, TrackerConfig, POSITIONS_COLLECTION,
};

/// Prints what a map widget would render.
struct ConsolePresentation;

impl Presentation for ConsolePresentation {
    fn update_metrics(&mut self, metrics: &Metrics) {
        println!(
            "  {:>6.2} km | {} | {} /km",
            metrics.distance_meters / 1000.0,
            format_duration(metrics.elapsed_ms),
            format_pace(metrics.pace_ms_per_km()),
        );
    }

    fn notice(&mut self, message: &str, severity: Severity) {
        println!("  [{severity:?}] {message}");
    }

    fn append_point(&mut self, _point: GpsPoint) {}

    fn set_path(&mut self, points: &[GpsPoint]) {
        println!("  path reset to {} point(s)", points.len());
    }

    fn fit_view(&mut self, _bounds: &Bounds) {}
}

/// A walk along the Thames, one fix every ~11 meters.
fn riverside_walk(n: usize) -> Vec<LocationUpdate> {
    (0..n)
        .map(|i| {
            LocationUpdate::new(51.5007 + i as f64 * 0.0001, -0.1246, Utc::now())
                .with_accuracy(8.0)
        })
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    // The platform driver resolves the permission prompt before wiring up
    // the tracker
    let mut source = SimulatedSource::new();
    source.set_permission(PermissionState::Prompt);
    println!("Permission before prompt: {:?}", source.permission());
    source.set_permission(PermissionState::Granted);

    let mut tracker = SessionTracker::new(
        source,
        MemoryStore::new(),
        ConsolePresentation,
        TrackerConfig::default(),
    );
    tracker.set_user(Some("demo-user".to_string()));

    println!("Session Tracker Demo\n");

    // First session: a clean start-to-stop walk
    println!("Starting session...");
    tracker.start().expect("location sensing available");

    for update in riverside_walk(25) {
        tracker.handle_sample(update).await;
    }

    tracker.stop().await;
    println!(
        "\nStopped. {} position record(s) persisted, {} session(s) closed.",
        tracker.store().records(POSITIONS_COLLECTION).len(),
        tracker.store().update_log().len(),
    );

    // Second session: permission is revoked mid-walk
    println!("\nStarting second session...");
    tracker.start().expect("location sensing available");

    for update in riverside_walk(5) {
        tracker.handle_sample(update).await;
    }

    println!("Revoking location permission...");
    tracker.handle_permission_change(PermissionState::Denied).await;
    println!(
        "Tracking active: {} | total distance {:.0} m over {} recorded fix(es)",
        tracker.state().is_tracking,
        tracker.state().total_distance,
        tracker.state().positions.len(),
    );

    // Reset clears the live track for the next outing
    tracker.reset().await;
    println!(
        "\nAfter reset: {:.0} m, {} fix(es) in the live track.",
        tracker.state().total_distance,
        tracker.state().positions.len(),
    );
}
