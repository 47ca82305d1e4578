use std::sync::Arc;
use std::time::Duration;

use crate::clock::now_unix_seconds;
use crate::session::Session;

/// Minimum time between two GPS polls, per `original_source/gps/gps.py`'s
/// hardcoded poll interval (SPEC_FULL.md §11: this is a worker-loop
/// constant, not a config option).
const GPS_COOLDOWN: Duration = Duration::from_secs(1);

/// Capability interface for an opaque geolocation source, per spec.md §1's
/// "out of scope: ... the GPS/geolocation hardware or API integration
/// itself". Implementations may hit hardware, a vendor HTTP API keyed by
/// `gps_api_key`, or return a fixed position in tests.
pub trait GpsProvider: Send {
    /// A fresh `(latitude, longitude)` fix, or `None` if no fix is
    /// currently available (e.g. no satellite lock, a failed API call).
    /// `None` is not an error: the Session simply keeps its last-known fix
    /// until it goes stale past `patience` (spec.md §4.8).
    fn poll(&mut self) -> Option<(f64, f64)>;
}

/// Runs the session-level GPS worker (spec.md §4.8): polls `provider` on a
/// fixed cooldown and publishes every fix to `session`. Never fails loudly
/// — a `None` poll just leaves the previous fix in place to expire via
/// [`Session::geolocation`]'s patience check.
pub fn run_gps(mut provider: Box<dyn GpsProvider>, session: Arc<Session>, flag: thread_control::Flag) {
    while flag.alive() {
        if let Some((latitude, longitude)) = provider.poll() {
            session.publish_gps(latitude, longitude, now_unix_seconds());
        }
        std::thread::sleep(GPS_COOLDOWN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardcount_types::{ClassifierConfig, DetectorConfig, SessionConfig, TrackerConfig};

    fn cfg() -> SessionConfig {
        SessionConfig {
            bus_id: "081433".into(),
            route_id: "304A".into(),
            n_cameras: 1,
            streams: vec!["cam1.mp4".into()],
            width: 640,
            height: 640,
            line_height: 130,
            detector: DetectorConfig {
                detect_weights: "model.pt".into(),
                detect_conf: 0.45,
                detect_iou: 0.01,
                detect_half: true,
                min_detection_square: 0.0,
                max_bbox_sides_relation: f64::INFINITY,
            },
            classifier: ClassifierConfig {
                cls_weights: "cls.pt".into(),
                cls_threshold: 0.25,
                cls_half: true,
                cls_mode: "torch".into(),
                cls_shape: (128, 64),
            },
            tracker: TrackerConfig::default(),
            patience: 120,
            fourcc: "mp4v".into(),
            fps: 30,
            stop_hour: 2,
            logs_dir: "/tmp".into(),
            out_video_dir: "/tmp".into(),
            gps_api_key: None,
        }
    }

    struct FixedProvider {
        calls: u32,
    }
    impl GpsProvider for FixedProvider {
        fn poll(&mut self) -> Option<(f64, f64)> {
            self.calls += 1;
            if self.calls == 1 {
                None
            } else {
                Some((50.06, 19.94))
            }
        }
    }

    #[test]
    fn publishes_fixes_and_tolerates_missed_polls() {
        let (session, _channels) =
            Session::new(cfg(), chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap());
        let session = Arc::new(session);

        let (flag, control) = thread_control::make_pair();
        let provider = Box::new(FixedProvider { calls: 0 });
        let session_clone = session.clone();
        let handle = std::thread::spawn(move || {
            run_gps(provider, session_clone, flag);
        });

        std::thread::sleep(Duration::from_millis(1200));
        control.stop();
        handle.join().unwrap();

        let position = session.geolocation(now_unix_seconds()).unwrap();
        assert!((position.latitude - 50.06).abs() < 1e-9);
        assert!((position.longitude - 19.94).abs() < 1e-9);
    }
}
