use std::sync::Arc;
use std::time::Duration;

use crossbeam_ok::CrossbeamOk;

use boardcount_types::{Detection, DoorState, EventName, LogEvent, LogRecord, SessionConfig};

use boardcount_tracker::{Emission, EventClassifier, EventClassifierParams, Sort, SortParams};

use crate::clock::now_unix_seconds;
use crate::session::Session;
use crate::stream::Stream;

const EMPTY_QUEUE_SLEEP: Duration = Duration::from_millis(10);

/// Tracker knobs derived once from a [`SessionConfig`]: the identity
/// tracker's [`SortParams`] and the event-classification state machine's
/// [`EventClassifierParams`] (spec.md §4.5).
#[derive(Debug, Clone, Copy)]
pub struct TrackerParams {
    pub sort: SortParams,
    pub event: EventClassifierParams,
}

impl TrackerParams {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            sort: SortParams {
                max_age: config.tracker.tracker_max_age,
                min_hits: config.tracker.tracker_min_hits,
                iou_threshold: config.tracker.tracker_iou,
            },
            event: EventClassifierParams {
                width: config.width as f64,
                height: config.height as f64,
                line_height: config.line_height as f64,
                num_frames_to_average: config.tracker.num_frames_to_average,
                min_frames_to_count: config.tracker.min_frames_to_count,
                max_tracked_objects: config.tracker.max_tracked_objects,
            },
        }
    }
}

/// Runs the Tracker worker (spec.md §4.5): pairs one [`Detection`] with
/// one [`DoorState`] per tick (spec.md §5's hard pairing invariant),
/// advances the identity tracker and event-classification state machine,
/// and turns every commit/cancel emission into a counter update plus a
/// log record.
#[allow(clippy::too_many_arguments)]
pub fn run_tracker(
    params: TrackerParams,
    stream: Arc<Stream>,
    session: Arc<Session>,
    detect_out_rx: channellib::Receiver<Detection>,
    cls_out_rx: channellib::Receiver<DoorState>,
    logs_tx: channellib::Sender<LogRecord>,
    session_id: String,
    route_id: String,
    bus_id: String,
    flag: thread_control::Flag,
) {
    let mut sort = Sort::new(params.sort);
    let mut classifier = EventClassifier::new(params.event);

    let mut pending_detection: Option<Detection> = None;
    let mut pending_door: Option<DoorState> = None;

    while flag.alive() {
        if pending_detection.is_none() {
            if let Ok(d) = detect_out_rx.try_recv() {
                pending_detection = Some(d);
            }
        }
        if pending_door.is_none() {
            if let Ok(d) = cls_out_rx.try_recv() {
                pending_door = Some(d);
            }
        }

        let (detection, door) = match (pending_detection.take(), pending_door.take()) {
            (Some(d), Some(s)) => (d, s),
            (d, s) => {
                pending_detection = d;
                pending_door = s;
                std::thread::sleep(EMPTY_QUEUE_SLEEP);
                continue;
            }
        };

        let tracks = sort.update(&detection.boxes);
        let events = classifier.process_tick(door, &tracks);

        for event in events {
            apply_emission(
                &stream,
                &session,
                &logs_tx,
                &session_id,
                &route_id,
                &bus_id,
                event.emission,
            );
        }
    }
}

fn apply_emission(
    stream: &Stream,
    session: &Session,
    logs_tx: &channellib::Sender<LogRecord>,
    session_id: &str,
    route_id: &str,
    bus_id: &str,
    emission: Emission,
) {
    let event = match emission {
        Emission::Commit(EventName::Enter) => {
            stream.commit_enter();
            LogEvent::Enter
        }
        Emission::Commit(EventName::Exit) => {
            stream.commit_exit();
            LogEvent::Exit
        }
        Emission::Cancel(EventName::Enter) => {
            stream.cancel_enter();
            LogEvent::CancelEnter
        }
        Emission::Cancel(EventName::Exit) => {
            stream.cancel_exit();
            LogEvent::CancelExit
        }
    };

    let geolocation = session.geolocation(now_unix_seconds());
    let record = LogRecord::new(
        chrono::Utc::now(),
        stream.camera,
        route_id,
        bus_id,
        session_id,
        event,
        None,
        geolocation,
    );
    push_commit_log(logs_tx, record, session_id, route_id, bus_id, stream.camera, geolocation);
}

/// Best-effort double logging, per `original_source/tracker/tracker.py`'s
/// `process_enter_event`/`process_exit_event`: push the primary
/// `enter`/`exit`/`cancel_*` record, and if that fails, attempt one
/// `tracker_put_error` record describing the failure, swallowing a
/// second failure silently (SPEC_FULL.md §11).
fn push_commit_log(
    logs_tx: &channellib::Sender<LogRecord>,
    record: LogRecord,
    session_id: &str,
    route_id: &str,
    bus_id: &str,
    camera: u32,
    geolocation: Option<boardcount_types::GeoPosition>,
) {
    if logs_tx.send(record).cb_ok().is_some() {
        return;
    }
    let error_record = LogRecord::new(
        chrono::Utc::now(),
        camera,
        route_id,
        bus_id,
        session_id,
        LogEvent::TrackerPutError,
        Some("logs queue unavailable".to_string()),
        geolocation,
    );
    let _ = logs_tx.send(error_record).cb_ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardcount_types::{BBox, ClassifierConfig, DetectorConfig, TrackerConfig};

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

    fn box_at(cy: f64) -> BBox {
        BBox::new(300.0, cy - 5.0, 320.0, cy + 5.0).unwrap()
    }

    /// A strong-enter trajectory, fed through the paired queues exactly
    /// like the Preprocessor/Detector/Classifier stages would, commits
    /// exactly one `count_in` and one log record (spec.md S1).
    #[test]
    fn paired_ticks_commit_a_strong_enter() {
        let (stream, channels) = Stream::new(1);
        let stream = Arc::new(stream);
        let (session, _session_channels) =
            Session::new(cfg(), chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap());
        let session = Arc::new(session);

        let (flag, control) = thread_control::make_pair();
        let params = TrackerParams::from_config(&cfg());
        let handle = {
            let stream = stream.clone();
            std::thread::spawn(move || {
                run_tracker(
                    params,
                    stream,
                    session,
                    channels.detect_out_rx,
                    channels.cls_out_rx,
                    channels.logs_tx,
                    "sess".into(),
                    "304A".into(),
                    "081433".into(),
                    flag,
                )
            })
        };

        for cy in [100.0; 5] {
            channels
                .detect_out_tx
                .send(Detection { boxes: vec![box_at(cy)] })
                .unwrap();
            channels.cls_out_tx.send(DoorState::Open).unwrap();
        }
        for cy in [200.0; 5] {
            channels
                .detect_out_tx
                .send(Detection { boxes: vec![box_at(cy)] })
                .unwrap();
            channels.cls_out_tx.send(DoorState::Open).unwrap();
        }

        let log = channels
            .logs_rx
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(log.event, "enter");

        // allow the worker to drain before stopping
        std::thread::sleep(Duration::from_millis(50));
        control.stop();
        handle.join().unwrap();

        assert_eq!(stream.count_in(), 1);
        assert_eq!(stream.count_out(), 0);
    }

    #[test]
    fn door_closed_never_commits() {
        let (stream, channels) = Stream::new(1);
        let stream = Arc::new(stream);
        let (session, _session_channels) =
            Session::new(cfg(), chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap());
        let session = Arc::new(session);

        let (flag, control) = thread_control::make_pair();
        let params = TrackerParams::from_config(&cfg());
        let handle = {
            let stream = stream.clone();
            std::thread::spawn(move || {
                run_tracker(
                    params,
                    stream,
                    session,
                    channels.detect_out_rx,
                    channels.cls_out_rx,
                    channels.logs_tx,
                    "sess".into(),
                    "304A".into(),
                    "081433".into(),
                    flag,
                )
            })
        };

        for cy in [100.0, 100.0, 100.0, 100.0, 100.0, 200.0, 200.0, 200.0, 200.0, 200.0] {
            channels
                .detect_out_tx
                .send(Detection { boxes: vec![box_at(cy)] })
                .unwrap();
            channels.cls_out_tx.send(DoorState::Closed).unwrap();
        }

        std::thread::sleep(Duration::from_millis(100));
        control.stop();
        handle.join().unwrap();

        assert_eq!(stream.count_in(), 0);
        assert_eq!(stream.count_out(), 0);
        assert!(channels.logs_rx.try_recv().is_err());
    }
}
