use std::sync::Arc;
use std::time::Duration;

use crossbeam_ok::CrossbeamOk;

use boardcount_types::{BBox, Detection, DetectorConfig, LogEvent, LogRecord};

use crate::frame::Frame;
use crate::reader::push_log_record;
use crate::stream::Stream;

const EMPTY_QUEUE_SLEEP: Duration = Duration::from_millis(10);

/// One candidate box as handed back by an opaque detector model, before the
/// geometric filters of spec.md §4.3 are applied. Coordinates may still be
/// degenerate; `run_detector` is responsible for rejecting those.
pub struct RawBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
}

/// Capability interface for the person-detector model adapter (spec.md
/// §4.3). Given a detect-shape frame, returns raw candidate boxes with
/// per-box confidence; thresholding on `detect_conf`/`detect_iou` is the
/// model's own business, the geometric filters below are this crate's.
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawBox>, String>;
}

/// Runs the Detector worker: pulls a frame from `detect_in_rx`, runs the
/// model, keeps only boxes that pass the geometric filters, and enqueues
/// the survivors into `detect_out_tx`.
pub fn run_detector(
    mut detector: Box<dyn Detector>,
    config: DetectorConfig,
    stream: Arc<Stream>,
    detect_in_rx: channellib::Receiver<Frame>,
    detect_out_tx: channellib::Sender<Detection>,
    logs_tx: channellib::Sender<LogRecord>,
    session_id: String,
    route_id: String,
    bus_id: String,
    flag: thread_control::Flag,
) {
    while flag.alive() {
        let frame = match detect_in_rx.try_recv() {
            Ok(frame) => frame,
            Err(_) => {
                std::thread::sleep(EMPTY_QUEUE_SLEEP);
                continue;
            }
        };

        match detector.detect(&frame) {
            Ok(raw_boxes) => {
                let boxes = raw_boxes
                    .into_iter()
                    .filter_map(|raw| filter_box(raw, &config))
                    .collect();
                let detection = Detection { boxes };
                if detect_out_tx.send(detection).cb_ok().is_none() {
                    emit_put_error(&logs_tx, &session_id, &route_id, &bus_id, stream.camera);
                }
            }
            Err(message) => {
                let record = LogRecord::new(
                    chrono::Utc::now(),
                    stream.camera,
                    route_id.clone(),
                    bus_id.clone(),
                    session_id.clone(),
                    LogEvent::DetectorPutError,
                    Some(message),
                    None,
                );
                push_log_record(&logs_tx, record, &session_id, stream.camera);
            }
        }
    }
}

fn filter_box(raw: RawBox, config: &DetectorConfig) -> Option<BBox> {
    let bbox = BBox::new(raw.x1, raw.y1, raw.x2, raw.y2)?;
    if bbox.area() <= config.min_detection_square {
        return None;
    }
    let w = bbox.width();
    let h = bbox.height();
    if w / h >= config.max_bbox_sides_relation || h / w >= config.max_bbox_sides_relation {
        return None;
    }
    Some(bbox)
}

fn emit_put_error(
    logs_tx: &channellib::Sender<LogRecord>,
    session_id: &str,
    route_id: &str,
    bus_id: &str,
    camera: u32,
) {
    let record = LogRecord::new(
        chrono::Utc::now(),
        camera,
        route_id,
        bus_id,
        session_id,
        LogEvent::DetectorPutError,
        None,
        None,
    );
    push_log_record(logs_tx, record, session_id, camera);
}
