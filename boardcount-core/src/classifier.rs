use std::sync::Arc;
use std::time::Duration;

use crossbeam_ok::CrossbeamOk;

use boardcount_types::{ClassifierConfig, DoorState, LogEvent, LogRecord};

use crate::frame::Frame;
use crate::reader::push_log_record;
use crate::stream::Stream;

const EMPTY_QUEUE_SLEEP: Duration = Duration::from_millis(10);

/// Capability interface for the door classifier model adapter (spec.md
/// §4.4). Given the cls-frame, returns `P(closed)`; the open/closed
/// threshold itself lives in this worker, not the model.
pub trait Classifier: Send {
    fn classify(&mut self, frame: &Frame) -> Result<f64, String>;
}

pub fn run_classifier(
    mut classifier: Box<dyn Classifier>,
    config: ClassifierConfig,
    stream: Arc<Stream>,
    cls_in_rx: channellib::Receiver<Frame>,
    cls_out_tx: channellib::Sender<DoorState>,
    logs_tx: channellib::Sender<LogRecord>,
    session_id: String,
    route_id: String,
    bus_id: String,
    flag: thread_control::Flag,
) {
    while flag.alive() {
        let frame = match cls_in_rx.try_recv() {
            Ok(frame) => frame,
            Err(_) => {
                std::thread::sleep(EMPTY_QUEUE_SLEEP);
                continue;
            }
        };

        match classifier.classify(&frame) {
            Ok(p_closed) => {
                let door = DoorState::from_closed_probability(p_closed, config.cls_threshold);
                if cls_out_tx.send(door).cb_ok().is_none() {
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
                    LogEvent::ClassifierPutError,
                    Some(message),
                    None,
                );
                push_log_record(&logs_tx, record, &session_id, stream.camera);
            }
        }
    }
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
        LogEvent::ClassifierPutError,
        None,
        None,
    );
    push_log_record(logs_tx, record, session_id, camera);
}
