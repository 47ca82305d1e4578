use std::sync::Arc;
use std::time::Duration;

use crossbeam_ok::CrossbeamOk;

use boardcount_types::LogEvent;

use crate::reader::push_log_record;
use crate::stream::Stream;

const EMPTY_QUEUE_SLEEP: Duration = Duration::from_millis(10);

/// Derives the detector frame, classifier frame, and the writer's copy of
/// the detector frame from each raw frame (spec.md §4.2). Runs until `flag`
/// is cleared.
pub fn run_preprocessor(
    stream: Arc<Stream>,
    detect_width: u32,
    detect_height: u32,
    cls_width: u32,
    cls_height: u32,
    detect_in_tx: channellib::Sender<crate::frame::Frame>,
    cls_in_tx: channellib::Sender<crate::frame::Frame>,
    write_in_tx: channellib::Sender<crate::frame::Frame>,
    logs_tx: channellib::Sender<boardcount_types::LogRecord>,
    session_id: String,
    route_id: String,
    bus_id: String,
    flag: thread_control::Flag,
) {
    while flag.alive() {
        let raw = match stream.raw.take() {
            Some(frame) => frame,
            None => {
                std::thread::sleep(EMPTY_QUEUE_SLEEP);
                continue;
            }
        };

        let detect_frame = raw.resize(detect_width, detect_height);
        let cls_frame = raw.hconcat_thirds().resize(cls_width, cls_height);

        if detect_in_tx.send(detect_frame.clone()).cb_ok().is_none() {
            log_put_error(&logs_tx, &session_id, &route_id, &bus_id, stream.camera);
        }
        if write_in_tx.send(detect_frame).cb_ok().is_none() {
            log_put_error(&logs_tx, &session_id, &route_id, &bus_id, stream.camera);
        }
        if cls_in_tx.send(cls_frame).cb_ok().is_none() {
            log_put_error(&logs_tx, &session_id, &route_id, &bus_id, stream.camera);
        }
    }
}

fn log_put_error(
    logs_tx: &channellib::Sender<boardcount_types::LogRecord>,
    session_id: &str,
    route_id: &str,
    bus_id: &str,
    camera: u32,
) {
    let record = boardcount_types::LogRecord::new(
        chrono::Utc::now(),
        camera,
        route_id,
        bus_id,
        session_id,
        LogEvent::PreprocessorPutError,
        None,
        None,
    );
    push_log_record(logs_tx, record, session_id, camera);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    #[test]
    fn preprocessor_derives_three_downstream_frames() {
        let (stream, channels) = Stream::new(1);
        let stream = Arc::new(stream);
        stream.raw.push(Frame::zeros(90, 60));

        let (flag, control) = thread_control::make_pair();
        let handle = {
            let stream = stream.clone();
            std::thread::spawn(move || {
                run_preprocessor(
                    stream,
                    30,
                    30,
                    20,
                    20,
                    channels.detect_in_tx,
                    channels.cls_in_tx,
                    channels.write_in_tx,
                    channels.logs_tx,
                    "s".into(),
                    "r".into(),
                    "b".into(),
                    flag,
                )
            })
        };

        let detect_frame = channels.detect_in_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!((detect_frame.width, detect_frame.height), (30, 30));
        let write_frame = channels.write_in_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!((write_frame.width, write_frame.height), (30, 30));
        let cls_frame = channels.cls_in_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!((cls_frame.width, cls_frame.height), (20, 20));

        control.stop();
        handle.join().unwrap();
    }
}
