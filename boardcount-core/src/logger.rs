use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

use boardcount_types::LogRecord;

const EMPTY_QUEUE_SLEEP: Duration = Duration::from_millis(50);

/// Runs the session-level Logger worker (spec.md §4.7): round-robins every
/// Stream's `logs` queue and appends each record as a JSON object to
/// `{logs_dir}/log_{session_id}.json`, matching
/// `original_source/loggers/logger.py`'s append-only, comma-separated
/// stream format — the file is never rewritten, only grown.
///
/// Takes the `logs_rx` end of every Stream's channel directly: unlike the
/// per-stage workers, the Logger is the one consumer that spans every
/// camera, so the Supervisor hands it the receivers rather than a `Stream`
/// reference.
pub fn run_logger(
    logs_rxs: Vec<channellib::Receiver<LogRecord>>,
    logs_dir: PathBuf,
    session_id: String,
    flag: thread_control::Flag,
) {
    let path = logs_dir.join(format!("log_{session_id}.json"));
    let mut wrote_first_record = path_has_content(&path);

    while flag.alive() {
        let mut drained_any = false;
        for rx in &logs_rxs {
            while let Ok(record) = rx.try_recv() {
                drained_any = true;
                match append_record(&path, &record, wrote_first_record) {
                    Ok(()) => wrote_first_record = true,
                    Err(err) => {
                        warn!("failed to append log record to {path:?}: {err}");
                    }
                }
            }
        }
        if !drained_any {
            std::thread::sleep(EMPTY_QUEUE_SLEEP);
        }
    }
}

fn path_has_content(path: &std::path::Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

fn append_record(
    path: &std::path::Path,
    record: &boardcount_types::LogRecord,
    wrote_first_record: bool,
) -> crate::Result<()> {
    let json = record
        .to_json_string()
        .map_err(|e| crate::Error::Other(e.to_string()))?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    if wrote_first_record {
        file.write_all(b",\n")?;
    }
    file.write_all(json.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Stream;
    use boardcount_types::LogEvent;

    #[test]
    fn appends_comma_separated_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let (_stream, channels) = Stream::new(1);

        let (flag, control) = thread_control::make_pair();
        let logs_rxs = vec![channels.logs_rx];
        let logs_dir = dir.path().to_path_buf();
        let handle = std::thread::spawn(move || {
            run_logger(logs_rxs, logs_dir, "sess".into(), flag);
        });

        channels
            .logs_tx
            .send(LogRecord::new(
                chrono::Utc::now(),
                1,
                "304A",
                "081433",
                "sess",
                LogEvent::Enter,
                None,
                None,
            ))
            .unwrap();
        channels
            .logs_tx
            .send(LogRecord::new(
                chrono::Utc::now(),
                1,
                "304A",
                "081433",
                "sess",
                LogEvent::Exit,
                None,
                None,
            ))
            .unwrap();

        std::thread::sleep(Duration::from_millis(200));
        control.stop();
        handle.join().unwrap();

        let path = dir.path().join("log_sess.json");
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.matches(",\n").count(), 1);
        assert!(contents.contains("\"enter\""));
        assert!(contents.contains("\"exit\""));
    }
}
