//! Per-test execution logger

use chrono::{DateTime, Local};
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Logger handed to a single test; records when the test started.
///
/// The "Test finished at" line is written when the logger is dropped, so it
/// also appears for cases that fail early or time out.
#[derive(Debug)]
pub struct TestLogger {
    test_name: String,
    started_at: DateTime<Local>,
}

impl TestLogger {
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            started_at: Local::now(),
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Log a message with the current timestamp
    pub fn log(&self, message: impl AsRef<str>) {
        info!(
            test = %self.test_name,
            "[{}] {}",
            format_timestamp(&Local::now()),
            message.as_ref()
        );
    }

    pub fn log_encrypted_key(&self, encrypted_key: &str) {
        info!(test = %self.test_name, "Encrypted Secret Key: {}", encrypted_key);
    }

    /// Close the session; the end line is written on drop
    pub fn end(self) {}
}

impl Drop for TestLogger {
    fn drop(&mut self) {
        let finished = Local::now();
        let elapsed_ms = (finished - self.started_at).num_milliseconds();
        info!(
            test = %self.test_name,
            elapsed_ms,
            "Test finished at: {}",
            format_timestamp(&finished)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_timestamp_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(format_timestamp(&at), "2024-03-07 09:05:02");
    }

    #[test]
    fn test_fresh_logger_per_test() {
        let first = TestLogger::new("first");
        let second = TestLogger::new("second");
        assert_eq!(first.test_name(), "first");
        assert_eq!(second.test_name(), "second");
        assert!(second.started_at() >= first.started_at());
        first.log("checkpoint");
        first.end();
        second.end();
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_end_line_written_once() {
        let logs = capture_logs(|| TestLogger::new("ends").end());
        assert_eq!(logs.matches("Test finished at:").count(), 1);
    }

    #[test]
    fn test_end_line_written_when_case_stops_early() {
        fn failing_case(logger: TestLogger) -> Result<(), String> {
            logger.log("before the failure");
            Err("assertion failed".to_string())
        }

        let logs = capture_logs(|| {
            let _ = failing_case(TestLogger::new("stops early"));
        });
        assert!(logs.contains("before the failure"));
        assert!(logs.contains("Test finished at:"));
        assert!(logs.contains("stops early"));
    }
}
