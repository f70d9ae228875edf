//! Run artifacts: the append-only URL log and per-scenario screenshots
//!
//! Artifacts for a run are written exactly once, after the scenario body
//! completes, pass or fail. The log is opened in append mode and each entry
//! is a single write, so parallel runs against the same results directory
//! interleave whole lines.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::E2eResult;
use crate::scenarios::Scenario;

/// Outcome of one scenario, as recorded in artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Pass,
    Fail,
}

impl RunStatus {
    /// Lowercase form used in log lines.
    pub fn as_log_str(&self) -> &'static str {
        match self {
            RunStatus::Pass => "pass",
            RunStatus::Fail => "fail",
        }
    }

    /// Capitalized form used in screenshot file names.
    pub fn as_title_str(&self) -> &'static str {
        match self {
            RunStatus::Pass => "Pass",
            RunStatus::Fail => "Fail",
        }
    }
}

/// Writer for the results directory.
pub struct ArtifactWriter {
    results_dir: PathBuf,
}

impl ArtifactWriter {
    /// Create the writer, creating the results directory if absent.
    pub fn new(results_dir: impl Into<PathBuf>) -> E2eResult<Self> {
        let results_dir = results_dir.into();
        std::fs::create_dir_all(&results_dir)?;
        Ok(Self { results_dir })
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Append one line to today's URL log.
    pub fn append_url_log(&self, title: &str, status: RunStatus, url: &str) -> E2eResult<()> {
        let now = Utc::now();
        let path = self.results_dir.join(log_file_name(now.date_naive()));
        let line = format_log_line(now, title, status, url);

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Path for a scenario's screenshot, named by the fixed per-test mapping.
    pub fn screenshot_path(&self, scenario: Scenario, status: RunStatus) -> PathBuf {
        self.results_dir
            .join(screenshot_file_name(scenario, status, Utc::now().date_naive()))
    }
}

/// Daily log file name, e.g. `test-urls-2026-08-29.log`.
pub fn log_file_name(date: NaiveDate) -> String {
    format!("test-urls-{}.log", date.format("%Y-%m-%d"))
}

/// One log entry: `<ISO timestamp> | <title> | <pass|fail> | <final URL>`.
///
/// A run that never reached a page has no URL; the entry carries `-` so
/// every line keeps its four fields.
pub fn format_log_line(
    timestamp: DateTime<Utc>,
    title: &str,
    status: RunStatus,
    url: &str,
) -> String {
    let url = if url.is_empty() { "-" } else { url };
    format!(
        "{} | {} | {} | {}\n",
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        title,
        status.as_log_str(),
        url
    )
}

/// Screenshot file name, e.g. `Test 1 - Happy Path - Pass - 2026-08-29.png`.
pub fn screenshot_file_name(scenario: Scenario, status: RunStatus, date: NaiveDate) -> String {
    format!(
        "{} - {} - {} - {}.png",
        scenario.number_label(),
        scenario.short_name(),
        status.as_title_str(),
        date.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 29, 14, 30, 5).unwrap()
    }

    #[test]
    fn test_log_file_name_is_daily() {
        assert_eq!(
            log_file_name(fixed_time().date_naive()),
            "test-urls-2026-08-29.log"
        );
    }

    #[test]
    fn test_format_log_line() {
        let line = format_log_line(
            fixed_time(),
            "Happy Path – Trip Search",
            RunStatus::Pass,
            "https://transitapp.com/en/trip?origin=a&destination=b",
        );
        assert_eq!(
            line,
            "2026-08-29T14:30:05.000Z | Happy Path – Trip Search | pass | \
             https://transitapp.com/en/trip?origin=a&destination=b\n"
        );
    }

    #[test]
    fn test_format_log_line_without_url() {
        let line = format_log_line(
            fixed_time(),
            "Happy Path – Trip Search",
            RunStatus::Fail,
            "",
        );
        assert_eq!(line, "2026-08-29T14:30:05.000Z | Happy Path – Trip Search | fail | -\n");
        assert_eq!(line.trim_end().matches(" | ").count(), 3);
    }

    #[test]
    fn test_screenshot_file_name_mapping() {
        let date = fixed_time().date_naive();
        assert_eq!(
            screenshot_file_name(Scenario::HappyPath, RunStatus::Pass, date),
            "Test 1 - Happy Path - Pass - 2026-08-29.png"
        );
        assert_eq!(
            screenshot_file_name(Scenario::ArriveBy, RunStatus::Fail, date),
            "Test 2 - Arrive By - Fail - 2026-08-29.png"
        );
        assert_eq!(
            screenshot_file_name(Scenario::OutOfRange, RunStatus::Fail, date),
            "Test 3 - Too Far - Fail - 2026-08-29.png"
        );
    }

    #[test]
    fn test_append_url_log_appends_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();

        writer
            .append_url_log("Happy Path – Trip Search", RunStatus::Pass, "https://a")
            .unwrap();
        writer
            .append_url_log("Arrive By – Specific Date/Time", RunStatus::Fail, "https://b")
            .unwrap();

        let path = dir.path().join(log_file_name(Utc::now().date_naive()));
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("| pass | https://a"));
        assert!(lines[1].ends_with("| fail | https://b"));
    }

    #[test]
    fn test_parallel_appends_do_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_path_buf();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let base = base.clone();
                std::thread::spawn(move || {
                    let writer = ArtifactWriter::new(&base).unwrap();
                    for j in 0..10 {
                        writer
                            .append_url_log(
                                &format!("test-{i}-{j}"),
                                RunStatus::Pass,
                                "https://example",
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let path = base.join(log_file_name(Utc::now().date_naive()));
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 80);
        for line in contents.lines() {
            assert_eq!(line.matches(" | ").count(), 3, "mangled line: {line}");
        }
    }

    #[test]
    fn test_writer_creates_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("results");
        let writer = ArtifactWriter::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(writer.results_dir(), nested.as_path());
    }
}
