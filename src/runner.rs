//! Suite runner: preflight, per-scenario execution, artifact recording

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::artifacts::{ArtifactWriter, RunStatus};
use crate::browser::BrowserSession;
use crate::config::CheckConfig;
use crate::error::{E2eError, E2eResult};
use crate::scenarios::{run_scenario, Scenario};

/// Result of one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub number: String,
    pub passed: bool,
    pub duration_ms: u64,
    pub final_url: String,
    pub error: Option<String>,
}

/// Result of the whole suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

/// Drives the scenarios in sequence, one fresh browser each, and records
/// artifacts for every run regardless of outcome.
pub struct CheckRunner {
    cfg: CheckConfig,
}

impl CheckRunner {
    pub fn new(cfg: CheckConfig) -> Self {
        Self { cfg }
    }

    /// Probe the target URL before paying for a browser launch. Any HTTP
    /// response counts as reachable; only transport failures are fatal.
    pub async fn preflight(&self) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(self.cfg.user_agent.clone())
            .build()?;

        for attempt in 1..=self.cfg.preflight_attempts {
            match client.get(&self.cfg.target_url).send().await {
                Ok(resp) => {
                    info!("Target reachable ({})", resp.status());
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Preflight attempt {attempt}/{} failed: {e}",
                        self.cfg.preflight_attempts
                    );
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
        }

        Err(E2eError::TargetUnreachable {
            url: self.cfg.target_url.clone(),
            attempts: self.cfg.preflight_attempts,
        })
    }

    /// Run the given scenarios strictly in sequence.
    pub async fn run(&self, scenarios: &[Scenario]) -> E2eResult<SuiteResult> {
        let suite_start = Instant::now();

        self.preflight().await?;

        let writer = ArtifactWriter::new(&self.cfg.results_dir)?;

        let mut results = Vec::with_capacity(scenarios.len());
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s)...", scenarios.len());

        for &scenario in scenarios {
            let result = self.run_one(scenario, &writer).await;

            if result.passed {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = suite_start.elapsed().as_millis() as u64;
        info!("");
        info!(
            "Suite results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        Ok(SuiteResult {
            total: scenarios.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run one scenario in a freshly launched browser and record its
    /// artifacts. The artifacts are written after the body completes, pass
    /// or fail, and never fail the run themselves.
    ///
    /// The site persists saved search settings across pages of one browser
    /// profile, so isolation between scenarios needs a fresh launch per
    /// run, not just a fresh tab.
    async fn run_one(&self, scenario: Scenario, writer: &ArtifactWriter) -> ScenarioResult {
        let start = Instant::now();

        let (error, final_url) = match BrowserSession::launch(&self.cfg).await {
            Ok(session) => {
                let outcome = self.drive_scenario(scenario, &session, writer).await;
                session.shutdown().await;
                outcome
            }
            Err(e) => {
                // No browser to screenshot, but the run still gets its log line.
                if let Err(log_err) =
                    writer.append_url_log(scenario.title(), RunStatus::Fail, "")
                {
                    warn!("Failed to append URL log: {log_err}");
                }
                (Some(format!("failed to launch browser: {e}")), String::new())
            }
        };

        ScenarioResult {
            name: scenario.title().to_string(),
            number: scenario.number_label().to_string(),
            passed: error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            final_url,
            error,
        }
    }

    /// Open the scenario's page, drive it under the overall timeout, and
    /// record the run artifacts.
    async fn drive_scenario(
        &self,
        scenario: Scenario,
        session: &BrowserSession,
        writer: &ArtifactWriter,
    ) -> (Option<String>, String) {
        match session.new_page(&self.cfg).await {
            Ok(page) => {
                let outcome = tokio::time::timeout(
                    self.cfg.scenario_timeout,
                    run_scenario(scenario, &page, &self.cfg),
                )
                .await;

                let error = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(_) => Some(format!(
                        "scenario exceeded overall timeout of {:?}",
                        self.cfg.scenario_timeout
                    )),
                };

                let final_url = page.current_url().await.unwrap_or_default();
                info!("Final URL: {final_url}");

                let status = if error.is_none() {
                    RunStatus::Pass
                } else {
                    RunStatus::Fail
                };
                self.record_artifacts(scenario, status, &final_url, &page, writer)
                    .await;

                if let Err(e) = page.close().await {
                    warn!("Failed to close page: {e}");
                }

                (error, final_url)
            }
            Err(e) => {
                // No page to screenshot, but the run still gets its log line.
                if let Err(log_err) =
                    writer.append_url_log(scenario.title(), RunStatus::Fail, "")
                {
                    warn!("Failed to append URL log: {log_err}");
                }
                (Some(format!("failed to open page: {e}")), String::new())
            }
        }
    }

    async fn record_artifacts(
        &self,
        scenario: Scenario,
        status: RunStatus,
        final_url: &str,
        page: &crate::browser::PageHandle,
        writer: &ArtifactWriter,
    ) {
        if let Err(e) = writer.append_url_log(scenario.title(), status, final_url) {
            warn!("Failed to append URL log: {e}");
        }

        let path = writer.screenshot_path(scenario, status);
        match page.save_full_screenshot(&path).await {
            Ok(()) => info!("Screenshot saved: {}", path.display()),
            Err(e) => warn!("Failed to take screenshot: {e}"),
        }
    }

    /// Write the machine-readable suite summary.
    pub fn write_summary(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.cfg.results_dir)?;

        let path = self.cfg.results_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Summary written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_suite() -> SuiteResult {
        SuiteResult {
            total: 3,
            passed: 2,
            failed: 1,
            duration_ms: 90_000,
            results: vec![ScenarioResult {
                name: Scenario::OutOfRange.title().to_string(),
                number: Scenario::OutOfRange.number_label().to_string(),
                passed: false,
                duration_ms: 30_000,
                final_url: "https://transitapp.com/en/trip?origin=a&destination=b".to_string(),
                error: Some("Assertion failed: error message never appeared".to_string()),
            }],
        }
    }

    /// Minimal HTTP endpoint for preflight tests: accepts one connection
    /// and answers 200 with an empty body.
    fn spawn_stub_target() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                use std::io::{Read, Write};
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                );
            }
        });
        format!("http://{addr}/en/trip")
    }

    #[tokio::test]
    async fn test_run_without_scenarios_needs_no_browser() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CheckRunner::new(CheckConfig {
            target_url: spawn_stub_target(),
            results_dir: dir.path().to_path_buf(),
            preflight_attempts: 1,
            ..CheckConfig::default()
        });

        // Browser launches are scoped to individual scenario runs, so an
        // empty suite completes on the preflight alone, with no Chromium
        // involved.
        let suite = runner.run(&[]).await.unwrap();
        assert_eq!(suite.total, 0);
        assert_eq!(suite.passed, 0);
        assert_eq!(suite.failed, 0);
        assert!(suite.results.is_empty());
    }

    #[tokio::test]
    async fn test_preflight_unreachable_target() {
        let runner = CheckRunner::new(CheckConfig {
            // Port 1 is never listening on loopback.
            target_url: "http://127.0.0.1:1/en/trip".to_string(),
            preflight_attempts: 2,
            ..CheckConfig::default()
        });

        let err = runner.preflight().await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::E2eError::TargetUnreachable { attempts: 2, .. }
        ));
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CheckRunner::new(CheckConfig {
            results_dir: dir.path().to_path_buf(),
            ..CheckConfig::default()
        });

        let path = runner.write_summary(&sample_suite()).unwrap();
        assert_eq!(path, dir.path().join("test-results.json"));

        let parsed: SuiteResult =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.total, 3);
        assert_eq!(parsed.failed, 1);
        assert_eq!(parsed.results[0].number, "Test 3");
        assert!(!parsed.results[0].passed);
    }
}
