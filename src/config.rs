//! Fixed configuration for the scripted browser check
//!
//! The target site, browser identity, and wait budgets are deliberate
//! constants: the suite drives one external page and the values below are the
//! ones the page is known to tolerate. The minimum transit-itinerary count is
//! the one business rule with no in-page source, so it is overridable via CLI
//! flag and environment variable instead of being buried as a literal.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the minimum transit-itinerary count.
pub const MIN_TRANSIT_ENV: &str = "TRANSIT_E2E_MIN_TRANSIT";

/// Default minimum number of transit itineraries the arrive-by scenario
/// must produce.
pub const DEFAULT_MIN_TRANSIT: usize = 3;

/// Configuration for a suite run.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Trip-planner entry point.
    pub target_url: String,

    /// Browser identity presented to the site.
    pub user_agent: String,

    /// Viewport dimensions.
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Run the browser headless.
    pub headless: bool,

    /// Directory for run artifacts (URL log, screenshots, suite summary).
    pub results_dir: PathBuf,

    /// Overall budget for one scenario, navigation to final assertion.
    pub scenario_timeout: Duration,

    /// Wait budget for a single control or suggestion to appear.
    pub element_timeout: Duration,

    /// Wait budget for the results URL and itinerary container.
    pub results_timeout: Duration,

    /// Wait budget for the settings dialog and the error banner.
    pub dialog_timeout: Duration,

    /// Interval between condition polls.
    pub poll_interval: Duration,

    /// Short settle pause after a click that triggers in-page updates.
    pub settle_delay: Duration,

    /// Settle pause after the itinerary container appears, while result rows
    /// stream in.
    pub results_settle: Duration,

    /// Minimum transit itineraries required by the arrive-by scenario.
    pub min_transit_itineraries: usize,

    /// Reachability probes against the target before launching the browser.
    pub preflight_attempts: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            target_url: "https://transitapp.com/en/trip".to_string(),
            user_agent: concat!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
                "AppleWebKit/537.36 (KHTML, like Gecko) ",
                "Chrome/117.0.0.0 Safari/537.36"
            )
            .to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            headless: true,
            results_dir: PathBuf::from("test-results"),
            scenario_timeout: Duration::from_secs(120),
            element_timeout: Duration::from_secs(10),
            results_timeout: Duration::from_secs(30),
            dialog_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(250),
            settle_delay: Duration::from_millis(500),
            results_settle: Duration::from_secs(2),
            min_transit_itineraries: DEFAULT_MIN_TRANSIT,
            preflight_attempts: 3,
        }
    }
}

/// Read the minimum transit-itinerary count from the environment, falling
/// back to the default when unset or unparseable.
pub fn min_transit_from_env() -> usize {
    std::env::var(MIN_TRANSIT_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MIN_TRANSIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CheckConfig::default();
        assert_eq!(cfg.target_url, "https://transitapp.com/en/trip");
        assert_eq!(cfg.viewport_width, 1920);
        assert_eq!(cfg.viewport_height, 1080);
        assert!(cfg.headless);
        assert_eq!(cfg.scenario_timeout, Duration::from_secs(120));
        assert!(cfg.user_agent.starts_with("Mozilla/5.0 (Windows NT 10.0"));
        assert!(cfg.user_agent.contains("Chrome/117.0.0.0"));
    }

    #[test]
    fn test_min_transit_env_override() {
        std::env::remove_var(MIN_TRANSIT_ENV);
        assert_eq!(min_transit_from_env(), DEFAULT_MIN_TRANSIT);

        std::env::set_var(MIN_TRANSIT_ENV, "5");
        assert_eq!(min_transit_from_env(), 5);
        // Default construction must not look at the environment; the
        // override is resolved once in the harness.
        assert_eq!(
            CheckConfig::default().min_transit_itineraries,
            DEFAULT_MIN_TRANSIT
        );

        std::env::set_var(MIN_TRANSIT_ENV, "not-a-number");
        assert_eq!(min_transit_from_env(), DEFAULT_MIN_TRANSIT);

        std::env::remove_var(MIN_TRANSIT_ENV);
    }
}
