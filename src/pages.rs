//! Page object for the trip-planner UI
//!
//! Groups the locators and interaction sequences for the external
//! trip-planning page. The page's own states (origin incomplete, searching,
//! results shown, settings open) are observed only through visible DOM
//! signals; nothing here owns that state machine.

use regex::Regex;
use tracing::{debug, info, warn};

use crate::browser::{js_regex_escape, PageHandle};
use crate::config::CheckConfig;
use crate::error::{E2eError, E2eResult};

/// Origin search field. The page renders it as a combobox labelled "origin"
/// in both locales.
const ORIGIN_INPUT: &str = "input[aria-label*='origin' i], \
     [role='combobox'][aria-label*='origin' i], \
     input[placeholder*='origin' i]";

/// Destination search field.
const DESTINATION_INPUT: &str = "input[aria-label*='destination' i], \
     [role='combobox'][aria-label*='destination' i], \
     input[placeholder*='destination' i]";

/// Region listing computed trip options, with class-based fallbacks for when
/// the accessible name changes.
const ITINERARY_CONTAINER: &str = "[aria-label*='Suggested trip plans'], \
     [class*='itinerary'], [class*='results']";

/// Settings dialog, by role first, loose class match second.
const OPTIONS_PANEL: &str = "[role='alertdialog'], [role='dialog'], \
     [class*='modal'], [class*='settings']";

/// Anything clickable, for label-matched controls.
const BUTTONS: &str = "button, [role='button']";

/// Transit-row markers inside the itinerary container, deduplicated across
/// the overlapping container fallbacks.
const TRANSIT_MARKERS: &str =
    "[data-sentry-component=\"RouteDisplayName\"], img[src*=\"stm-metro\"]";

/// Suggestion pattern for an address: first word, case-insensitive, except
/// the known-ambiguous Saint-Catherine case which needs a hand-tuned match.
pub fn suggestion_pattern(address: &str) -> String {
    if address.contains("Saint-Catherine") {
        return "S(ainte|aint)-Catherine.*(Ouest|West)".to_string();
    }
    let first_word = address.split_whitespace().next().unwrap_or(address);
    js_regex_escape(first_word)
}

/// Driver for one trip-planner page.
pub struct TripPlannerPage<'a> {
    page: &'a PageHandle,
    cfg: &'a CheckConfig,
}

impl<'a> TripPlannerPage<'a> {
    pub fn new(page: &'a PageHandle, cfg: &'a CheckConfig) -> Self {
        Self { page, cfg }
    }

    /// Load the trip planner and wait for the document to settle.
    pub async fn navigate(&self) -> E2eResult<()> {
        info!("Navigating to {}", self.cfg.target_url);
        self.page
            .goto_settled(&self.cfg.target_url, self.cfg.results_timeout)
            .await
    }

    /// Type the origin address and pick the matching suggestion.
    pub async fn set_origin(&self, address: &str) -> E2eResult<()> {
        debug!("Setting origin: {address}");
        self.page.type_into(ORIGIN_INPUT, address).await?;
        self.pick_suggestion(&suggestion_pattern(address)).await
    }

    /// Type the destination address and pick the matching suggestion.
    pub async fn set_destination(&self, address: &str) -> E2eResult<()> {
        self.set_destination_with_pattern(address, &suggestion_pattern(address))
            .await
    }

    /// Type the destination and pick a suggestion by an explicit pattern,
    /// for cases where the default first-word match is too loose.
    pub async fn set_destination_with_pattern(
        &self,
        address: &str,
        pattern: &str,
    ) -> E2eResult<()> {
        debug!("Setting destination: {address} (suggestion /{pattern}/)");
        self.page.type_into(DESTINATION_INPUT, address).await?;
        self.pick_suggestion(pattern).await
    }

    /// Wait for the asynchronous suggestion list and click the first entry
    /// matching `pattern`.
    async fn pick_suggestion(&self, pattern: &str) -> E2eResult<()> {
        self.page
            .click_text("body *", pattern, self.cfg.element_timeout)
            .await?;
        tokio::time::sleep(self.cfg.settle_delay).await;
        Ok(())
    }

    /// Confirm the search: Enter on the destination field, then the
    /// Search/Plan button if the page happens to render one.
    pub async fn perform_search(&self) -> E2eResult<()> {
        self.page.press_on(DESTINATION_INPUT, "Enter").await?;
        tokio::time::sleep(self.cfg.settle_delay).await;

        if self.page.try_click_text("button", "Search|Plan").await {
            debug!("Clicked explicit search button");
            tokio::time::sleep(self.cfg.settle_delay).await;
        }
        Ok(())
    }

    /// Wait until the URL carries both trip endpoints and the itinerary
    /// container is visible.
    pub async fn wait_for_results(&self) -> E2eResult<()> {
        let pattern = Regex::new("origin=.*destination=.*")?;
        self.page
            .wait_url(&pattern, self.cfg.results_timeout)
            .await?;
        self.page
            .wait_visible(ITINERARY_CONTAINER, self.cfg.results_timeout)
            .await?;
        // Result rows keep streaming in after the container mounts.
        tokio::time::sleep(self.cfg.results_settle).await;
        Ok(())
    }

    /// Open the search-settings dialog. Absence of the button is a hard
    /// failure.
    pub async fn open_options_panel(&self) -> E2eResult<()> {
        self.page
            .click_text(BUTTONS, "Options|Paramètres", self.cfg.element_timeout)
            .await
            .map_err(|_| E2eError::StepFailed {
                step: "open options panel".to_string(),
                reason: "Options button not found".to_string(),
            })?;
        self.page
            .wait_visible(OPTIONS_PANEL, self.cfg.dialog_timeout)
            .await?;
        tokio::time::sleep(self.cfg.settle_delay).await;
        Ok(())
    }

    /// Switch the departure type to arrive-by.
    pub async fn set_arrive_by(&self) -> E2eResult<()> {
        self.page
            .click_text(
                BUTTONS,
                "select departure type|Type de départ",
                self.cfg.element_timeout,
            )
            .await?;
        tokio::time::sleep(self.cfg.settle_delay).await;

        self.page
            .click_text(
                "[role='listbox'] [role='option']",
                "Arrive by|Arriver à",
                self.cfg.element_timeout,
            )
            .await?;
        tokio::time::sleep(self.cfg.settle_delay).await;
        Ok(())
    }

    /// Pick a time option by its exact label, e.g. "12:00 PM".
    pub async fn set_time(&self, time: &str) -> E2eResult<()> {
        self.page
            .click_text(
                BUTTONS,
                "select departure/arrival time|Time|Hour|Heure",
                self.cfg.element_timeout,
            )
            .await?;
        tokio::time::sleep(self.cfg.settle_delay).await;

        let exact = format!("^\\s*{}\\s*$", js_regex_escape(time));
        self.page
            .click_text("[role='listbox'] [role='option']", &exact, self.cfg.element_timeout)
            .await?;
        tokio::time::sleep(self.cfg.settle_delay).await;
        Ok(())
    }

    /// Select tomorrow's date in the calendar, best-effort: three fallback
    /// strategies, and a warning instead of a failure when all three miss.
    pub async fn set_date_to_tomorrow(&self) -> E2eResult<()> {
        let day = tomorrow_day(chrono::Local::now().date_naive());

        self.page
            .click_text(BUTTONS, "Calendar|Date|Calendrier", self.cfg.element_timeout)
            .await?;
        self.page
            .wait_visible("[role='grid']", self.cfg.element_timeout)
            .await?;

        if self.click_grid_cell(day).await {
            info!("Selected date {day} via grid cell");
        } else if self.click_day_button(day).await {
            info!("Selected date {day} via day button");
        } else if self.select_day_by_keyboard().await {
            info!("Selected date {day} via keyboard navigation");
        } else {
            warn!("Could not select tomorrow's date ({day}); continuing with default date");
        }

        tokio::time::sleep(self.cfg.settle_delay).await;
        Ok(())
    }

    /// Grid cell whose trimmed text equals the day and which is not marked
    /// `data-disabled`.
    async fn click_grid_cell(&self, day: u32) -> bool {
        let expr = format!(
            "(() => {{ \
               const grid = document.querySelector('[role=\"grid\"]'); \
               if (!grid) return false; \
               for (const cell of grid.querySelectorAll('[role=\"gridcell\"]')) {{ \
                 if ((cell.textContent || '').trim() !== '{day}') continue; \
                 const dis = cell.getAttribute('data-disabled'); \
                 if (dis && dis !== 'false') continue; \
                 cell.click(); \
                 return true; \
               }} \
               return false; \
             }})()"
        );
        self.page.eval_value(expr).await.unwrap_or(false)
    }

    /// Any visible enabled button carrying the day number.
    async fn click_day_button(&self, day: u32) -> bool {
        let expr = format!(
            "(() => {{ \
               for (const el of document.querySelectorAll('button, div[role=\"button\"]')) {{ \
                 if ((el.textContent || '').trim() !== '{day}') continue; \
                 if (el.getClientRects().length === 0) continue; \
                 const dis = el.getAttribute('data-disabled'); \
                 if (dis && dis !== 'false') continue; \
                 el.click(); \
                 return true; \
               }} \
               return false; \
             }})()"
        );
        self.page.eval_value(expr).await.unwrap_or(false)
    }

    /// Last resort: focus the calendar, arrow one day right, confirm.
    async fn select_day_by_keyboard(&self) -> bool {
        for key in ["Tab", "ArrowRight", "Enter"] {
            if let Err(e) = self.page.press_on("body", key).await {
                debug!("Keyboard date selection failed on {key}: {e}");
                return false;
            }
        }
        true
    }

    /// Save the settings and wait for the refreshed page to settle.
    pub async fn save_options(&self) -> E2eResult<()> {
        self.page
            .click_text(BUTTONS, "Save|Enregistrer", self.cfg.element_timeout)
            .await?;
        self.page.wait_settled(self.cfg.dialog_timeout).await?;
        tokio::time::sleep(self.cfg.settle_delay).await;
        Ok(())
    }

    /// Number of visible itinerary containers.
    pub async fn itinerary_count(&self) -> E2eResult<u64> {
        self.page.element_count(ITINERARY_CONTAINER).await
    }

    /// Whether a walking-only trip is listed after the "other options"
    /// heading.
    pub async fn has_walking_option(&self) -> E2eResult<bool> {
        let expr = "(() => { \
               const heads = Array.from(document.querySelectorAll('body *')); \
               const head = heads.find(el => \
                 /OTHER OPTIONS|AUTRES OPTIONS/i.test(el.textContent || '') && \
                 el.children.length === 0); \
               if (!head) return 0; \
               const re = /walk|marche|on foot|pied/i; \
               const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_ELEMENT); \
               let after = false, count = 0, cur; \
               while ((cur = walker.nextNode())) { \
                 if (cur === head) { after = true; continue; } \
                 if (after && cur.children.length === 0 && re.test(cur.textContent || '')) count++; \
               } \
               return count; \
             })()"
            .to_string();
        let count: u64 = self.page.eval_value(expr).await?;
        Ok(count > 0)
    }

    /// Count transit result rows inside the itinerary container by their UI
    /// markers.
    pub async fn transit_option_count(&self) -> E2eResult<u64> {
        self.page
            .wait_visible(ITINERARY_CONTAINER, self.cfg.results_timeout)
            .await?;

        let expr = format!(
            "(() => {{ \
               const seen = new Set(); \
               for (const root of document.querySelectorAll({container})) {{ \
                 for (const el of root.querySelectorAll({markers})) seen.add(el); \
               }} \
               return seen.size; \
             }})()",
            container = crate::browser::js_string(ITINERARY_CONTAINER),
            markers = crate::browser::js_string(TRANSIT_MARKERS),
        );
        self.page.eval_value(expr).await
    }

    /// Wait for the user-facing error banner and require its exact text.
    pub async fn wait_for_error_message(&self, expected: &str) -> E2eResult<()> {
        self.page
            .wait_exact_text(expected, self.cfg.dialog_timeout)
            .await
            .map_err(|_| {
                E2eError::AssertionFailed(format!("error message {expected:?} never appeared"))
            })
    }

    /// Visible text of the whole page, for loose fallback assertions.
    pub async fn body_text(&self) -> E2eResult<String> {
        self.page.body_text().await
    }
}

/// Day-of-month of the day after `today`.
pub fn tomorrow_day(today: chrono::NaiveDate) -> u32 {
    use chrono::Datelike;
    today.succ_opt().map_or(today.day(), |d| d.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use test_case::test_case;

    #[test_case("5333 Casgrain Ave Montreal", "5333"; "origin first word")]
    #[test_case("Toronto", "Toronto"; "single word")]
    fn test_suggestion_pattern_first_word(address: &str, expected: &str) {
        assert_eq!(suggestion_pattern(address), expected);
    }

    #[test]
    fn test_suggestion_pattern_saint_catherine() {
        let pattern = suggestion_pattern("1321 Saint-Catherine Street West montreal");
        assert_eq!(pattern, "S(ainte|aint)-Catherine.*(Ouest|West)");

        // The hand-tuned pattern must accept both locales of the suggestion.
        let re = Regex::new(&format!("(?i){pattern}")).unwrap();
        assert!(re.is_match("1321 Saint-Catherine Street West, Montreal"));
        assert!(re.is_match("1321 Rue Sainte-Catherine Ouest, Montréal"));
        assert!(!re.is_match("1321 Saint-Catherine Street East, Montreal"));
    }

    #[test]
    fn test_suggestion_pattern_escapes_metachars() {
        assert_eq!(suggestion_pattern("St. Laurent"), r"St\.");
    }

    #[test]
    fn test_tomorrow_day_mid_month() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        assert_eq!(tomorrow_day(today), 30);
    }

    #[test]
    fn test_tomorrow_day_month_rollover() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        assert_eq!(tomorrow_day(today), 1);

        let leap = NaiveDate::from_ymd_opt(2028, 2, 28).unwrap();
        assert_eq!(tomorrow_day(leap), 29);
    }

    #[test]
    fn test_exact_time_pattern_matches_whole_label() {
        let exact = format!("^\\s*{}\\s*$", js_regex_escape("12:00 PM"));
        let re = Regex::new(&exact).unwrap();
        assert!(re.is_match("12:00 PM"));
        assert!(re.is_match("  12:00 PM "));
        assert!(!re.is_match("2:00 PM"));
        assert!(!re.is_match("12:00 PM tomorrow"));
    }
}
