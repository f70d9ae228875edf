//! Browser session management over the Chrome DevTools Protocol
//!
//! Wraps a headless Chromium launched through `chromiumoxide` and exposes the
//! small set of primitives the scripted check needs: condition-based waits
//! (poll-until-visible, poll-until-url-matches), typing with real keystrokes,
//! and text-pattern clicks. The CDP has no text selectors, so text matching
//! runs as injected expressions against the live DOM.

use std::path::Path;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use regex::Regex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::CheckConfig;
use crate::error::{E2eError, E2eResult};

/// A launched browser plus its spawned CDP event loop.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch Chromium with the configured viewport and headless mode.
    pub async fn launch(cfg: &CheckConfig) -> E2eResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(cfg.viewport_width, cfg.viewport_height)
            .no_sandbox()
            .arg("--disable-gpu");

        if !cfg.headless {
            builder = builder.with_head();
        }

        let browser_config = builder.build().map_err(E2eError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let handler_task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Open a fresh page with the configured browser identity applied.
    pub async fn new_page(&self, cfg: &CheckConfig) -> E2eResult<PageHandle> {
        let page = self.browser.new_page("about:blank").await?;
        page.set_user_agent(cfg.user_agent.as_str()).await?;

        Ok(PageHandle {
            page,
            poll_interval: cfg.poll_interval,
        })
    }

    /// Close the browser and stop the event loop.
    pub async fn shutdown(mut self) {
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}

/// One page of the session, with polling helpers.
pub struct PageHandle {
    page: Page,
    poll_interval: Duration,
}

impl PageHandle {
    /// Navigate and wait until the document has fully loaded.
    pub async fn goto_settled(&self, url: &str, timeout: Duration) -> E2eResult<()> {
        self.page.goto(url).await?;
        self.wait_settled(timeout).await
    }

    /// Poll until `document.readyState` is `complete`.
    pub async fn wait_settled(&self, timeout: Duration) -> E2eResult<()> {
        self.poll_until(timeout, "document ready", || async move {
            let state: String = self
                .eval_value("document.readyState".to_string())
                .await?;
            Ok(state == "complete")
        })
        .await
    }

    /// Poll until an element matching `css` is rendered.
    pub async fn wait_visible(&self, css: &str, timeout: Duration) -> E2eResult<()> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({css}); \
             return !!(el && el.getClientRects().length > 0); }})()",
            css = js_string(css),
        );
        self.poll_until(timeout, &format!("element visible: {css}"), || {
            let expr = expr.clone();
            async move { self.eval_value::<bool>(expr).await }
        })
        .await
    }

    /// Poll until the page URL matches `pattern`.
    pub async fn wait_url(&self, pattern: &Regex, timeout: Duration) -> E2eResult<()> {
        self.poll_until(timeout, &format!("url matching {pattern}"), || async move {
            let url = self.current_url().await?;
            Ok(pattern.is_match(&url))
        })
        .await
    }

    /// Poll until a visible element under `scope_css` whose text matches
    /// `pattern` exists, then click the deepest such element.
    pub async fn click_text(
        &self,
        scope_css: &str,
        pattern: &str,
        timeout: Duration,
    ) -> E2eResult<()> {
        let expr = click_text_expr(scope_css, pattern);
        self.poll_until(
            timeout,
            &format!("clickable text /{pattern}/ under {scope_css}"),
            || {
                let expr = expr.clone();
                async move { self.eval_value::<bool>(expr).await }
            },
        )
        .await
    }

    /// Single best-effort attempt at [`click_text`]; absence is not an error.
    pub async fn try_click_text(&self, scope_css: &str, pattern: &str) -> bool {
        match self.eval_value::<bool>(click_text_expr(scope_css, pattern)).await {
            Ok(clicked) => clicked,
            Err(e) => {
                debug!("optional click /{pattern}/ failed: {e}");
                false
            }
        }
    }

    /// Poll until a visible element whose trimmed text is exactly `text`
    /// exists.
    pub async fn wait_exact_text(&self, text: &str, timeout: Duration) -> E2eResult<()> {
        let expr = format!(
            "(() => {{ \
               const want = {want}; \
               const all = Array.from(document.querySelectorAll('body *')); \
               return all.some(el => \
                 (el.textContent || '').trim() === want && \
                 el.getClientRects().length > 0 && \
                 !Array.from(el.children).some(c => (c.textContent || '').trim() === want)); \
             }})()",
            want = js_string(text),
        );
        self.poll_until(timeout, &format!("exact text {text:?}"), || {
            let expr = expr.clone();
            async move { self.eval_value::<bool>(expr).await }
        })
        .await
    }

    /// Number of elements matching `css`.
    pub async fn element_count(&self, css: &str) -> E2eResult<u64> {
        let expr = format!(
            "document.querySelectorAll({}).length",
            js_string(css)
        );
        self.eval_value(expr).await
    }

    /// Click the first element matching `css` and type `text` with real
    /// keystrokes, so the page sees the input events its autocomplete listens
    /// for.
    pub async fn type_into(&self, css: &str, text: &str) -> E2eResult<()> {
        let element = self.page.find_element(css).await.map_err(|e| {
            E2eError::StepFailed {
                step: format!("type into {css}"),
                reason: e.to_string(),
            }
        })?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    /// Press a named key on the first element matching `css`.
    pub async fn press_on(&self, css: &str, key: &str) -> E2eResult<()> {
        let element = self.page.find_element(css).await.map_err(|e| {
            E2eError::StepFailed {
                step: format!("press {key} on {css}"),
                reason: e.to_string(),
            }
        })?;
        element.press_key(key).await?;
        Ok(())
    }

    /// Evaluate an expression and deserialize its value.
    pub async fn eval_value<T: serde::de::DeserializeOwned>(
        &self,
        expr: String,
    ) -> E2eResult<T> {
        let result = self.page.evaluate(expr).await?;
        Ok(result.into_value()?)
    }

    /// Full visible text of the page body.
    pub async fn body_text(&self) -> E2eResult<String> {
        self.eval_value("document.body ? document.body.innerText : ''".to_string())
            .await
    }

    /// Current page URL, empty if none.
    pub async fn current_url(&self) -> E2eResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    /// Capture a full-page screenshot to `path`.
    pub async fn save_full_screenshot(&self, path: &Path) -> E2eResult<()> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page.save_screenshot(params, path).await?;
        Ok(())
    }

    /// Close the underlying page.
    pub async fn close(self) -> E2eResult<()> {
        self.page.close().await?;
        Ok(())
    }

    /// Poll `check` every `poll_interval` until it returns true or `timeout`
    /// elapses.
    async fn poll_until<F, Fut>(
        &self,
        timeout: Duration,
        what: &str,
        mut check: F,
    ) -> E2eResult<()>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = E2eResult<bool>>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if check().await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(E2eError::Timeout(what.to_string()));
            }
            sleep(self.poll_interval).await;
        }
    }
}

/// Expression that clicks the deepest visible element under `scope_css`
/// whose text matches `pattern`, returning whether anything was clicked.
fn click_text_expr(scope_css: &str, pattern: &str) -> String {
    format!(
        "(() => {{ \
           const re = new RegExp({pattern}, 'i'); \
           const all = Array.from(document.querySelectorAll({scope})); \
           const hits = all.filter(el => re.test(el.textContent || '')); \
           const deepest = hits.filter(el => !hits.some(o => o !== el && el.contains(o))); \
           const visible = deepest.filter(el => el.getClientRects().length > 0); \
           if (visible.length === 0) return false; \
           visible[0].click(); \
           return true; \
         }})()",
        pattern = js_string(pattern),
        scope = js_string(scope_css),
    )
}

/// Quote a Rust string as a JavaScript string literal.
pub fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Escape a literal so it matches itself inside a JavaScript RegExp.
pub fn js_regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\^$.|?*+()[]{}/".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
