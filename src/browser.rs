//! Headless Chrome backed [`SessionLauncher`].

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::navigator::{BrowserSession, SessionLauncher, WaitFor};

static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/123.0.0.0 Safari/537.36",
    ]
});

const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

// Quiet period after load before the page counts as settled.
const NETWORK_SETTLE: Duration = Duration::from_millis(500);

pub struct ChromeLauncher {
    timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn chrome_args(user_agent: &str) -> Vec<String> {
    vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-infobars".to_string(),
        "--headless=new".to_string(),
        format!("--user-agent={}", user_agent),
    ]
}

impl SessionLauncher for ChromeLauncher {
    fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(FALLBACK_USER_AGENT);
        let args = chrome_args(user_agent);

        let browser = Browser::new(LaunchOptions {
            headless: false, // new headless mode via args
            window_size: Some((1920, 1080)),
            args: args.iter().map(OsStr::new).collect(),
            idle_browser_timeout: self.timeout * 4,
            ..Default::default()
        })
        .context("launching Chrome")?;

        info!("🌐 Chrome launched");
        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab: None,
            timeout: self.timeout,
        }))
    }
}

pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
    timeout: Duration,
}

impl ChromeSession {
    fn tab(&self) -> Result<&Arc<Tab>> {
        self.tab
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no page open in browser session"))
    }

    fn wait_for_ready_state(&self, tab: &Tab) -> Result<()> {
        let started = Instant::now();
        loop {
            let state = tab
                .evaluate("document.readyState", false)?
                .value
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            if state == "complete" {
                return Ok(());
            }
            if started.elapsed() >= self.timeout {
                anyhow::bail!("page did not finish loading within {:?}", self.timeout);
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }
}

impl BrowserSession for ChromeSession {
    fn open_page(&mut self) -> Result<()> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("browser already closed"))?;
        let tab = browser.new_tab().context("opening tab")?;
        tab.set_default_timeout(self.timeout);
        self.tab = Some(tab);
        Ok(())
    }

    fn goto(&mut self, url: &str, wait: WaitFor) -> Result<()> {
        let tab = self.tab()?.clone();
        debug!("🌐 Navigating to {}", url);
        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;
        match wait {
            WaitFor::DomReady => {
                tab.wait_for_element("body")?;
            }
            WaitFor::NetworkIdle => {
                self.wait_for_ready_state(&tab)?;
                std::thread::sleep(NETWORK_SETTLE);
            }
        }
        Ok(())
    }

    fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let tab = self.tab()?;
        let input = tab
            .wait_for_element(selector)
            .with_context(|| format!("search field '{}' not found", selector))?;
        input.click()?;
        tab.type_str(text)?;
        Ok(())
    }

    fn press_enter(&mut self) -> Result<()> {
        self.tab()?.press_key("Enter")?;
        Ok(())
    }

    fn content(&mut self) -> Result<String> {
        self.tab()?.get_content()
    }

    fn close(&mut self) {
        if let Some(tab) = self.tab.take() {
            if let Err(e) = tab.close(true) {
                warn!("⚠️ Failed to close tab cleanly: {}", e);
            }
        }
        // Dropping the Browser kills the Chrome process.
        if self.browser.take().is_some() {
            info!("🌐 Chrome closed");
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.close();
    }
}
