//! Scoreboard navigator: drives one browser session through
//! Launch -> Search -> AwaitMatch -> ResolveLink -> Extract.
//!
//! The protocol is blocking (the browser driver is synchronous) and is meant
//! to run on a blocking thread. The session is closed exactly once on every
//! exit path via [`SessionGuard`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;

pub const SEARCH_INPUT_SELECTOR: &str = "input[type='text']";

static RESULT_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.rwd-table tbody tr").expect("static selector"));
static COMPANY_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td[data-th=\"company\"] a").expect("static selector"));
static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".description.item").expect("static selector"));

/// How long a navigation should wait before handing the page back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitFor {
    /// Minimal DOM is ready.
    DomReady,
    /// Network has gone quiet.
    NetworkIdle,
}

/// One page in one browser. Implementations must tolerate `close` being
/// called on a half-initialised session.
pub trait BrowserSession: Send {
    fn open_page(&mut self) -> anyhow::Result<()>;
    fn goto(&mut self, url: &str, wait: WaitFor) -> anyhow::Result<()>;
    fn type_text(&mut self, selector: &str, text: &str) -> anyhow::Result<()>;
    fn press_enter(&mut self) -> anyhow::Result<()>;
    /// Rendered HTML of the current page.
    fn content(&mut self) -> anyhow::Result<String>;
    fn close(&mut self);
}

pub trait SessionLauncher: Send + Sync {
    fn launch(&self) -> anyhow::Result<Box<dyn BrowserSession>>;
}

/// Owns the session and closes it once, whether the protocol finishes,
/// fails, or unwinds.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn session(&mut self) -> &mut dyn BrowserSession {
        match self.session.as_mut() {
            Some(s) => s.as_mut(),
            None => unreachable!("session used after close"),
        }
    }

    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
            debug!("🧹 Browser session closed");
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.close();
    }
}

/// Shared flag raised when the caller stops waiting for the result.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raises the flag when dropped unless disarmed first.
    pub fn guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            flag: self.clone(),
            armed: true,
        }
    }
}

pub struct CancelOnDrop {
    flag: CancelFlag,
    armed: bool,
}

impl CancelOnDrop {
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.cancel();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Launch,
    Search,
    AwaitMatch,
    ResolveLink,
    Extract,
    Done,
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("failed to launch browser")]
    Launch(#[source] anyhow::Error),

    #[error("browser failure during {state}")]
    Browser {
        state: NavState,
        #[source]
        source: anyhow::Error,
    },

    #[error("no result for '{0}' appeared before the timeout")]
    MatchTimeout(String),

    #[error("no exact result link for '{0}'")]
    CompanyNotFound(String),

    #[error("invalid company link '{link}': {reason}")]
    InvalidLink { link: String, reason: String },

    #[error("failed to load company page: {url}")]
    DetailPageLoad {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no description on {0}")]
    DescriptionMissing(String),

    #[error("navigation cancelled during {0}")]
    Cancelled(NavState),
}

impl NavigatorError {
    /// Whether re-running the whole protocol could help.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            NavigatorError::Launch(_)
                | NavigatorError::Browser { .. }
                | NavigatorError::DetailPageLoad { .. }
        )
    }
}

/// A row of the scoreboard search results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub text: String,
    pub href: Option<String>,
}

/// What a successful navigation yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapedCompany {
    pub company: String,
    pub link: String,
    pub description: String,
}

/// Context threaded through the transitions.
#[derive(Debug, Default)]
pub struct NavigationContext {
    pub entity: String,
    pub candidates: Vec<ResultRow>,
    pub link: Option<String>,
    pub description: Option<String>,
}

impl NavigationContext {
    pub fn new(entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            ..Default::default()
        }
    }
}

/// Company rows from a rendered results page, in table order.
pub fn parse_result_rows(html: &str) -> Vec<ResultRow> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_ROW)
        .filter_map(|row| {
            let link = row.select(&COMPANY_LINK).next()?;
            Some(ResultRow {
                text: link.text().collect::<String>(),
                href: link.value().attr("href").map(|s| s.to_string()),
            })
        })
        .collect()
}

/// Trimmed, whitespace-collapsed text of the first description element.
pub fn parse_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let element = document.select(&DESCRIPTION).next()?;
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Absolute URL for a result link; relative links hang off `base_url`.
pub fn resolve_link(base_url: &str, href: &str) -> Result<String, NavigatorError> {
    let href = href.trim();
    if href.starts_with("http") {
        return Ok(href.to_string());
    }
    let invalid = |reason: String| NavigatorError::InvalidLink {
        link: href.to_string(),
        reason,
    };
    let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    base.join(href)
        .map(|u| u.to_string())
        .map_err(|e| invalid(e.to_string()))
}

pub struct Navigator {
    config: ScrapeConfig,
    cancel: CancelFlag,
}

impl Navigator {
    pub fn new(config: ScrapeConfig, cancel: CancelFlag) -> Self {
        Self { config, cancel }
    }

    fn check_cancel(&self, state: NavState) -> Result<(), NavigatorError> {
        if self.cancel.is_cancelled() {
            warn!("🛑 Navigation cancelled during {}", state);
            return Err(NavigatorError::Cancelled(state));
        }
        Ok(())
    }

    /// Run the full protocol for `entity`.
    pub fn run(
        &self,
        launcher: &dyn SessionLauncher,
        entity: &str,
    ) -> Result<ScrapedCompany, NavigatorError> {
        self.check_cancel(NavState::Launch)?;
        let session = launcher.launch().map_err(NavigatorError::Launch)?;
        let mut guard = SessionGuard::new(session);

        let mut ctx = NavigationContext::new(entity);
        let mut state = NavState::Launch;
        let result = loop {
            if let Err(e) = self.check_cancel(state) {
                break Err(e);
            }
            debug!("🧭 [{}] {}", entity, state);
            let next = match state {
                NavState::Launch => self.launch(guard.session()),
                NavState::Search => self.search(guard.session(), &ctx),
                NavState::AwaitMatch => self.await_match(guard.session(), &mut ctx),
                NavState::ResolveLink => self.resolve(&mut ctx),
                NavState::Extract => self.extract(guard.session(), &mut ctx),
                NavState::Done => break Ok(()),
            };
            match next {
                Ok(s) => state = s,
                Err(e) => break Err(e),
            }
        };

        guard.close();

        if let Err(e) = &result {
            warn!("⚠️ Navigation for '{}' stopped at {}: {}", entity, state, e);
        }
        result?;

        match (ctx.link, ctx.description) {
            (Some(link), Some(description)) => Ok(ScrapedCompany {
                company: ctx.entity,
                link,
                description,
            }),
            (link, _) => Err(NavigatorError::DescriptionMissing(link.unwrap_or_default())),
        }
    }

    pub fn launch(&self, session: &mut dyn BrowserSession) -> Result<NavState, NavigatorError> {
        session.open_page().map_err(NavigatorError::Launch)?;
        Ok(NavState::Search)
    }

    pub fn search(
        &self,
        session: &mut dyn BrowserSession,
        ctx: &NavigationContext,
    ) -> Result<NavState, NavigatorError> {
        let browser_err = |source| NavigatorError::Browser {
            state: NavState::Search,
            source,
        };
        info!("🔎 Searching scoreboard for '{}'", ctx.entity);
        session
            .goto(&self.config.base_url, WaitFor::DomReady)
            .map_err(browser_err)?;
        session
            .type_text(SEARCH_INPUT_SELECTOR, &ctx.entity)
            .map_err(browser_err)?;
        session.press_enter().map_err(browser_err)?;
        Ok(NavState::AwaitMatch)
    }

    /// Poll the results table until some row's link text contains the
    /// entity name. Read failures are retried until the timeout; if the page
    /// never rendered at all the last read failure is reported.
    pub fn await_match(
        &self,
        session: &mut dyn BrowserSession,
        ctx: &mut NavigationContext,
    ) -> Result<NavState, NavigatorError> {
        let started = Instant::now();
        let mut rendered = false;
        let mut last_error = None;
        loop {
            self.check_cancel(NavState::AwaitMatch)?;

            // The results page is still navigating after submit, so reads
            // can fail until its context settles.
            let matching: Vec<ResultRow> = match session.content() {
                Ok(html) => {
                    rendered = true;
                    parse_result_rows(&html)
                        .into_iter()
                        .filter(|row| row.text.contains(&ctx.entity))
                        .collect()
                }
                Err(e) => {
                    debug!("🧭 Results not readable yet for '{}': {:#}", ctx.entity, e);
                    last_error = Some(e);
                    Vec::new()
                }
            };

            if !matching.is_empty() {
                debug!(
                    "🧭 {} candidate rows for '{}' after {:?}",
                    matching.len(),
                    ctx.entity,
                    started.elapsed()
                );
                ctx.candidates = matching;
                return Ok(NavState::ResolveLink);
            }

            if started.elapsed() >= self.config.match_timeout {
                return Err(match last_error {
                    Some(source) if !rendered => NavigatorError::Browser {
                        state: NavState::AwaitMatch,
                        source,
                    },
                    _ => NavigatorError::MatchTimeout(ctx.entity.clone()),
                });
            }
            std::thread::sleep(poll_delay(self.config.poll_interval));
        }
    }

    /// Pick the candidate whose trimmed link text equals the entity name.
    pub fn resolve(&self, ctx: &mut NavigationContext) -> Result<NavState, NavigatorError> {
        let href = ctx
            .candidates
            .iter()
            .find(|row| row.text.trim() == ctx.entity)
            .and_then(|row| row.href.clone())
            .ok_or_else(|| NavigatorError::CompanyNotFound(ctx.entity.clone()))?;

        let link = resolve_link(&self.config.base_url, &href)?;
        info!("🔗 Resolved '{}' to {}", ctx.entity, link);
        ctx.link = Some(link);
        Ok(NavState::Extract)
    }

    pub fn extract(
        &self,
        session: &mut dyn BrowserSession,
        ctx: &mut NavigationContext,
    ) -> Result<NavState, NavigatorError> {
        let link = ctx
            .link
            .clone()
            .ok_or_else(|| NavigatorError::CompanyNotFound(ctx.entity.clone()))?;

        session
            .goto(&link, WaitFor::NetworkIdle)
            .map_err(|source| NavigatorError::DetailPageLoad {
                url: link.clone(),
                source,
            })?;

        let html = session.content().map_err(|source| NavigatorError::Browser {
            state: NavState::Extract,
            source,
        })?;

        let description =
            parse_description(&html).ok_or_else(|| NavigatorError::DescriptionMissing(link.clone()))?;
        info!("📄 Extracted {} chars of description for '{}'", description.len(), ctx.entity);
        ctx.description = Some(description);
        Ok(NavState::Done)
    }
}

fn poll_delay(interval: Duration) -> Duration {
    if interval.is_zero() {
        Duration::from_millis(1)
    } else {
        interval
    }
}
