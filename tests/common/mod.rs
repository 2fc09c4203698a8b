#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reputation_analyzer::config::{Config, ScrapeConfig};
use reputation_analyzer::inference::{InferenceClient, LabelScore};
use reputation_analyzer::navigator::{BrowserSession, SessionLauncher, WaitFor};
use reputation_analyzer::pipeline::Pipeline;
use tempfile::NamedTempFile;

pub const SCOREBOARD: &str = "https://scoreboard.test";

pub const DATASET: &str = "company,review\n\
    Acme,Great culture, fair pay\n\
    Acme Corp,Chaotic management\n\
    acme,Helpful onboarding\n";

pub fn label(label: &str, score: f64) -> LabelScore {
    LabelScore {
        label: label.to_string(),
        score,
    }
}

/// Substitute inference service keyed by model id.
#[derive(Default)]
pub struct FakeInference {
    pub failing_models: Vec<String>,
    pub summary: Option<String>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeInference {
    pub fn new() -> Self {
        Self {
            summary: Some("Staff enjoy the culture.".to_string()),
            ..Default::default()
        }
    }

    pub fn failing(model: &str) -> Self {
        Self {
            failing_models: vec![model.to_string()],
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, model: &str, text: &str) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), text.to_string()));
        if self.failing_models.iter().any(|m| m == model) {
            anyhow::bail!("{} is currently loading", model);
        }
        Ok(())
    }
}

#[async_trait]
impl InferenceClient for FakeInference {
    async fn classify(&self, model: &str, text: &str) -> anyhow::Result<Vec<LabelScore>> {
        self.record(model, text)?;
        if model.contains("emotion") {
            Ok(vec![label("joy", 0.4231), label("anger", 0.1)])
        } else if model.contains("cardiffnlp") {
            Ok(vec![label("LABEL_2", 0.7), label("LABEL_1", 0.2), label("LABEL_0", 0.1)])
        } else {
            Ok(vec![label("POSITIVE", 0.98), label("NEGATIVE", 0.02)])
        }
    }

    async fn summarize(&self, model: &str, text: &str) -> anyhow::Result<Option<String>> {
        self.record(model, text)?;
        Ok(self.summary.clone())
    }
}

/// Scripted scoreboard: a results page and a detail page.
#[derive(Clone)]
pub struct FakeScoreboard {
    pub results_html: String,
    pub detail_html: String,
    pub fail_detail_load: bool,
    pub fail_launch_times: usize,
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeScoreboard {
    pub fn new(rows: &[(&str, &str)], description: &str) -> Self {
        let body: String = rows
            .iter()
            .map(|(text, href)| {
                format!(
                    "<tr><td data-th=\"company\"><a href=\"{}\">{}</a></td></tr>",
                    href, text
                )
            })
            .collect();
        Self {
            results_html: format!(
                "<table class=\"rwd-table\"><tbody>{}</tbody></table>",
                body
            ),
            detail_html: format!("<p class=\"description item\">{}</p>", description),
            fail_detail_load: false,
            fail_launch_times: 0,
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct FakeSession {
    board: FakeScoreboard,
    current: String,
}

impl BrowserSession for FakeSession {
    fn open_page(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn goto(&mut self, url: &str, _wait: WaitFor) -> anyhow::Result<()> {
        if url != SCOREBOARD && self.board.fail_detail_load {
            anyhow::bail!("net::ERR_CONNECTION_RESET");
        }
        self.current = url.to_string();
        Ok(())
    }

    fn type_text(&mut self, _selector: &str, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn press_enter(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn content(&mut self) -> anyhow::Result<String> {
        if self.current == SCOREBOARD {
            Ok(self.board.results_html.clone())
        } else {
            Ok(self.board.detail_html.clone())
        }
    }

    fn close(&mut self) {
        self.board.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl SessionLauncher for FakeScoreboard {
    fn launch(&self) -> anyhow::Result<Box<dyn BrowserSession>> {
        let n = self.launches.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_launch_times {
            anyhow::bail!("chrome crashed on startup");
        }
        Ok(Box::new(FakeSession {
            board: self.clone(),
            current: String::new(),
        }))
    }
}

pub fn dataset_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn test_config(dataset: &NamedTempFile) -> Config {
    Config {
        dataset_path: dataset.path().to_path_buf(),
        scrape: ScrapeConfig {
            base_url: SCOREBOARD.to_string(),
            match_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(5),
            ..ScrapeConfig::default()
        },
        ..Config::default()
    }
}

pub fn pipeline(
    config: Config,
    inference: Arc<FakeInference>,
    board: FakeScoreboard,
) -> Pipeline {
    Pipeline::new(Arc::new(config), inference, Arc::new(board))
}
