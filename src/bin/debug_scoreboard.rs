//! Runs only the scoreboard navigator against the live site and prints what
//! it found. Usage: `debug_scoreboard "<Company Name>"`.

use anyhow::Result;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use reputation_analyzer::browser::ChromeLauncher;
use reputation_analyzer::config::Config;
use reputation_analyzer::navigator::{CancelFlag, Navigator};

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let company = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if company.trim().is_empty() {
        anyhow::bail!("usage: debug_scoreboard <company name>");
    }

    let config = Config::from_env();
    println!("🕵️ Navigating {} for '{}'", config.scrape.base_url, company);

    let launcher = ChromeLauncher::new(config.scrape.browser_timeout);
    let navigator = Navigator::new(config.scrape.clone(), CancelFlag::default());

    let scraped = navigator.run(&launcher, company.trim())?;
    println!("🔗 Link: {}", scraped.link);
    println!("📄 Description:\n{}", scraped.description);

    Ok(())
}
