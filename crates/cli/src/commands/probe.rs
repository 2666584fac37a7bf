//! Endpoint probe command

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::time::Instant;

use crate::output::{print_list, print_success, OutputFormat, TableDisplay};
use fixturekit::{BrowserSessionFixtureManager, WebDriverClient};
use fixturekit_common::FixturesConfig;

#[derive(Args)]
pub struct ProbeArgs {
    /// Override the endpoint URL from the configuration
    #[arg(long)]
    pub url: Option<String>,

    /// Only query endpoint status, do not open a session
    #[arg(long)]
    pub status_only: bool,
}

/// One probe step for display
#[derive(Serialize)]
pub struct ProbeStep {
    pub step: String,
    pub ok: bool,
    pub duration_ms: u64,
    pub detail: String,
}

impl TableDisplay for ProbeStep {
    fn headers() -> Vec<&'static str> {
        vec!["Step", "OK", "Duration (ms)", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.step.clone(),
            if self.ok { "yes" } else { "no" }.to_string(),
            self.duration_ms.to_string(),
            self.detail.clone(),
        ]
    }
}

fn step<T, E: std::fmt::Display>(
    name: &str,
    started: Instant,
    result: &std::result::Result<T, E>,
    detail: impl FnOnce(&T) -> String,
) -> ProbeStep {
    ProbeStep {
        step: name.to_string(),
        ok: result.is_ok(),
        duration_ms: started.elapsed().as_millis() as u64,
        detail: match result {
            Ok(value) => detail(value),
            Err(e) => e.to_string(),
        },
    }
}

pub async fn execute(args: ProbeArgs, mut config: FixturesConfig, format: OutputFormat) -> Result<()> {
    if let Some(url) = args.url {
        config.webdriver.url = url;
    }

    tracing::debug!(url = %config.webdriver.url, status_only = args.status_only, "Probing endpoint");
    let client = WebDriverClient::new(&config.webdriver.url)?;
    let mut steps = Vec::new();

    let started = Instant::now();
    let status = client.status().await;
    steps.push(step("status", started, &status, |s| {
        format!("ready={} {}", s.ready, s.message).trim_end().to_string()
    }));

    let mut failed = status.is_err();
    if !args.status_only && !failed {
        let mut browser = BrowserSessionFixtureManager::from_config(&config.webdriver)?;

        let started = Instant::now();
        let created = browser.create_session().await;
        steps.push(step("open session", started, &created, |s| s.id().to_string()));
        failed |= created.is_err();

        if created.is_ok() {
            let started = Instant::now();
            let quit = browser.destroy_session().await;
            steps.push(step("quit session", started, &quit, |_| String::new()));
            failed |= quit.is_err();
        }
    }

    print_list(&steps, format);
    if failed {
        anyhow::bail!("endpoint {} failed the probe", config.webdriver.url);
    }
    print_success(&format!("Endpoint {} is usable", config.webdriver.url));
    Ok(())
}
