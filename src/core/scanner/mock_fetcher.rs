use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

use crate::core::config::ScanTarget;
use crate::core::error::FetchError;
use crate::core::models::RawResponse;
use crate::core::scanner::fetcher::Fetcher;

#[derive(Clone)]
struct Step {
    latency: Duration,
    outcome: Result<RawResponse, FetchError>,
}

/// A fetcher with canned, per-host outcomes. Each fetch sleeps for the
/// scripted latency on the tokio clock, so tests can run with a paused clock.
pub struct ScriptedFetcher {
    script: HashMap<String, Step>,
    dispatches: Mutex<Vec<(String, Instant)>>,
    completions: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self { script: HashMap::new(), dispatches: Mutex::new(Vec::new()), completions: Mutex::new(Vec::new()) }
    }

    pub fn respond(mut self, host: &str, latency: Duration, headers: &[(&str, &str)]) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(HeaderName::from_bytes(name.as_bytes()).unwrap(), HeaderValue::from_str(value).unwrap());
        }
        let response = RawResponse { final_url: format!("https://{host}/"), status: 200, headers: map };
        self.script.insert(host.to_string(), Step { latency, outcome: Ok(response) });
        self
    }

    pub fn fail(mut self, host: &str, latency: Duration, error: FetchError) -> Self {
        self.script.insert(host.to_string(), Step { latency, outcome: Err(error) });
        self
    }

    /// Hosts in dispatch order, with the tokio time of each dispatch.
    pub fn dispatches(&self) -> Vec<(String, Instant)> {
        self.dispatches.lock().unwrap().clone()
    }

    /// Hosts in completion order.
    pub fn completions(&self) -> Vec<String> {
        self.completions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, target: &ScanTarget) -> Result<RawResponse, FetchError> {
        let host = Url::parse(target.url()).ok().and_then(|u| u.host_str().map(str::to_string)).unwrap_or_default();
        self.dispatches.lock().unwrap().push((host.clone(), Instant::now()));

        let step = self.script.get(&host).cloned().unwrap_or(Step {
            latency: Duration::ZERO,
            outcome: Err(FetchError::Transport(format!("no script for {host}"))),
        });
        tokio::time::sleep(step.latency).await;

        self.completions.lock().unwrap().push(host);
        step.outcome
    }
}
