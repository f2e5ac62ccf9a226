use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::metrics::{CallCounter, CallKind};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) board-explorer/0.1 (+https://github.com/)";

pub fn build_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .context("build http client")
}

/// Fixed pause after every remote call, to stay under source rate limits.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Sequential GETs for one source: counted, paced, status-checked.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    pacer: Pacer,
    counter: Arc<CallCounter>,
    module: &'static str,
}

impl Fetcher {
    pub fn new(
        client: reqwest::Client,
        pacer: Pacer,
        counter: Arc<CallCounter>,
        module: &'static str,
    ) -> Self {
        Self {
            client,
            pacer,
            counter,
            module,
        }
    }

    /// GETs `url` and returns the body. Non-2xx is an error. The pacer
    /// delay runs after the call whether or not it succeeded.
    pub async fn get_text(&self, url: &str) -> anyhow::Result<String> {
        self.counter.increment(CallKind::Http, self.module);
        let result = self.try_get_text(url).await;
        self.pacer.pause().await;
        result
    }

    async fn try_get_text(&self, url: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, DEFAULT_USER_AGENT)
            .header(
                ACCEPT,
                "text/html,application/json;q=0.9,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url}: status {status}");
        }
        response
            .text()
            .await
            .with_context(|| format!("read body: {url}"))
    }
}
