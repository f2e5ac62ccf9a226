//! Equivalent hosts for a thread address.
//!
//! Some boards are served from several interchangeable hosts. When the
//! primary address fails, the same path is retried on each mirror. A host
//! that fails once is skipped for the rest of the run.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Context as _;
use url::Url;

use crate::http::Fetcher;

#[derive(Debug, Default)]
pub struct MirrorSet {
    hosts: Vec<String>,
    dead: Mutex<HashSet<String>>,
}

impl MirrorSet {
    pub fn new(hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            dead: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_dead(&self, host: &str) -> bool {
        let dead = self.dead.lock().unwrap_or_else(|err| err.into_inner());
        dead.contains(host)
    }

    pub fn mark_dead(&self, url: &str) {
        let Some(host) = host_of(url) else {
            return;
        };
        let mut dead = self.dead.lock().unwrap_or_else(|err| err.into_inner());
        if dead.insert(host.clone()) {
            tracing::debug!(host = %host, "host marked dead for this run");
        }
    }

    /// `url` rewritten onto every live mirror other than its own host.
    pub fn alternates(&self, url: &str) -> Vec<String> {
        let Ok(parsed) = Url::parse(url) else {
            return Vec::new();
        };
        let own_host = parsed.host_str().map(str::to_owned);

        self.hosts
            .iter()
            .filter(|host| own_host.as_deref() != Some(host.as_str()))
            .filter(|host| !self.is_dead(host))
            .filter_map(|host| {
                let mut alternate = parsed.clone();
                alternate.set_host(Some(host)).ok()?;
                Some(alternate.to_string())
            })
            .collect()
    }

    /// GETs `url`, falling back to its alternates in order. Returns the body
    /// and the address that served it.
    pub async fn get_text(&self, fetcher: &Fetcher, url: &str) -> anyhow::Result<(String, String)> {
        let primary_err = match fetcher.get_text(url).await {
            Ok(body) => return Ok((body, url.to_owned())),
            Err(err) => err,
        };
        tracing::warn!(url, err = %format!("{primary_err:#}"), "primary address failed; trying mirrors");
        self.mark_dead(url);

        for alternate in self.alternates(url) {
            match fetcher.get_text(&alternate).await {
                Ok(body) => {
                    tracing::info!(url = %alternate, "mirror served thread");
                    return Ok((body, alternate));
                }
                Err(err) => {
                    tracing::debug!(url = %alternate, ?err, "mirror failed");
                    self.mark_dead(&alternate);
                }
            }
        }

        Err(primary_err).context("all mirrors failed")
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_owned))
}
