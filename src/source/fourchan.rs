//! 4chan read-only JSON API.

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Deserialize;

use crate::html;
use crate::http::Fetcher;
use crate::model::{CatalogEntry, FetchedThread, Post};
use crate::source::BoardSource;

pub const CATEGORY: &str = "fourchan_explorer";
pub const DEFAULT_API_BASE: &str = "https://a.4cdn.org";
pub const DEFAULT_BOARDS_BASE: &str = "https://boards.4chan.org";

#[derive(Debug, Clone)]
pub struct FourChanSource {
    fetcher: Fetcher,
    api_base: String,
    boards_base: String,
}

impl FourChanSource {
    pub fn new(fetcher: Fetcher, api_base: &str, boards_base: &str) -> Self {
        Self {
            fetcher,
            api_base: api_base.trim_end_matches('/').to_owned(),
            boards_base: boards_base.trim_end_matches('/').to_owned(),
        }
    }

    pub fn thread_url(&self, board: &str, thread_id: u64) -> String {
        format!("{}/{board}/thread/{thread_id}", self.boards_base)
    }

    fn catalog_endpoint(&self, board: &str) -> String {
        format!("{}/{board}/catalog.json", self.api_base)
    }

    fn thread_endpoint(&self, board: &str, thread_id: u64) -> String {
        format!("{}/{board}/thread/{thread_id}.json", self.api_base)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogPage {
    #[serde(default)]
    threads: Vec<CatalogThread>,
}

#[derive(Debug, Deserialize)]
struct CatalogThread {
    no: u64,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    com: Option<String>,
    #[serde(default)]
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    #[serde(default)]
    posts: Vec<ApiPost>,
}

#[derive(Debug, Deserialize)]
struct ApiPost {
    no: u64,
    #[serde(default)]
    com: Option<String>,
    #[serde(default)]
    now: Option<String>,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    id: Option<String>,
}

#[async_trait]
impl BoardSource for FourChanSource {
    fn category(&self) -> &str {
        CATEGORY
    }

    async fn catalog(&self, board: &str) -> anyhow::Result<Vec<CatalogEntry>> {
        let endpoint = self.catalog_endpoint(board);
        let body = self.fetcher.get_text(&endpoint).await?;
        let pages: Vec<CatalogPage> = serde_json::from_str(&body)
            .with_context(|| format!("parse catalog json: {endpoint}"))?;

        let entries = pages
            .into_iter()
            .flat_map(|page| page.threads)
            .map(|thread| {
                let title = thread
                    .sub
                    .as_deref()
                    .map(html::to_text)
                    .filter(|sub| !sub.is_empty())
                    .unwrap_or_else(|| format!("Untitled Thread {}", thread.no));
                CatalogEntry {
                    thread_id: thread.no,
                    title,
                    url: self.thread_url(board, thread.no),
                    body: thread.com.as_deref().map(html::to_text),
                    timestamp: thread.time,
                }
            })
            .collect();
        Ok(entries)
    }

    async fn fetch_posts(&self, board: &str, url: &str) -> anyhow::Result<FetchedThread> {
        let thread_id = thread_id_from_url(url)
            .with_context(|| format!("thread url has no numeric id: {url}"))?;
        let endpoint = self.thread_endpoint(board, thread_id);
        let body = self.fetcher.get_text(&endpoint).await?;
        let response: ThreadResponse = serde_json::from_str(&body)
            .with_context(|| format!("parse thread json: {endpoint}"))?;

        let timestamp = response.posts.first().and_then(|op| op.time);
        let posts = response
            .posts
            .into_iter()
            .map(|post| Post {
                no: post.no,
                com: post.com.as_deref().map(html::to_text).unwrap_or_default(),
                time: post
                    .now
                    .or_else(|| post.time.map(|time| time.to_string()))
                    .unwrap_or_default(),
                poster_id: post.id,
            })
            .collect();

        Ok(FetchedThread {
            posts,
            timestamp,
            served_from: None,
        })
    }
}

/// Last all-digit path segment, e.g. `.../g/thread/123456` or `.../123456.json`.
pub fn thread_id_from_url(url: &str) -> Option<u64> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .map(|segment| segment.trim_end_matches(".json"))
        .find(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|segment| segment.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_id_is_taken_from_the_last_numeric_segment() {
        assert_eq!(
            thread_id_from_url("https://boards.4chan.org/g/thread/101234567"),
            Some(101234567)
        );
        assert_eq!(
            thread_id_from_url("https://boards.4chan.org/g/thread/55/llm-general#p60"),
            Some(55)
        );
        assert_eq!(thread_id_from_url("https://a.4cdn.org/g/thread/7.json"), Some(7));
        assert_eq!(thread_id_from_url("https://boards.4chan.org/g/"), None);
    }
}
