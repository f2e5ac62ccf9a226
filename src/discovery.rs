//! Keyword discovery of threads nobody tracks yet.

use crate::model::{CatalogEntry, Thread};
use crate::source::BoardSource;

#[derive(Debug, Clone)]
pub struct DiscoveryQuery {
    pub boards: Vec<String>,
    pub keywords: Vec<String>,
    /// Total threads returned across all boards.
    pub quota: usize,
    /// Catalog entries examined per board.
    pub scan_limit: usize,
}

/// Fetches keyword-matching, untracked threads board by board until `quota`
/// threads are collected. Once the quota is reached no further requests are
/// made. Catalog and per-thread failures skip that board or candidate.
pub async fn discover(
    source: &dyn BoardSource,
    query: &DiscoveryQuery,
    tracked_names: &[String],
) -> Vec<Thread> {
    let keywords: Vec<String> = query.keywords.iter().map(|k| k.to_lowercase()).collect();
    let tracked: Vec<String> = tracked_names.iter().map(|n| n.to_lowercase()).collect();
    let mut found = Vec::new();

    for board in &query.boards {
        if found.len() >= query.quota {
            break;
        }

        let catalog = match source.catalog(board).await {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::warn!(board = %board, err = %format!("{err:#}"), "catalog unavailable; skipping board");
                continue;
            }
        };

        let before = found.len();
        for entry in catalog.iter().take(query.scan_limit) {
            if found.len() >= query.quota {
                break;
            }
            if !matches_keywords(entry, &keywords) || is_tracked(&entry.title, &tracked) {
                continue;
            }

            match source.fetch_posts(board, &entry.url).await {
                Ok(fetched) if fetched.posts.is_empty() => {
                    tracing::debug!(board = %board, url = %entry.url, "candidate has no posts; skipped");
                }
                Ok(fetched) => {
                    let now = chrono::Utc::now().timestamp();
                    found.push(Thread {
                        thread_id: entry.thread_id,
                        title: entry.title.clone(),
                        url: fetched.served_from.unwrap_or_else(|| entry.url.clone()),
                        board: board.clone(),
                        posts: fetched.posts,
                        timestamp: fetched.timestamp.or(entry.timestamp).unwrap_or(now),
                        summary: String::new(),
                    });
                }
                Err(err) => {
                    tracing::warn!(board = %board, url = %entry.url, err = %format!("{err:#}"), "candidate fetch failed; skipped");
                }
            }
        }
        tracing::info!(board = %board, discovered = found.len() - before, "board scanned");
    }

    found
}

fn matches_keywords(entry: &CatalogEntry, keywords: &[String]) -> bool {
    let title = entry.title.to_lowercase();
    let body = entry.body.as_deref().unwrap_or_default().to_lowercase();
    keywords
        .iter()
        .any(|keyword| title.contains(keyword.as_str()) || body.contains(keyword.as_str()))
}

/// Either direction, so a tracked "LLM General" excludes "LLM General #9"
/// and a tracked "/lmg/ - Local Models General ★3" excludes "/lmg/".
fn is_tracked(title: &str, tracked: &[String]) -> bool {
    let title = title.to_lowercase();
    tracked
        .iter()
        .any(|name| !name.is_empty() && (title.contains(name.as_str()) || name.contains(title.as_str())))
}
