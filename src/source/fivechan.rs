//! 5ch-style HTML boards.
//!
//! Board URLs are resolved through the board menu page, thread lists come
//! from the board page, and thread pages are parsed with a chain of
//! structural strategies because the markup changes without notice.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{LazyLock, Mutex};

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDateTime, TimeZone as _};
use regex::Regex;
use url::Url;

use crate::html;
use crate::http::Fetcher;
use crate::mirrors::MirrorSet;
use crate::model::{CatalogEntry, FetchedThread, Post};
use crate::source::BoardSource;

pub const CATEGORY: &str = "fivechan_explorer";
pub const DEFAULT_MENU_URL: &str = "https://menu.5ch.net/bbsmenu.html";
pub const DEFAULT_MIRRORS: &[&str] = &[
    "mevius.5ch.net",
    "egg.5ch.net",
    "medaka.5ch.net",
    "hayabusa9.5ch.net",
    "mi.5ch.net",
    "lavender.5ch.net",
    "eagle.5ch.net",
    "rosie.5ch.net",
    "fate.5ch.net",
];

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("number regex"));
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)").expect("leading number regex"));
static POST_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}/\d{2}/\d{2}(?:\([^)]*\))? \d{2}:\d{2}:\d{2}(?:\.\d+)?").expect("date regex")
});
static POSTER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ID:([A-Za-z0-9+/.]+)").expect("poster id regex"));
static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*(\d+)\s*[:：]\s*(.*)$").expect("numbered line regex"));
static LINE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(\d+)\s*[:：]").expect("line marker regex"));
static WEEKDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("weekday regex"));

pub struct FiveChanSource {
    fetcher: Fetcher,
    menu_url: String,
    board_labels: BTreeMap<String, String>,
    mirrors: MirrorSet,
    board_urls: Mutex<HashMap<String, String>>,
}

impl FiveChanSource {
    pub fn new(
        fetcher: Fetcher,
        menu_url: &str,
        board_labels: BTreeMap<String, String>,
        mirrors: MirrorSet,
    ) -> Self {
        Self {
            fetcher,
            menu_url: menu_url.to_owned(),
            board_labels,
            mirrors,
            board_urls: Mutex::new(HashMap::new()),
        }
    }

    /// Board page URL from the menu, cached for the run.
    async fn board_url(&self, board: &str) -> anyhow::Result<String> {
        if let Some(url) = self
            .board_urls
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .get(board)
        {
            return Ok(url.clone());
        }

        let menu = self
            .fetcher
            .get_text(&self.menu_url)
            .await
            .context("fetch board menu")?;
        let url = find_board_url(&menu, &self.menu_url, board)
            .with_context(|| format!("board /{board}/ not found in menu"))?;
        tracing::debug!(board, url = %url, "resolved board url");

        self.board_urls
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .insert(board.to_owned(), url.clone());
        Ok(url)
    }
}

#[async_trait]
impl BoardSource for FiveChanSource {
    fn category(&self) -> &str {
        CATEGORY
    }

    fn board_label(&self, board: &str) -> String {
        match self.board_labels.get(board) {
            Some(label) => format!("{label} (/{board}/)"),
            None => format!("/{board}/"),
        }
    }

    async fn catalog(&self, board: &str) -> anyhow::Result<Vec<CatalogEntry>> {
        let board_url = self.board_url(board).await?;
        let page = self
            .fetcher
            .get_text(&board_url)
            .await
            .context("fetch board page")?;
        Ok(parse_thread_list(&page, &board_url))
    }

    async fn fetch_posts(&self, _board: &str, url: &str) -> anyhow::Result<FetchedThread> {
        let (page, served_from) = self.mirrors.get_text(&self.fetcher, url).await?;
        let posts = parse_posts(&page);
        if posts.is_empty() {
            tracing::warn!(url = %served_from, "no posts recognized in thread page");
        }
        let timestamp = posts.first().and_then(|op| parse_post_time(&op.time));

        Ok(FetchedThread {
            posts,
            timestamp,
            served_from: (served_from != url).then_some(served_from),
        })
    }
}

/// First menu link under `/{board}/` that is a board page, not a document.
fn find_board_url(menu_html: &str, menu_url: &str, board: &str) -> Option<String> {
    let needle = format!("/{board}/");
    html::links(menu_html)
        .into_iter()
        .find(|link| link.href.contains(&needle) && !link.href.ends_with(".html"))
        .and_then(|link| resolve(menu_url, &link.href))
}

/// Thread links on a board page. Links wrapped in `<p>` are preferred; when
/// there are none, every `read.cgi` link on the page counts.
pub fn parse_thread_list(page_html: &str, board_url: &str) -> Vec<CatalogEntry> {
    let is_thread_link = |link: &html::Link| {
        resolve(board_url, &link.href).is_some_and(|url| url.contains("/test/read.cgi/"))
    };

    let mut links: Vec<html::Link> = html::paragraphs(page_html)
        .iter()
        .filter_map(|paragraph| html::links(paragraph).into_iter().next())
        .filter(|link| is_thread_link(link))
        .collect();
    if links.is_empty() {
        links = html::links(page_html)
            .into_iter()
            .filter(|link| is_thread_link(link))
            .collect();
    }

    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter_map(|link| {
            let absolute = resolve(board_url, &link.href)?;
            let (thread_url, thread_id) = canonical_thread_url(&absolute)?;
            seen.insert(thread_id).then(|| CatalogEntry {
                thread_id,
                title: link.text.trim().to_owned(),
                url: thread_url,
                body: None,
                timestamp: None,
            })
        })
        .collect()
}

/// `https://host/test/read.cgi/{board}/{id}/` and the id, dropping view
/// suffixes such as `l50`.
pub fn canonical_thread_url(url: &str) -> Option<(String, u64)> {
    let mut parsed = Url::parse(url).ok()?;
    let segments: Vec<String> = parsed.path_segments()?.map(str::to_owned).collect();
    let at = segments.iter().position(|segment| segment == "read.cgi")?;
    let board = segments.get(at + 1)?;
    let thread_id: u64 = segments.get(at + 2)?.parse().ok()?;

    let id_segment = thread_id.to_string();
    let mut kept: Vec<&str> = segments[..=at].iter().map(String::as_str).collect();
    kept.push(board);
    kept.push(&id_segment);
    parsed.set_path(&format!("/{}/", kept.join("/")));
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some((parsed.to_string(), thread_id))
}

fn resolve(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(|url| url.to_string())
}

/// Posts from a thread page: the first strategy that yields anything wins.
pub fn parse_posts(page_html: &str) -> Vec<Post> {
    let strategies: [(&str, fn(&str) -> Vec<Post>); 4] = [
        ("reshead/resbody", posts_from_res_pairs),
        ("post blocks", posts_from_post_blocks),
        ("numbered paragraphs", posts_from_paragraphs),
        ("numbered text lines", posts_from_text_lines),
    ];

    for (name, strategy) in strategies {
        let posts = dedup_by_no(strategy(page_html));
        if !posts.is_empty() {
            tracing::debug!(strategy = name, posts = posts.len(), "parsed thread page");
            return posts;
        }
    }
    Vec::new()
}

fn posts_from_res_pairs(page_html: &str) -> Vec<Post> {
    let blocks = html::div_blocks(page_html);
    let heads: Vec<&html::Block> = blocks.iter().filter(|b| b.has_class("reshead")).collect();
    let bodies: Vec<&html::Block> = blocks.iter().filter(|b| b.has_class("resbody")).collect();
    if heads.is_empty() || heads.len() != bodies.len() {
        return Vec::new();
    }

    heads
        .iter()
        .zip(bodies.iter())
        .filter_map(|(head, body)| {
            let header = head.text();
            let Some(no) = FIRST_NUMBER.find(&header).and_then(|m| m.as_str().parse().ok()) else {
                tracing::debug!(header = %header, "res header without a post number; skipped");
                return None;
            };
            Some(Post {
                no,
                com: body.text(),
                time: find_date(&header),
                poster_id: find_poster_id(&header),
            })
        })
        .collect()
}

/// Post-classed blocks whose text starts with the post number. Blocks
/// without one (forms, ads, wrappers) are not posts.
fn posts_from_post_blocks(page_html: &str) -> Vec<Post> {
    html::innermost_blocks(page_html, |block| {
        block.classes.iter().any(|class| class.contains("post"))
    })
    .iter()
    .filter_map(|block| {
        let text = block.text();
        let caps = LEADING_NUMBER.captures(&text)?;
        let no = caps[1].parse().ok()?;
        let content = text[caps.get(0)?.end()..].trim().to_owned();
        Some(Post {
            no,
            time: find_date(&content),
            poster_id: find_poster_id(&content),
            com: content,
        })
    })
    .collect()
}

fn posts_from_paragraphs(page_html: &str) -> Vec<Post> {
    html::paragraphs(page_html)
        .iter()
        .filter_map(|paragraph| {
            let text = html::to_text(paragraph);
            let caps = NUMBERED_LINE.captures(&text)?;
            Some(Post {
                no: caps[1].parse().ok()?,
                com: caps[2].trim().to_owned(),
                time: String::new(),
                poster_id: None,
            })
        })
        .collect()
}

fn posts_from_text_lines(page_html: &str) -> Vec<Post> {
    let text = html::to_text(page_html);
    let markers: Vec<(u64, usize, usize)> = LINE_MARKER
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((caps[1].parse().ok()?, whole.start(), whole.end()))
        })
        .collect();

    markers
        .iter()
        .enumerate()
        .map(|(index, (no, _, content_start))| {
            let content_end = markers
                .get(index + 1)
                .map_or(text.len(), |(_, next_start, _)| *next_start);
            Post {
                no: *no,
                com: text[*content_start..content_end].trim().to_owned(),
                time: String::new(),
                poster_id: None,
            }
        })
        .collect()
}

fn dedup_by_no(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts.into_iter().filter(|post| seen.insert(post.no)).collect()
}

fn find_date(text: &str) -> String {
    POST_DATE
        .find(text)
        .map(|m| m.as_str().to_owned())
        .unwrap_or_default()
}

fn find_poster_id(text: &str) -> Option<String> {
    POSTER_ID.captures(text).map(|caps| caps[1].to_owned())
}

/// `2025/03/01(土) 12:34:56.78` in JST, as unix seconds.
pub fn parse_post_time(time: &str) -> Option<i64> {
    let cleaned = WEEKDAY.replace_all(time, "");
    let cleaned = cleaned.split('.').next()?.trim();
    let naive = NaiveDateTime::parse_from_str(cleaned, "%Y/%m/%d %H:%M:%S").ok()?;
    let jst = FixedOffset::east_opt(9 * 3600)?;
    jst.from_local_datetime(&naive)
        .single()
        .map(|time| time.timestamp())
}
