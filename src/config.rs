use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::discovery::DiscoveryQuery;
use crate::source::{fivechan, fourchan};

/// Whole-file configuration. Every table and field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the Markdown documents and default store files.
    pub data_dir: PathBuf,
    pub fourchan: FourChanConfig,
    pub fivechan: FiveChanConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            fourchan: FourChanConfig::default(),
            fivechan: FiveChanConfig::default(),
        }
    }
}

/// An operator-declared thread to follow across runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackedSeed {
    pub name: String,
    pub board: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FourChanConfig {
    pub boards: Vec<String>,
    pub keywords: Vec<String>,
    /// Discovered threads per run, across all boards.
    pub thread_limit: usize,
    /// Catalog entries examined per board during discovery.
    pub scan_limit: usize,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub store_path: Option<PathBuf>,
    pub api_base: String,
    pub boards_base: String,
    pub tracked: Vec<TrackedSeed>,
}

impl Default for FourChanConfig {
    fn default() -> Self {
        Self {
            boards: strings(&["g", "sci", "biz", "pol"]),
            keywords: strings(&[
                "ai",
                "artificial intelligence",
                "machine learning",
                "ml",
                "deep learning",
                "neural network",
                "gpt",
                "llm",
                "chatgpt",
                "claude",
                "gemini",
                "grok",
                "anthropic",
                "openai",
                "stable diffusion",
                "dalle",
                "midjourney",
            ]),
            thread_limit: 5,
            scan_limit: default_scan_limit(),
            request_delay_ms: 1000,
            timeout_secs: default_timeout_secs(),
            store_path: None,
            api_base: fourchan::DEFAULT_API_BASE.to_owned(),
            boards_base: fourchan::DEFAULT_BOARDS_BASE.to_owned(),
            tracked: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiveChanConfig {
    pub boards: Vec<String>,
    /// Display names used in headings, keyed by board id.
    pub board_labels: BTreeMap<String, String>,
    pub keywords: Vec<String>,
    pub thread_limit: usize,
    pub scan_limit: usize,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub store_path: Option<PathBuf>,
    pub menu_url: String,
    pub mirrors: Vec<String>,
    pub tracked: Vec<TrackedSeed>,
}

impl Default for FiveChanConfig {
    fn default() -> Self {
        Self {
            boards: strings(&["ai", "prog", "software"]),
            board_labels: [
                ("ai", "AI"),
                ("prog", "プログラム技術"),
                ("software", "ソフトウェア"),
            ]
            .into_iter()
            .map(|(id, label)| (id.to_owned(), label.to_owned()))
            .collect(),
            keywords: strings(&[
                "ai",
                "人工知能",
                "機械学習",
                "ディープラーニング",
                "ニューラルネットワーク",
                "gpt",
                "llm",
                "chatgpt",
                "claude",
                "gemini",
                "grok",
                "anthropic",
                "openai",
                "stable diffusion",
                "stablediffusion",
                "midjourney",
                "自然言語処理",
                "大規模言語モデル",
                "生成ai",
                "画像生成",
                "deepmind",
                "comfyui",
            ]),
            thread_limit: 5,
            scan_limit: default_scan_limit(),
            request_delay_ms: 2000,
            timeout_secs: default_timeout_secs(),
            store_path: None,
            menu_url: fivechan::DEFAULT_MENU_URL.to_owned(),
            mirrors: strings(fivechan::DEFAULT_MIRRORS),
            tracked: Vec::new(),
        }
    }
}

fn default_scan_limit() -> usize {
    50
}

fn default_timeout_secs() -> u64 {
    15
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

/// The settings both sources share, resolved against the data dir.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub category: &'static str,
    pub discovery: DiscoveryQuery,
    pub request_delay: Duration,
    pub timeout: Duration,
    pub store_path: PathBuf,
    pub tracked: Vec<TrackedSeed>,
}

impl Config {
    pub fn fourchan_settings(&self) -> SourceSettings {
        let c = &self.fourchan;
        SourceSettings {
            category: fourchan::CATEGORY,
            discovery: DiscoveryQuery {
                boards: c.boards.clone(),
                keywords: c.keywords.clone(),
                quota: c.thread_limit,
                scan_limit: c.scan_limit,
            },
            request_delay: Duration::from_millis(c.request_delay_ms),
            timeout: Duration::from_secs(c.timeout_secs),
            store_path: self.store_path(c.store_path.as_deref(), fourchan::CATEGORY),
            tracked: c.tracked.clone(),
        }
    }

    pub fn fivechan_settings(&self) -> SourceSettings {
        let c = &self.fivechan;
        SourceSettings {
            category: fivechan::CATEGORY,
            discovery: DiscoveryQuery {
                boards: c.boards.clone(),
                keywords: c.keywords.clone(),
                quota: c.thread_limit,
                scan_limit: c.scan_limit,
            },
            request_delay: Duration::from_millis(c.request_delay_ms),
            timeout: Duration::from_secs(c.timeout_secs),
            store_path: self.store_path(c.store_path.as_deref(), fivechan::CATEGORY),
            tracked: c.tracked.clone(),
        }
    }

    fn store_path(&self, configured: Option<&Path>, category: &str) -> PathBuf {
        configured
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.data_dir.join(category).join("tracked_threads.json"))
    }
}

/// Reads `path`, or the defaults when it does not exist.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "config file not found; using defaults");
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parse config file: {}", path.display()))
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(content).context("decode toml")?;
    validate("fourchan", config.fourchan.scan_limit, config.fourchan.timeout_secs, &config.fourchan.tracked)?;
    validate("fivechan", config.fivechan.scan_limit, config.fivechan.timeout_secs, &config.fivechan.tracked)?;
    for mirror in &config.fivechan.mirrors {
        if mirror.is_empty() || mirror.contains('/') {
            anyhow::bail!("fivechan.mirrors entries must be bare host names: {mirror:?}");
        }
    }
    Ok(config)
}

fn validate(table: &str, scan_limit: usize, timeout_secs: u64, tracked: &[TrackedSeed]) -> anyhow::Result<()> {
    if scan_limit == 0 {
        anyhow::bail!("{table}.scan_limit must be > 0");
    }
    if timeout_secs == 0 {
        anyhow::bail!("{table}.timeout_secs must be > 0");
    }
    for seed in tracked {
        if seed.name.trim().is_empty() || seed.board.trim().is_empty() {
            anyhow::bail!("{table}.tracked entries need a non-empty name and board");
        }
    }
    Ok(())
}
