//! Durable tracked-thread state.
//!
//! The store file is `{"threads": [...]}`, one record per logical thread
//! name. Operators add records (name + board); runs fill in and advance the
//! volatile fields. Loading never fails: a missing or corrupt file is an
//! empty store, and a bad record only affects itself.

use std::path::Path;

use anyhow::Context as _;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedThread {
    pub name: String,
    pub board: String,
    pub thread_id: Option<u64>,
    pub url: Option<String>,
    pub last_post_no: Option<u64>,
    pub last_update: Option<DateTime<Utc>>,
}

impl TrackedThread {
    /// A record as an operator declares it: never located yet.
    pub fn new(name: impl Into<String>, board: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            board: board.into(),
            thread_id: None,
            url: None,
            last_post_no: None,
            last_update: None,
        }
    }

    pub fn is_located(&self) -> bool {
        self.thread_id.is_some() && self.url.is_some() && self.last_post_no.is_some()
    }

    /// Some volatile fields set and others not, which only a hand-edited
    /// store produces. Such records are kept as written.
    pub fn is_partially_located(&self) -> bool {
        let set = [
            self.thread_id.is_some(),
            self.url.is_some(),
            self.last_post_no.is_some(),
        ];
        set.contains(&true) && set.contains(&false)
    }
}

/// Returns `record` with its volatile fields replaced and `last_update`
/// stamped. The caller puts the result back into the store.
pub fn update(
    record: &TrackedThread,
    thread_id: u64,
    url: &str,
    last_post_no: u64,
    now: DateTime<Utc>,
) -> TrackedThread {
    TrackedThread {
        name: record.name.clone(),
        board: record.board.clone(),
        thread_id: Some(thread_id),
        url: Some(url.to_owned()),
        last_post_no: Some(last_post_no),
        last_update: Some(now),
    }
}

/// Tracked records keyed by name, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedThreads {
    entries: Vec<TrackedThread>,
}

impl TrackedThreads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TrackedThread> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedThread> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    /// Inserts `record`, replacing any entry with the same name in place.
    pub fn insert(&mut self, record: TrackedThread) {
        match self.entries.iter_mut().find(|entry| entry.name == record.name) {
            Some(existing) => *existing = record,
            None => self.entries.push(record),
        }
    }

    /// Adds an operator-declared entry unless one with that name exists.
    /// Returns whether a new entry was added.
    pub fn seed(&mut self, name: &str, board: &str) -> bool {
        if self.get(name).is_some() {
            return false;
        }
        self.entries.push(TrackedThread::new(name, board));
        true
    }
}

impl FromIterator<TrackedThread> for TrackedThreads {
    fn from_iter<I: IntoIterator<Item = TrackedThread>>(iter: I) -> Self {
        let mut threads = Self::new();
        for record in iter {
            threads.insert(record);
        }
        threads
    }
}

#[derive(Debug, Serialize)]
struct StoreFile<'a> {
    threads: &'a [TrackedThread],
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    name: String,
    board: String,
    #[serde(default)]
    thread_id: Option<u64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    last_post_no: Option<u64>,
    #[serde(default)]
    last_update: Option<String>,
}

pub async fn load(path: &Path) -> TrackedThreads {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no tracked thread store yet");
            return TrackedThreads::new();
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), ?err, "read tracked thread store; starting empty");
            return TrackedThreads::new();
        }
    };

    match parse_store(&bytes) {
        Ok(threads) => threads,
        Err(err) => {
            tracing::warn!(path = %path.display(), ?err, "parse tracked thread store; starting empty");
            TrackedThreads::new()
        }
    }
}

fn parse_store(bytes: &[u8]) -> anyhow::Result<TrackedThreads> {
    let value: serde_json::Value = serde_json::from_slice(bytes).context("parse store json")?;
    let records = match value.get("threads") {
        None | Some(serde_json::Value::Null) => return Ok(TrackedThreads::new()),
        Some(serde_json::Value::Array(records)) => records,
        Some(_) => anyhow::bail!("`threads` must be an array"),
    };

    let mut threads = TrackedThreads::new();
    for (index, record) in records.iter().enumerate() {
        let raw: RawRecord = match serde_json::from_value(record.clone()) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(index, %err, "skip malformed tracked thread record");
                continue;
            }
        };

        let last_update = raw.last_update.as_deref().and_then(|text| {
            let parsed = parse_timestamp(text);
            if parsed.is_none() {
                tracing::warn!(name = %raw.name, last_update = text, "ignore malformed last_update");
            }
            parsed
        });

        let record = TrackedThread {
            name: raw.name,
            board: raw.board,
            thread_id: raw.thread_id,
            url: raw.url,
            last_post_no: raw.last_post_no,
            last_update,
        };
        if record.is_partially_located() {
            tracing::warn!(
                name = %record.name,
                thread_id = ?record.thread_id,
                url = ?record.url,
                last_post_no = ?record.last_post_no,
                "tracked thread record is partially located"
            );
        }
        threads.insert(record);
    }
    Ok(threads)
}

/// RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub async fn save(threads: &TrackedThreads, path: &Path) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create store dir: {}", parent.display()))?;

    let file = StoreFile {
        threads: &threads.entries,
    };
    let data = serde_json::to_vec_pretty(&file).context("serialize tracked threads")?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[tokio::test]
    async fn missing_file_loads_as_empty_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let threads = load(&temp.path().join("absent.json")).await;
        assert!(threads.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty_store() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("tracked.json");
        std::fs::write(&path, "{not json")?;
        assert!(load(&path).await.is_empty());
        Ok(())
    }

    #[test]
    fn partially_located_records_are_kept_as_written() -> anyhow::Result<()> {
        let json = r#"{"threads": [
            {"name": "watermark only", "board": "g", "last_post_no": 100},
            {"name": "id only", "board": "g", "thread_id": 7},
            {"name": "declared", "board": "g"},
            {"name": "located", "board": "g", "thread_id": 7, "url": "https://x/7", "last_post_no": 3}
        ]}"#;
        let threads = parse_store(json.as_bytes())?;
        assert_eq!(threads.len(), 4);

        let watermark_only = threads.get("watermark only").unwrap();
        assert!(watermark_only.is_partially_located());
        assert_eq!(watermark_only.thread_id, None);
        assert_eq!(watermark_only.last_post_no, Some(100));

        assert!(threads.get("id only").unwrap().is_partially_located());
        assert!(!threads.get("declared").unwrap().is_partially_located());
        assert!(!threads.get("located").unwrap().is_partially_located());
        Ok(())
    }

    #[test]
    fn bad_record_does_not_abort_the_rest() -> anyhow::Result<()> {
        let json = r#"{"threads": [
            {"name": "aicg", "board": "g", "last_update": "yesterday-ish"},
            {"board": "g"},
            {"name": "ldg", "board": "g", "thread_id": 7, "url": "https://x/7",
             "last_post_no": 70, "last_update": "2025-03-01T12:34:56.123456"}
        ]}"#;
        let threads = parse_store(json.as_bytes())?;

        assert_eq!(threads.names(), vec!["aicg", "ldg"]);
        assert_eq!(threads.get("aicg").and_then(|t| t.last_update), None);
        let ldg = threads.get("ldg").expect("ldg record");
        assert_eq!(ldg.last_post_no, Some(70));
        assert!(ldg.last_update.is_some());
        Ok(())
    }

    #[test]
    fn update_sets_volatile_fields_and_stamps_time() {
        let record = TrackedThread::new("LLM General", "g");
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

        let updated = update(&record, 555, "https://boards/g/thread/555", 105, now);

        assert!(updated.is_located());
        assert_eq!(updated.name, "LLM General");
        assert_eq!(updated.thread_id, Some(555));
        assert_eq!(updated.last_post_no, Some(105));
        assert_eq!(updated.last_update, Some(now));
        assert!(!record.is_located());
    }

    #[test]
    fn seed_keeps_existing_entries() {
        let mut threads = TrackedThreads::new();
        threads.insert(update(
            &TrackedThread::new("aicg", "g"),
            1,
            "u",
            10,
            Utc::now(),
        ));

        assert!(!threads.seed("aicg", "vg"));
        assert!(threads.seed("ldg", "g"));
        assert_eq!(threads.get("aicg").map(|t| t.board.as_str()), Some("g"));
        assert_eq!(threads.names(), vec!["aicg", "ldg"]);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("nested").join("dir").join("tracked.json");

        let mut threads = TrackedThreads::new();
        threads.seed("never located", "g");
        threads.insert(update(
            &TrackedThread::new("LLM General", "g"),
            555,
            "https://boards.example/g/thread/555",
            105,
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        ));

        save(&threads, &path).await?;
        let loaded = load(&path).await;
        assert_eq!(loaded, threads);

        save(&loaded, &path).await?;
        assert_eq!(load(&path).await, threads);
        Ok(())
    }
}
