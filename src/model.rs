use serde::{Deserialize, Serialize};

/// One reply in a thread snapshot. `no` is the only ordering and dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub no: u64,
    pub com: String,
    #[serde(default)]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_id: Option<String>,
}

impl Post {
    pub fn new(no: u64, com: impl Into<String>) -> Self {
        Self {
            no,
            com: com.into(),
            time: String::new(),
            poster_id: None,
        }
    }
}

/// A thread as seen in a single run. Never persisted as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: u64,
    pub title: String,
    pub url: String,
    pub board: String,
    pub posts: Vec<Post>,
    /// Unix seconds: thread creation time, or the snapshot time when unknown.
    pub timestamp: i64,
    #[serde(default)]
    pub summary: String,
}

/// One row of a board listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub thread_id: u64,
    pub title: String,
    pub url: String,
    /// Opening post text, when the listing exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedThread {
    pub thread_id: u64,
    pub title: String,
    pub url: String,
}

impl From<&CatalogEntry> for LocatedThread {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            thread_id: entry.thread_id,
            title: entry.title.clone(),
            url: entry.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedThread {
    pub posts: Vec<Post>,
    /// Creation time of the thread, when the source reports one.
    pub timestamp: Option<i64>,
    /// Address that actually served the snapshot, when it differs from the
    /// requested one (e.g. a mirror).
    pub served_from: Option<String>,
}
