//! Board sources: where catalogs and thread snapshots come from.
//!
//! A source answers two questions, "which threads are live on this board"
//! and "what posts does this thread have now". Everything stateful about
//! tracking lives above this trait.

use async_trait::async_trait;

use crate::model::{CatalogEntry, FetchedThread};

pub mod fivechan;
pub mod fourchan;

#[async_trait]
pub trait BoardSource: Send + Sync {
    /// Storage category and log label, e.g. `fourchan_explorer`.
    fn category(&self) -> &str;

    /// Human-readable board label for rendered output.
    fn board_label(&self, board: &str) -> String {
        format!("/{board}/")
    }

    /// Live threads on `board`, in listing order.
    async fn catalog(&self, board: &str) -> anyhow::Result<Vec<CatalogEntry>>;

    /// Full current post list of the thread at `url`. "No posts found" is an
    /// empty snapshot; only unrecoverable transport failure is an error.
    async fn fetch_posts(&self, board: &str, url: &str) -> anyhow::Result<FetchedThread>;
}
