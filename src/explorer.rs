//! One collection run over a single source.
//!
//! Tracked threads first, then keyword discovery, then a single save of the
//! tracked-thread store. Every per-thread failure is absorbed here; the
//! worst case for a run is an empty output and an unchanged store.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::delta;
use crate::discovery::{self, DiscoveryQuery};
use crate::locator;
use crate::model::Thread;
use crate::source::BoardSource;
use crate::tracked::{self, TrackedThread, TrackedThreads};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    ProcessingTracked,
    Discovering,
    Persisting,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub tracked_total: usize,
    pub tracked_located: usize,
    pub tracked_with_new_posts: usize,
    pub discovered: usize,
    pub persisted: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    /// Tracked threads (new posts only) followed by discovered threads.
    pub threads: Vec<Thread>,
    pub store: TrackedThreads,
    pub report: RunReport,
}

pub struct Explorer {
    source: Arc<dyn BoardSource>,
    discovery: DiscoveryQuery,
    store_path: PathBuf,
    phase: RunPhase,
}

impl Explorer {
    pub fn new(source: Arc<dyn BoardSource>, discovery: DiscoveryQuery, store_path: PathBuf) -> Self {
        Self {
            source,
            discovery,
            store_path,
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub async fn run(&mut self, store: TrackedThreads) -> RunOutcome {
        let mut report = RunReport {
            tracked_total: store.len(),
            ..RunReport::default()
        };

        self.enter(RunPhase::ProcessingTracked);
        let mut next_store = TrackedThreads::new();
        let mut threads = Vec::new();
        for record in store.iter() {
            let (record, thread, located) = self.process_tracked(record).await;
            if located {
                report.tracked_located += 1;
            }
            if let Some(thread) = thread {
                report.tracked_with_new_posts += 1;
                threads.push(thread);
            }
            next_store.insert(record);
        }

        self.enter(RunPhase::Discovering);
        let tracked_names = next_store.names();
        let discovered =
            discovery::discover(self.source.as_ref(), &self.discovery, &tracked_names).await;
        report.discovered = discovered.len();
        threads.extend(discovered);

        self.enter(RunPhase::Persisting);
        match tracked::save(&next_store, &self.store_path).await {
            Ok(()) => report.persisted = true,
            Err(err) => tracing::error!(
                path = %self.store_path.display(),
                err = %format!("{err:#}"),
                "failed to persist tracked threads"
            ),
        }

        self.enter(RunPhase::Done);
        tracing::info!(
            category = self.source.category(),
            tracked = report.tracked_total,
            located = report.tracked_located,
            with_new_posts = report.tracked_with_new_posts,
            discovered = report.discovered,
            "run finished"
        );

        RunOutcome {
            threads,
            store: next_store,
            report,
        }
    }

    /// Returns the (possibly updated) record, the thread to emit if it has
    /// new posts, and whether the thread was located at all.
    async fn process_tracked(&self, record: &TrackedThread) -> (TrackedThread, Option<Thread>, bool) {
        let name = record.name.as_str();
        let board = record.board.as_str();

        let Some(located) = locator::locate(self.source.as_ref(), board, name).await else {
            return (record.clone(), None, false);
        };

        let fetched = match self.source.fetch_posts(board, &located.url).await {
            Ok(fetched) => fetched,
            Err(err) => {
                tracing::warn!(name, url = %located.url, err = %format!("{err:#}"), "tracked thread fetch failed");
                return (record.clone(), None, true);
            }
        };
        if fetched.posts.is_empty() {
            tracing::info!(name, url = %located.url, "tracked thread returned no posts; unchanged");
            return (record.clone(), None, true);
        }

        let baseline = delta::baseline(record.thread_id, record.last_post_no, located.thread_id);
        if baseline.is_none() && record.last_post_no.is_some() {
            tracing::info!(
                name,
                previous = ?record.thread_id,
                thread_id = located.thread_id,
                "tracked thread rolled over; starting from the new thread"
            );
        }
        let new_posts = delta::delta(&fetched.posts, baseline);
        let Some(watermark) = delta::advance_watermark(&fetched.posts, baseline) else {
            return (record.clone(), None, true);
        };
        let url = fetched.served_from.clone().unwrap_or_else(|| located.url.clone());
        let updated = tracked::update(record, located.thread_id, &url, watermark, Utc::now());

        tracing::info!(
            name,
            thread_id = located.thread_id,
            new_posts = new_posts.len(),
            last_post_no = watermark,
            "tracked thread processed"
        );
        if new_posts.is_empty() {
            return (updated, None, true);
        }

        let thread = Thread {
            thread_id: located.thread_id,
            title: located.title,
            url,
            board: board.to_owned(),
            posts: new_posts,
            timestamp: fetched.timestamp.unwrap_or_else(|| Utc::now().timestamp()),
            summary: String::new(),
        };
        (updated, Some(thread), true)
    }

    fn enter(&mut self, phase: RunPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "run phase");
        self.phase = phase;
    }
}
