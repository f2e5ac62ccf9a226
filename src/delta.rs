//! Post delta between a fetched snapshot and a stored watermark.
//!
//! The watermark advances to the highest `no` in the full snapshot, not just
//! the delta. Posts a source omits between two runs are therefore skipped for
//! good once a later post has been seen; this keeps re-fetch work bounded.
//!
//! A watermark belongs to one thread id. When the locator lands on a
//! different thread (the next part of a general), numbering restarts and the
//! old watermark no longer applies.

use crate::model::Post;

/// Posts newer than `last_post_no`, in fetch order. A missing watermark means
/// the thread was never consumed, so everything is new.
pub fn delta(fetched: &[Post], last_post_no: Option<u64>) -> Vec<Post> {
    match last_post_no {
        None => fetched.to_vec(),
        Some(watermark) => fetched
            .iter()
            .filter(|post| post.no > watermark)
            .cloned()
            .collect(),
    }
}

/// Watermark to compare a snapshot of `thread_id` against.
///
/// `None` when the stored watermark was taken on another thread. Records that
/// carry a watermark but no thread id keep it.
pub fn baseline(stored_thread_id: Option<u64>, stored_last_post_no: Option<u64>, thread_id: u64) -> Option<u64> {
    match stored_thread_id {
        Some(stored) if stored != thread_id => None,
        _ => stored_last_post_no,
    }
}

/// Highest `no` in the snapshot, never moving below `previous`.
pub fn advance_watermark(fetched: &[Post], previous: Option<u64>) -> Option<u64> {
    let fetched_max = fetched.iter().map(|post| post.no).max();
    match (fetched_max, previous) {
        (Some(max), Some(previous)) => Some(max.max(previous)),
        (max, previous) => max.or(previous),
    }
}
