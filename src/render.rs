use chrono::{DateTime, NaiveDate};

use crate::model::Thread;

/// Fixed text of one source's daily document.
#[derive(Debug, Clone, Copy)]
pub struct DocumentStyle<'a> {
    /// e.g. "4chan AI threads"
    pub heading: &'a str,
    /// Link text under each thread title, e.g. "4chan link".
    pub link_text: &'a str,
}

/// Markdown for one run: a section per board in first-seen order, a
/// subsection per thread in output order.
pub fn render_markdown(
    style: DocumentStyle<'_>,
    date: NaiveDate,
    threads: &[Thread],
    board_label: impl Fn(&str) -> String,
) -> String {
    let mut boards: Vec<(&str, Vec<&Thread>)> = Vec::new();
    for thread in threads {
        match boards.iter_mut().find(|(board, _)| *board == thread.board) {
            Some((_, group)) => group.push(thread),
            None => boards.push((thread.board.as_str(), vec![thread])),
        }
    }

    let mut out = format!("# {} ({})\n\n", style.heading, date.format("%Y-%m-%d"));
    for (board, group) in boards {
        out.push_str(&format!("## {}\n\n", board_label(board)));
        for thread in group {
            out.push_str(&format!("### {}\n", thread.title));
            out.push_str(&format!("[{}]({})\n\n", style.link_text, thread.url));
            out.push_str(&format!("Created: {}\n\n", format_timestamp(thread.timestamp)));
            out.push_str(&format!("**Summary**:\n{}\n\n", thread.summary));
            out.push_str("---\n\n");
        }
    }
    out
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
