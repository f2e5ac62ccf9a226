//! Tolerant HTML scanning for board pages.
//!
//! Board markup changes without notice, so nothing here builds a DOM. Each
//! helper scans for one flat shape (a link, a `<div>` block, a `<p>` line)
//! and callers layer fallbacks on top. Text content goes through `html2md`,
//! which owns entity decoding and block layout.

use std::sync::LazyLock;

use regex::Regex;

static MARKUP_OR_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>|\r?\n").expect("markup regex"));
static BLOCK_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^</(?:p|div)\s*>$").expect("block end regex"));
static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:a|abbr|b|big|code|em|font|i|mark|pre|s|small|span|strong|sub|sup|u|wbr)\b[^>]*>",
    )
    .expect("inline tag regex")
});
static MARKDOWN_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([[:punct:]])").expect("markdown escape regex"));
static SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("script regex")
});
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#)
        .expect("link regex")
});
static DIV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<div\b([^>]*)>|</div\s*>").expect("div tag regex"));
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").expect("paragraph regex"));
static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*["']([^"']*)["']"#).expect("class attribute regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub classes: Vec<String>,
    pub inner_html: String,
    /// Byte range of the whole element in the scanned document.
    pub span: (usize, usize),
}

impl Block {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn text(&self) -> String {
        to_text(&self.inner_html)
    }
}

/// Every `<a href>` in document order, with its text content.
pub fn links(html: &str) -> Vec<Link> {
    LINK.captures_iter(html)
        .map(|caps| Link {
            href: decode_entities(&caps[1]),
            text: to_text(&caps[2]),
        })
        .collect()
}

/// Every `<div>` element in document order, matched against its balancing
/// close tag. An unclosed div runs to the end of the document.
pub fn div_blocks(html: &str) -> Vec<Block> {
    let tags: Vec<regex::Captures<'_>> = DIV_TAG.captures_iter(html).collect();
    let mut blocks = Vec::new();

    for (index, open) in tags.iter().enumerate() {
        let Some(attrs) = open.get(1) else {
            continue;
        };
        let whole = open.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();

        let mut depth = 1usize;
        let mut close = None;
        for tag in &tags[index + 1..] {
            let Some(m) = tag.get(0) else { continue };
            if tag.get(1).is_some() {
                depth += 1;
            } else {
                depth -= 1;
                if depth == 0 {
                    close = Some((m.start(), m.end()));
                    break;
                }
            }
        }
        let (inner_end, outer_end) = close.unwrap_or((html.len(), html.len()));

        blocks.push(Block {
            classes: CLASS_ATTR
                .captures(attrs.as_str())
                .map(|class| class[1].split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default(),
            inner_html: html[whole.1..inner_end].to_owned(),
            span: (whole.0, outer_end),
        });
    }
    blocks
}

/// Blocks matching `pick`, minus any that contain another picked block, so
/// list wrappers whose class also matches are dropped.
pub fn innermost_blocks(html: &str, pick: impl Fn(&Block) -> bool) -> Vec<Block> {
    let picked: Vec<Block> = div_blocks(html).into_iter().filter(|b| pick(b)).collect();
    picked
        .iter()
        .filter(|outer| {
            !picked.iter().any(|inner| {
                inner.span != outer.span
                    && inner.span.0 >= outer.span.0
                    && inner.span.1 <= outer.span.1
            })
        })
        .cloned()
        .collect()
}

/// Inner HTML of every `<p>` element.
pub fn paragraphs(html: &str) -> Vec<String> {
    PARAGRAPH
        .captures_iter(html)
        .map(|caps| caps[1].to_owned())
        .collect()
}

/// Text content: line breaks kept (markup and source newlines alike),
/// entities decoded, whitespace runs collapsed within each line.
///
/// Inline formatting and links are unwrapped before conversion so the result
/// is plain text rather than Markdown.
pub fn to_text(html: &str) -> String {
    let without_scripts = SCRIPT.replace_all(html, "");
    let unwrapped = INLINE_TAG.replace_all(&without_scripts, "");
    let with_breaks = MARKUP_OR_NEWLINE.replace_all(&unwrapped, |caps: &regex::Captures<'_>| {
        let token = &caps[0];
        if !token.starts_with('<') {
            "<br>".to_owned()
        } else if BLOCK_END.is_match(token) {
            format!("{token}<br>")
        } else {
            token.to_owned()
        }
    });

    plain_text(&html2md::parse_html(&with_breaks))
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Character references in tag-free text such as attribute values.
fn decode_entities(text: &str) -> String {
    plain_text(&html2md::parse_html(&text.replace('<', "&lt;")))
        .trim()
        .to_owned()
}

/// Drops the backslash escapes html2md puts in front of Markdown syntax.
fn plain_text(markdown: &str) -> String {
    MARKDOWN_ESCAPE.replace_all(markdown, "$1").into_owned()
}
