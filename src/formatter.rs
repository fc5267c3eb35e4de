//! Markdown-subset formatter for assistant replies.
//!
//! Produces a tree of typed nodes instead of markup, so the renderer decides
//! how each piece is drawn and raw text is never interpreted.
//!
//! Block rules, one forward pass over the lines:
//! - a trimmed line starting with three backticks opens a fenced code block
//!   that runs to the next fence; with no closing fence the opening line is
//!   treated as ordinary text
//! - `# `, `## `, `### ` at the start of a line are headings (text verbatim)
//! - consecutive `- ` / `* ` lines form a bullet list
//! - consecutive `N. ` lines form a numbered list, renumbered from 1
//! - a blank line is a line break; anything else is a paragraph
//!
//! Inline passes run in a fixed order: code, `**bold**`, `__bold__`,
//! `*italic*`, `_italic_`, `[label](url)`. Each pass only looks at the plain
//! text left over by the earlier ones, so spans never nest.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const FENCE: &str = "```";

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s").expect("valid numbered list regex"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid code regex"));
static BOLD_STARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"));
static BOLD_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__([^_]+)__").expect("valid bold regex"));
static ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("valid italic regex"));
static ITALIC_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_([^_]+)_").expect("valid italic regex"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));

/// Inline span inside a paragraph or list item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Bold(String),
    Italic(String),
    /// Opens in a new context when activated
    Link { label: String, url: String },
}

/// Block-level node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode {
    Heading { level: u8, text: String },
    CodeBlock { language: Option<String>, lines: Vec<String> },
    BulletList(Vec<Vec<Inline>>),
    NumberedList(Vec<Vec<Inline>>),
    LineBreak,
    Paragraph(Vec<Inline>),
}

/// Format a block of text into render nodes. `""` yields a single `LineBreak`.
pub fn format(text: &str) -> Vec<RenderNode> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let mut nodes = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.starts_with(FENCE) {
            if let Some(close) = (i + 1..lines.len()).find(|&j| lines[j].trim().starts_with(FENCE)) {
                let language = trimmed[FENCE.len()..].trim();
                nodes.push(RenderNode::CodeBlock {
                    language: (!language.is_empty()).then(|| language.to_string()),
                    lines: lines[i + 1..close].iter().map(|l| l.to_string()).collect(),
                });
                i = close + 1;
                continue;
            }
            // unterminated: fall through and treat the fence as text
        }

        if let Some(heading) = heading(line) {
            nodes.push(heading);
            i += 1;
            continue;
        }

        if is_bullet(trimmed) {
            let mut items = Vec::new();
            while i < lines.len() && is_bullet(lines[i].trim()) {
                items.push(format_inline(&lines[i].trim()[2..]));
                i += 1;
            }
            nodes.push(RenderNode::BulletList(items));
            continue;
        }

        if NUMBERED_ITEM.is_match(trimmed) {
            let mut items = Vec::new();
            while i < lines.len() && NUMBERED_ITEM.is_match(lines[i].trim()) {
                let item = NUMBERED_ITEM.replace(lines[i].trim(), "");
                items.push(format_inline(&item));
                i += 1;
            }
            nodes.push(RenderNode::NumberedList(items));
            continue;
        }

        if trimmed.is_empty() {
            nodes.push(RenderNode::LineBreak);
        } else {
            nodes.push(RenderNode::Paragraph(format_inline(line)));
        }
        i += 1;
    }

    nodes
}

fn heading(line: &str) -> Option<RenderNode> {
    [("# ", 1), ("## ", 2), ("### ", 3)]
        .into_iter()
        .find_map(|(marker, level)| {
            line.strip_prefix(marker).map(|text| RenderNode::Heading {
                level,
                text: text.to_string(),
            })
        })
}

fn is_bullet(trimmed: &str) -> bool {
    trimmed.starts_with("- ") || trimmed.starts_with("* ")
}

/// Split a line into inline spans.
pub fn format_inline(text: &str) -> Vec<Inline> {
    let passes: [(&Regex, fn(&Captures) -> Inline); 6] = [
        (&*INLINE_CODE, |c| Inline::Code(c[1].to_string())),
        (&*BOLD_STARS, |c| Inline::Bold(c[1].to_string())),
        (&*BOLD_UNDERSCORES, |c| Inline::Bold(c[1].to_string())),
        (&*ITALIC_STAR, |c| Inline::Italic(c[1].to_string())),
        (&*ITALIC_UNDERSCORE, |c| Inline::Italic(c[1].to_string())),
        (&*LINK, |c| Inline::Link {
            label: c[1].to_string(),
            url: c[2].to_string(),
        }),
    ];

    let mut spans = vec![Inline::Text(text.to_string())];
    for (pattern, build) in passes {
        spans = apply_pass(spans, pattern, build);
    }
    spans
}

fn apply_pass(spans: Vec<Inline>, pattern: &Regex, build: fn(&Captures) -> Inline) -> Vec<Inline> {
    let mut out = Vec::with_capacity(spans.len());

    for span in spans {
        let Inline::Text(text) = span else {
            out.push(span);
            continue;
        };

        let mut last = 0;
        for captures in pattern.captures_iter(&text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            if whole.start() > last {
                out.push(Inline::Text(text[last..whole.start()].to_string()));
            }
            out.push(build(&captures));
            last = whole.end();
        }
        if last < text.len() {
            out.push(Inline::Text(text[last..].to_string()));
        }
    }

    out
}
