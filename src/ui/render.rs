//! Turns formatter output into styled terminal lines.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::formatter::{Inline, RenderNode};

/// Render nodes to lines; every piece of text is drawn literally.
pub fn render_nodes(nodes: &[RenderNode]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for node in nodes {
        match node {
            RenderNode::Heading { level, text } => {
                let style = match level {
                    1 => Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    2 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    _ => Style::default().add_modifier(Modifier::BOLD),
                };
                lines.push(Line::from(vec![Span::styled(text.clone(), style)]));
            }
            RenderNode::CodeBlock { language, lines: code } => {
                let frame = Style::default().fg(Color::DarkGray);
                let title = language.as_deref().unwrap_or("code");
                lines.push(Line::from(vec![Span::styled(format!("┌─ {title}"), frame)]));
                for code_line in code {
                    lines.push(Line::from(vec![
                        Span::styled("│ ", frame),
                        Span::styled(code_line.clone(), Style::default().fg(Color::LightYellow)),
                    ]));
                }
                lines.push(Line::from(vec![Span::styled("└─", frame)]));
            }
            RenderNode::BulletList(items) => {
                for item in items {
                    let mut spans = vec![Span::styled("  • ", Style::default().fg(Color::Green))];
                    spans.extend(render_inline(item));
                    lines.push(Line::from(spans));
                }
            }
            RenderNode::NumberedList(items) => {
                for (index, item) in items.iter().enumerate() {
                    let mut spans = vec![Span::styled(
                        format!("  {}. ", index + 1),
                        Style::default().fg(Color::Green),
                    )];
                    spans.extend(render_inline(item));
                    lines.push(Line::from(spans));
                }
            }
            RenderNode::LineBreak => lines.push(Line::default()),
            RenderNode::Paragraph(spans) => lines.push(Line::from(render_inline(spans))),
        }
    }

    lines
}

fn render_inline(spans: &[Inline]) -> Vec<Span<'static>> {
    let mut out = Vec::with_capacity(spans.len());

    for span in spans {
        match span {
            Inline::Text(text) => out.push(Span::raw(text.clone())),
            Inline::Code(code) => out.push(Span::styled(
                code.clone(),
                Style::default().fg(Color::LightBlue).bg(Color::DarkGray),
            )),
            Inline::Bold(text) => out.push(Span::styled(
                text.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Inline::Italic(text) => out.push(Span::styled(
                text.clone(),
                Style::default().add_modifier(Modifier::ITALIC),
            )),
            Inline::Link { label, url } => {
                out.push(Span::styled(
                    label.clone(),
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                ));
                out.push(Span::styled(
                    format!(" ({url})"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
    }

    out
}

/// Word-wrap a styled line to `width` columns, keeping span styles.
pub fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![line.clone()];
    }

    let mut wrapped: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;

    for span in &line.spans {
        for word in split_keeping_spaces(&span.content) {
            let mut word = word.to_string();
            let mut word_width = word.chars().count();

            if current_width + word_width > width && current_width > 0 {
                wrapped.push(finish_line(std::mem::take(&mut current)));
                current_width = 0;
                if word.trim().is_empty() {
                    continue;
                }
            }

            // Hard-split words longer than a full line
            while word_width > width {
                let head: String = word.chars().take(width).collect();
                let tail: String = word.chars().skip(width).collect();
                wrapped.push(Line::from(vec![Span::styled(head, span.style)]));
                word = tail;
                word_width = word.chars().count();
            }

            if !word.is_empty() {
                current_width += word_width;
                current.push(Span::styled(word, span.style));
            }
        }
    }

    if !current.is_empty() || wrapped.is_empty() {
        wrapped.push(finish_line(current));
    }

    wrapped
}

fn finish_line(mut spans: Vec<Span<'static>>) -> Line<'static> {
    while spans.last().is_some_and(|span| span.content.trim().is_empty()) {
        spans.pop();
    }
    Line::from(spans)
}

/// Split text into alternating runs of non-whitespace and whitespace.
fn split_keeping_spaces(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (index, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match in_space {
            Some(previous) if previous != is_space => {
                pieces.push(&text[start..index]);
                start = index;
            }
            _ => {}
        }
        in_space = Some(is_space);
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

/// Concatenate the text of rendered lines, one per row.
pub fn to_plain_text(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::format;

    fn plain(text: &str) -> String {
        to_plain_text(&render_nodes(&format(text)))
    }

    #[test]
    fn numbered_lists_are_renumbered() {
        assert_eq!(plain("5. a\n9. b"), "  1. a\n  2. b");
    }

    #[test]
    fn bullets_and_links() {
        assert_eq!(plain("- see [docs](http://x)"), "  • see docs (http://x)");
    }

    #[test]
    fn code_block_is_framed() {
        assert_eq!(plain("```sh\nls -la\n```"), "┌─ sh\n│ ls -la\n└─");
    }

    #[test]
    fn inline_styles_are_applied() {
        let lines = render_nodes(&format("**b** *i*"));
        let spans = &lines[0].spans;
        assert!(spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(spans[2].style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        let line = Line::from("alpha beta gamma");
        let wrapped = wrap_line(&line, 11);
        assert_eq!(to_plain_text(&wrapped), "alpha beta\ngamma");
    }

    #[test]
    fn wrap_hard_splits_long_words() {
        let line = Line::from("abcdefghij");
        let wrapped = wrap_line(&line, 4);
        assert_eq!(to_plain_text(&wrapped), "abcd\nefgh\nij");
    }

    #[test]
    fn wrap_keeps_empty_lines() {
        let wrapped = wrap_line(&Line::default(), 10);
        assert_eq!(wrapped.len(), 1);
    }
}
