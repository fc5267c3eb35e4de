//! Conversation history display component

use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget,
    },
};

use crate::events::{Message, Role};
use crate::formatter;
use crate::ui::conversation::indicator::TypingIndicator;
use crate::ui::render::{render_nodes, wrap_line};

const ATTACHMENT_NOTE: &str = "(1 PDF file uploaded)";
const INDENT: &str = "  ";

/// Read-only view over the conversation log
pub struct HistoryView<'a> {
    messages: &'a [Message],
    assistant_name: &'a str,
    show_timestamps: bool,
    typing: Option<&'a TypingIndicator>,
    scroll: usize,
}

impl<'a> HistoryView<'a> {
    pub fn new(messages: &'a [Message], assistant_name: &'a str) -> Self {
        Self {
            messages,
            assistant_name,
            show_timestamps: true,
            typing: None,
            scroll: 0,
        }
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    /// Show the typing indicator below the last message
    pub fn typing(mut self, indicator: Option<&'a TypingIndicator>) -> Self {
        self.typing = indicator;
        self
    }

    /// Lines scrolled up from the bottom
    pub fn scroll(mut self, lines_from_bottom: usize) -> Self {
        self.scroll = lines_from_bottom;
        self
    }

    /// All rows for the given content width, already wrapped
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        if self.messages.is_empty() && self.typing.is_none() {
            return welcome_lines();
        }

        let content_width = (width as usize).saturating_sub(INDENT.len());
        let mut all_lines = Vec::new();

        for message in self.messages {
            all_lines.push(self.header_line(message));
            for line in self.body_lines(message) {
                for wrapped in wrap_line(&line, content_width) {
                    let mut spans = vec![Span::raw(INDENT)];
                    spans.extend(wrapped.spans);
                    all_lines.push(Line::from(spans));
                }
            }
            // spacing between messages
            all_lines.push(Line::default());
        }

        if let Some(indicator) = self.typing {
            all_lines.push(indicator.line(self.assistant_name));
        }

        all_lines
    }

    /// Largest useful scroll offset for an inner area of this size
    pub fn max_scroll(&self, width: u16, height: u16) -> usize {
        self.lines(width).len().saturating_sub(height as usize)
    }

    fn header_line(&self, message: &Message) -> Line<'static> {
        let (icon, label, color) = match message.role() {
            Role::User => ("👤", Role::User.display_name().to_string(), Color::Blue),
            Role::Assistant => ("🤖", self.assistant_name.to_string(), Color::Green),
        };

        let mut spans = vec![Span::styled(
            format!("{icon} {label}"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )];
        if self.show_timestamps {
            let time = message.timestamp().with_timezone(&Local).format("%H:%M:%S");
            spans.push(Span::styled(
                format!("  {time}"),
                Style::default().fg(Color::DarkGray),
            ));
        }

        Line::from(spans)
    }

    fn body_lines(&self, message: &Message) -> Vec<Line<'static>> {
        match message.role() {
            // User text is shown as typed
            Role::User => {
                let mut lines: Vec<Line<'static>> = Vec::new();
                if !message.display_content().is_empty() {
                    lines.extend(
                        message
                            .display_content()
                            .split('\n')
                            .map(|row| Line::from(row.to_string())),
                    );
                }
                if message.has_attachment() {
                    lines.push(Line::from(vec![Span::styled(
                        format!("📎 {ATTACHMENT_NOTE}"),
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::ITALIC),
                    )]));
                }
                lines
            }
            Role::Assistant => render_nodes(&formatter::format(message.display_content())),
        }
    }
}

fn welcome_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(vec![Span::styled(
            "Welcome to MaverickBot",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )]),
        Line::default(),
        Line::from(vec![Span::styled(
            "Ask anything below. Attach a PDF with /attach <path> to ask about its contents.",
            Style::default().fg(Color::Gray),
        )]),
        Line::default(),
        Line::from(vec![Span::styled(
            "Enter sends, Alt+Enter adds a new line, /help lists commands.",
            Style::default().fg(Color::DarkGray),
        )]),
    ]
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Conversation");

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = self.lines(inner_area.width);
        let height = inner_area.height as usize;
        let max_scroll = all_lines.len().saturating_sub(height);
        let scroll = self.scroll.min(max_scroll);
        let start = max_scroll - scroll;

        for (i, line) in all_lines.iter().skip(start).take(height).enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }

        if max_scroll > 0 {
            let mut state = ScrollbarState::new(max_scroll).position(start);
            Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .render(area, buf, &mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MessageId;
    use crate::ui::render::to_plain_text;

    fn view_text(view: &HistoryView<'_>, width: u16) -> String {
        to_plain_text(&view.lines(width))
    }

    #[test]
    fn empty_history_shows_welcome() {
        let view = HistoryView::new(&[], "Gemini");
        assert!(view_text(&view, 80).starts_with("Welcome to MaverickBot"));
    }

    #[test]
    fn user_text_is_not_formatted() {
        let messages = vec![Message::new(MessageId(0), Role::User, "**raw** <b>", "**raw** <b>")];
        let view = HistoryView::new(&messages, "Gemini").show_timestamps(false);
        assert_eq!(view_text(&view, 80), "👤 You\n  **raw** <b>\n");
    }

    #[test]
    fn attachment_note_follows_user_text() {
        let messages = vec![Message::new(MessageId(0), Role::User, "summary?", "summary?\n\npdf")];
        let view = HistoryView::new(&messages, "Gemini").show_timestamps(false);
        assert_eq!(
            view_text(&view, 80),
            "👤 You\n  summary?\n  📎 (1 PDF file uploaded)\n"
        );
    }

    #[test]
    fn assistant_text_goes_through_formatter() {
        let messages = vec![Message::new(MessageId(1), Role::Assistant, "- **a**", "- **a**")];
        let view = HistoryView::new(&messages, "Gemini").show_timestamps(false);
        assert_eq!(view_text(&view, 80), "🤖 Gemini\n    • a\n");
    }

    #[test]
    fn typing_indicator_is_last() {
        let messages = vec![Message::new(MessageId(0), Role::User, "hi", "hi")];
        let indicator = TypingIndicator::new();
        let view = HistoryView::new(&messages, "Gemini")
            .show_timestamps(false)
            .typing(Some(&indicator));
        let text = view_text(&view, 80);
        assert!(text.ends_with("🤖 Gemini is thinking.  "));
    }

    #[test]
    fn long_lines_wrap_inside_indent() {
        let messages = vec![Message::new(MessageId(0), Role::User, "alpha beta", "alpha beta")];
        let view = HistoryView::new(&messages, "Gemini").show_timestamps(false);
        assert_eq!(view_text(&view, 8), "👤 You\n  alpha\n  beta\n");
        assert_eq!(view.max_scroll(8, 2), 2);
    }

    #[test]
    fn render_shows_latest_lines() {
        let messages: Vec<Message> = (0..10)
            .map(|i| Message::new(MessageId(i), Role::User, format!("m{i}"), format!("m{i}")))
            .collect();
        let view = HistoryView::new(&messages, "Gemini").show_timestamps(false);
        let area = Rect::new(0, 0, 20, 5);
        let mut buf = Buffer::empty(area);
        view.render(area, &mut buf);

        let row: String = (1..19).map(|x| buf.get(x, 2).symbol().to_string()).collect();
        assert!(row.contains("m9"));
    }
}
