use crate::ui::conversation::commands::{
    CommandEntry, ParsedCommand, command_entries, parse_slash_command,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// Text being edited; `cursor` is a byte offset on a char boundary
#[derive(Debug, Clone, Default)]
struct TextAreaState {
    content: String,
    cursor: usize,
}

/// Multi-line input box with a slash-command palette
pub struct ConversationComposer {
    state: TextAreaState,
    title: String,
    placeholder: String,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new(title: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            state: TextAreaState::default(),
            title: title.into(),
            placeholder: placeholder.into(),
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                    self.insert_char('\n');
                } else {
                    if let Some(entry) = self.selected_entry() {
                        // Commands that need an argument are completed, not run
                        if entry.command.takes_argument() {
                            self.apply_selected_command();
                            return ComposerResult::None;
                        }
                        self.state.content = format!("/{}", entry.keyword);
                    }
                    let content = std::mem::take(&mut self.state.content);
                    self.state.cursor = 0;
                    self.close_command_palette();
                    return match parse_slash_command(&content) {
                        Some(command) => ComposerResult::Command(command),
                        None => ComposerResult::Submitted(content),
                    };
                }
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Esc if self.show_command_palette => self.close_command_palette(),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_char(c);
                self.sync_command_palette();
            }
            KeyCode::Backspace => {
                if self.backspace() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Delete => {
                if self.delete() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Left => {
                if let Some(prev) = self.prev_boundary() {
                    self.state.cursor = prev;
                }
            }
            KeyCode::Right => {
                if let Some(next) = self.next_boundary() {
                    self.state.cursor = next;
                }
            }
            KeyCode::Home => self.state.cursor = 0,
            KeyCode::End => self.state.cursor = self.state.content.len(),
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor
    pub fn paste(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n");
        self.state.content.insert_str(self.state.cursor, &text);
        self.state.cursor += text.len();
        self.sync_command_palette();
    }

    fn insert_char(&mut self, c: char) {
        self.state.content.insert(self.state.cursor, c);
        self.state.cursor += c.len_utf8();
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        match self.prev_boundary() {
            Some(prev) => {
                self.state.content.replace_range(prev..self.state.cursor, "");
                self.state.cursor = prev;
                true
            }
            None => false,
        }
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        match self.next_boundary() {
            Some(next) => {
                self.state.content.replace_range(self.state.cursor..next, "");
                true
            }
            None => false,
        }
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.state.content[..self.state.cursor]
            .char_indices()
            .next_back()
            .map(|(index, _)| index)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.state.content[self.state.cursor..]
            .chars()
            .next()
            .map(|c| self.state.cursor + c.len_utf8())
    }

    /// Open, refresh or close the palette to match the current content
    fn sync_command_palette(&mut self) {
        let content = &self.state.content;
        let typing_command = content.starts_with('/') && !content.contains(char::is_whitespace);

        if typing_command {
            if !self.show_command_palette {
                self.show_command_palette = true;
                self.selected_command = Some(0);
            }
            self.refresh_command_palette();
        } else if self.show_command_palette {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.state.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        if self.filtered_commands.is_empty() {
            self.selected_command = None;
        } else {
            let index = self.selected_command.unwrap_or(0);
            self.selected_command = Some(index.min(self.filtered_commands.len() - 1));
        }
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        self.selected_command = Some((current + delta).rem_euclid(len) as usize);
    }

    fn selected_entry(&self) -> Option<CommandEntry> {
        if !self.show_command_palette {
            return None;
        }
        self.selected_command
            .and_then(|index| self.filtered_commands.get(index))
            .copied()
    }

    fn apply_selected_command(&mut self) -> bool {
        let Some(entry) = self.selected_entry() else {
            return false;
        };

        self.state.content = format!("/{} ", entry.keyword);
        self.state.cursor = self.state.content.len();
        self.close_command_palette();
        true
    }

    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.placeholder = placeholder.into();
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }

    /// Replace the content, e.g. to give back text from a rejected send
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.state.content = content.into();
        self.state.cursor = self.state.content.len();
        self.close_command_palette();
    }

    pub fn clear(&mut self) {
        self.set_content(String::new());
    }

    /// Rows needed to show the content, clamped to a sensible box size
    pub fn desired_height(&self) -> u16 {
        let rows = self.state.content.split('\n').count().clamp(1, 6) as u16;
        rows + 2
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title.as_str())
            .style(Style::default().fg(Color::Green));

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = self.state.content.clone();
            content.insert(self.state.cursor.min(content.len()), '▌');

            // Keep the cursor row visible when the text is taller than the box
            let rows: Vec<&str> = content.split('\n').collect();
            let cursor_row = content[..self.state.cursor.min(content.len())]
                .matches('\n')
                .count();
            let height = inner_area.height as usize;
            let first = (cursor_row + 1).saturating_sub(height);

            for (i, row) in rows.iter().skip(first).take(height).enumerate() {
                let line = Line::from(vec![Span::styled(*row, Style::default().fg(Color::White))]);
                buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
            }
        }

        if self.show_command_palette && !self.filtered_commands.is_empty() {
            let palette_height = (self.filtered_commands.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: area.x,
                y: area.y.saturating_sub(palette_height),
                width: area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            Clear.render(palette_area, buf);
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in self.filtered_commands.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if self.selected_command == Some(index) {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled(" — ", Style::default().fg(Color::DarkGray)),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::conversation::commands::SlashCommand;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_submits_and_clears() {
        let mut composer = ConversationComposer::new("t", "p");
        type_text(&mut composer, "héllo");
        assert_eq!(
            composer.handle_key(key(KeyCode::Enter)),
            ComposerResult::Submitted("héllo".to_string())
        );
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn alt_enter_inserts_newline() {
        let mut composer = ConversationComposer::new("t", "p");
        type_text(&mut composer, "a");
        composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        type_text(&mut composer, "b");
        assert_eq!(composer.content(), "a\nb");
    }

    #[test]
    fn editing_respects_multibyte_characters() {
        let mut composer = ConversationComposer::new("t", "p");
        type_text(&mut composer, "añb");
        composer.handle_key(key(KeyCode::Left));
        composer.handle_key(key(KeyCode::Backspace));
        assert_eq!(composer.content(), "ab");
        composer.handle_key(key(KeyCode::Home));
        composer.handle_key(key(KeyCode::Delete));
        assert_eq!(composer.content(), "b");
    }

    #[test]
    fn slash_input_becomes_command() {
        let mut composer = ConversationComposer::new("t", "p");
        type_text(&mut composer, "/attach a.pdf");
        match composer.handle_key(key(KeyCode::Enter)) {
            ComposerResult::Command(parsed) => {
                assert_eq!(parsed.command, SlashCommand::Attach);
                assert_eq!(parsed.argument(), Some("a.pdf"));
            }
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn text_after_plain_command_is_sent_as_message() {
        let mut composer = ConversationComposer::new("t", "p");
        type_text(&mut composer, "/new idea");
        assert_eq!(
            composer.handle_key(key(KeyCode::Enter)),
            ComposerResult::Submitted("/new idea".to_string())
        );
    }

    #[test]
    fn renders_cursor_inside_content() {
        let mut composer = ConversationComposer::new("t", "p");
        type_text(&mut composer, "ab");
        composer.handle_key(key(KeyCode::Left));

        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        (&composer).render(area, &mut buf);

        let row: String = (1..4).map(|x| buf.get(x, 1).symbol().to_string()).collect();
        assert_eq!(row, "a▌b");
    }

    #[test]
    fn palette_completes_selected_command() {
        let mut composer = ConversationComposer::new("t", "p");
        type_text(&mut composer, "/he");
        assert_eq!(composer.handle_key(key(KeyCode::Tab)), ComposerResult::None);
        assert_eq!(composer.content(), "/help ");
    }

    #[test]
    fn enter_in_palette_runs_selected_command() {
        let mut composer = ConversationComposer::new("t", "p");
        type_text(&mut composer, "/ne");
        match composer.handle_key(key(KeyCode::Enter)) {
            ComposerResult::Command(parsed) => assert_eq!(parsed.command, SlashCommand::New),
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn enter_in_palette_completes_attach() {
        let mut composer = ConversationComposer::new("t", "p");
        type_text(&mut composer, "/att");
        assert_eq!(composer.handle_key(key(KeyCode::Enter)), ComposerResult::None);
        assert_eq!(composer.content(), "/attach ");
    }

    #[test]
    fn paste_inserts_at_cursor() {
        let mut composer = ConversationComposer::new("t", "p");
        type_text(&mut composer, "ac");
        composer.handle_key(key(KeyCode::Left));
        composer.paste("b\r\nb");
        assert_eq!(composer.content(), "ab\nbc");
    }
}
