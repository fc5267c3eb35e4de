use std::cell::Cell;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::attachment::{Attachment, TextExtractor, compose};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::error::ExtractionError;
use crate::events::AppEvent;
use crate::llm::Generator;
use crate::ui::conversation::{
    ComposerResult, ConversationComposer, HistoryView, ParsedCommand, SlashCommand,
    TypingIndicator, get_help_text,
};

const NOTICE_TTL: Duration = Duration::from_secs(4);
const PAGE_SIZE: usize = 10;
const PLACEHOLDER_WITH_PDF: &str = "Add a message or send the PDF content...";

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoticeLevel {
    Info,
    Error,
}

/// Short-lived status message shown above the composer
#[derive(Debug, Clone)]
struct Notice {
    text: String,
    level: NoticeLevel,
    expires_at: Instant,
}

/// Owns the conversation and wires the chat widgets to it
pub struct ConversationManager {
    conversation: Conversation,
    generator: Arc<dyn Generator>,
    extractor: Arc<dyn TextExtractor>,
    composer: ConversationComposer,
    indicator: TypingIndicator,
    attachment: Option<Attachment>,
    extracting: Option<String>,
    extraction_ticket: u64,
    notice: Option<Notice>,
    show_help: bool,
    scroll: usize,
    max_scroll: Cell<usize>,
    model: String,
    assistant_name: String,
    show_timestamps: bool,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl ConversationManager {
    pub fn new(
        config: &Config,
        generator: Arc<dyn Generator>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let assistant_name = config.ui.assistant_name.clone();

        let mut manager = Self {
            conversation: Conversation::new(),
            generator,
            extractor,
            composer: ConversationComposer::new(
                format!("Message {assistant_name}"),
                format!("Message {assistant_name}..."),
            ),
            indicator: TypingIndicator::new(),
            attachment: None,
            extracting: None,
            extraction_ticket: 0,
            notice: None,
            show_help: false,
            scroll: 0,
            max_scroll: Cell::new(0),
            model: config.model.clone(),
            assistant_name,
            show_timestamps: config.ui.show_timestamps,
            events_tx,
            events_rx,
        };

        if !config.has_api_key() {
            manager.set_notice(
                NoticeLevel::Error,
                "No API key: set GEMINI_API_KEY or api_key in config.toml".to_string(),
            );
        }
        manager
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if self.show_help {
            self.show_help = false;
            return ConversationAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return ConversationAction::Exit,
            KeyCode::Char('n') if ctrl => {
                self.new_chat();
                return ConversationAction::None;
            }
            KeyCode::PageUp => {
                self.scroll = (self.scroll + PAGE_SIZE).min(self.max_scroll.get());
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_sub(PAGE_SIZE);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => {
                self.submit(text);
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        if !self.show_help {
            self.composer.paste(text);
        }
    }

    /// Animation step plus draining finished background work
    pub fn on_tick(&mut self) {
        if self.conversation.is_busy() {
            self.indicator.tick();
        }
        if self
            .notice
            .as_ref()
            .is_some_and(|notice| Instant::now() >= notice.expires_at)
        {
            self.notice = None;
        }
        self.poll_background();
    }

    /// Apply every result that background tasks have delivered so far
    pub fn poll_background(&mut self) {
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => self.handle_app_event(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                // The manager keeps a sender, so this never happens in practice
                Err(mpsc::error::TryRecvError::Disconnected) => break,
            }
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ReplyReady { generation, result } => {
                if self.conversation.complete(generation, result) {
                    self.scroll = 0;
                }
            }
            AppEvent::AttachmentReady { ticket, result } => {
                if ticket != self.extraction_ticket {
                    debug!(ticket, current = self.extraction_ticket, "discarding stale PDF");
                    return;
                }
                self.extracting = None;
                match result {
                    Ok(attachment) => {
                        info!(file = %attachment.file_name, chars = attachment.text.len(), "PDF attached");
                        self.set_notice(
                            NoticeLevel::Info,
                            format!("Attached {}", attachment.file_name),
                        );
                        self.attachment = Some(attachment);
                        self.composer.set_placeholder(PLACEHOLDER_WITH_PDF);
                    }
                    Err(err) => {
                        warn!(error = %err, "PDF extraction failed");
                        self.set_notice(NoticeLevel::Error, err.to_string());
                    }
                }
            }
        }
    }

    /// Validate and hand the message to the controller; on refusal the typed
    /// text goes back into the composer.
    fn submit(&mut self, text: String) {
        if let Some(file) = &self.extracting {
            let notice = format!("Parsing PDF {file}... please wait");
            self.reject(text, notice);
            return;
        }

        let outgoing = compose(&text, self.attachment.as_ref());
        if let Err(err) = outgoing.validate() {
            self.reject(text, err.to_string());
            return;
        }

        let pending = match self.conversation.begin_send(&outgoing.display, &outgoing.api) {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                self.reject(text, "Please wait for the current reply".to_string());
                return;
            }
            Err(err) => {
                self.reject(text, err.to_string());
                return;
            }
        };

        self.attachment = None;
        self.reset_placeholder();
        self.indicator.reset();
        self.scroll = 0;

        let (generation, history) = pending.into_parts();
        let generator = Arc::clone(&self.generator);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = generator.generate(&history).await;
            if tx.send(AppEvent::ReplyReady { generation, result }).is_err() {
                debug!(generation, "reply dropped: UI closed");
            }
        });
    }

    fn reject(&mut self, text: String, notice: String) {
        self.composer.set_content(text);
        self.set_notice(NoticeLevel::Error, notice);
    }

    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        if self.conversation.is_busy() && !command.command.available_while_busy() {
            self.set_notice(
                NoticeLevel::Error,
                format!("/{} is not available while waiting for a reply", command.command.command()),
            );
            return ConversationAction::None;
        }

        match command.command {
            SlashCommand::New => self.new_chat(),
            SlashCommand::Attach => match command.argument() {
                Some(path) => self.start_attach(expand_home(path)),
                None => self.set_notice(NoticeLevel::Error, "Usage: /attach <path to PDF>".to_string()),
            },
            SlashCommand::Detach => {
                let cancelled = self.cancel_extraction();
                match self.attachment.take() {
                    Some(attachment) => {
                        self.reset_placeholder();
                        self.set_notice(NoticeLevel::Info, format!("Removed {}", attachment.file_name));
                    }
                    None if cancelled => {
                        self.set_notice(NoticeLevel::Info, "PDF parsing cancelled".to_string());
                    }
                    None => self.set_notice(NoticeLevel::Info, "No PDF attached".to_string()),
                }
            }
            SlashCommand::Help => self.show_help = true,
            SlashCommand::Quit => return ConversationAction::Exit,
        }

        ConversationAction::None
    }

    /// Start a fresh chat; a reply still in flight is ignored when it lands
    fn new_chat(&mut self) {
        self.conversation.reset();
        self.attachment = None;
        self.cancel_extraction();
        self.composer.clear();
        self.reset_placeholder();
        self.scroll = 0;
        self.set_notice(NoticeLevel::Info, "Started a new chat".to_string());
    }

    fn start_attach(&mut self, path: PathBuf) {
        if self.extracting.is_some() {
            self.set_notice(NoticeLevel::Error, "Already parsing a PDF".to_string());
            return;
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.set_notice(NoticeLevel::Info, format!("Parsing PDF {file_name}..."));
        self.extracting = Some(file_name);
        self.extraction_ticket += 1;
        let ticket = self.extraction_ticket;

        let extractor = Arc::clone(&self.extractor);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || Attachment::load(extractor.as_ref(), &path))
                .await
                .unwrap_or_else(|err| Err(ExtractionError::Parse(format!("extraction task failed: {err}"))));
            let _ = tx.send(AppEvent::AttachmentReady { ticket, result });
        });
    }

    /// Forget any extraction in flight; its result is dropped when it lands
    fn cancel_extraction(&mut self) -> bool {
        let cancelled = self.extracting.take().is_some();
        if cancelled {
            self.extraction_ticket += 1;
        }
        cancelled
    }

    fn reset_placeholder(&mut self) {
        let placeholder = format!("Message {}...", self.assistant_name);
        self.composer.set_placeholder(placeholder);
    }

    fn set_notice(&mut self, level: NoticeLevel, text: String) {
        self.notice = Some(Notice {
            text,
            level,
            expires_at: Instant::now() + NOTICE_TTL,
        });
    }

    fn status_line(&self) -> Line<'static> {
        if let Some(notice) = &self.notice {
            let color = match notice.level {
                NoticeLevel::Info => Color::Cyan,
                NoticeLevel::Error => Color::Red,
            };
            return Line::from(vec![Span::styled(
                notice.text.clone(),
                Style::default().fg(color),
            )]);
        }

        if let Some(file) = &self.extracting {
            return Line::from(vec![Span::styled(
                format!("Parsing PDF {file}..."),
                Style::default().fg(Color::Yellow),
            )]);
        }

        if let Some(attachment) = &self.attachment {
            return Line::from(vec![
                Span::styled("📎 ", Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!("{} attached (/detach to remove)", attachment.file_name),
                    Style::default().fg(Color::Gray),
                ),
            ]);
        }

        Line::from(vec![Span::styled(
            "Enter send · Alt+Enter new line · /help commands · Ctrl+C quit",
            Style::default().fg(Color::DarkGray),
        )])
    }

    fn header_line(&self) -> Line<'static> {
        let count = self.conversation.messages().len();
        Line::from(vec![
            Span::styled(
                "MaverickBot",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {}", self.model), Style::default().fg(Color::Gray)),
            Span::styled(
                format!("  {count} message{}", if count == 1 { "" } else { "s" }),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    }
}

impl Widget for &ConversationManager {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),                              // Header
                Constraint::Min(5),                                 // History
                Constraint::Length(1),                              // Status
                Constraint::Length(self.composer.desired_height()), // Composer
            ])
            .split(area);

        buf.set_line(chunks[0].x, chunks[0].y, &self.header_line(), chunks[0].width);

        let busy = self.conversation.is_busy();
        let history = HistoryView::new(self.conversation.messages(), &self.assistant_name)
            .show_timestamps(self.show_timestamps)
            .typing(busy.then_some(&self.indicator))
            .scroll(self.scroll);
        let inner_width = chunks[1].width.saturating_sub(2);
        let inner_height = chunks[1].height.saturating_sub(2);
        self.max_scroll.set(history.max_scroll(inner_width, inner_height));
        history.render(chunks[1], buf);

        buf.set_line(chunks[2].x, chunks[2].y, &self.status_line(), chunks[2].width);

        self.composer.render(chunks[3], buf);

        if self.show_help {
            let help_area = centered(area, 70, 14);
            Clear.render(help_area, buf);
            Paragraph::new(get_help_text())
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Help (any key to close)")
                        .style(Style::default().fg(Color::Cyan)),
                )
                .render(help_area, buf);
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
