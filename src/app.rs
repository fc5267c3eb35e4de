use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::attachment::{PdfExtractor, TextExtractor};
use crate::config::Config;
use crate::events::TuiEvent;
use crate::llm::{GeminiClient, Generator};
use crate::tui::{self, EventHandler, Tui};
use crate::ui::conversation::{ConversationAction, ConversationManager};

/// Run the interactive chat until the user quits
pub async fn run(config: Config) -> Result<()> {
    let generator: Arc<dyn Generator> =
        Arc::new(GeminiClient::new(config.clone()).context("Failed to build HTTP client")?);
    let extractor: Arc<dyn TextExtractor> = Arc::new(PdfExtractor);
    let mut manager = ConversationManager::new(&config, generator, extractor);

    tui::install_panic_hook();
    let mut terminal = tui::init().context("Failed to initialize terminal")?;
    info!(model = %config.model, "chat started");

    let result = event_loop(&mut terminal, &mut manager).await;

    tui::restore().context("Failed to restore terminal")?;
    info!(
        messages = manager.conversation().messages().len(),
        "chat closed"
    );
    result
}

async fn event_loop(terminal: &mut Tui, manager: &mut ConversationManager) -> Result<()> {
    let mut events = EventHandler::new();
    terminal.draw(|frame| frame.render_widget(&*manager, frame.size()))?;

    while let Some(event) = events.next().await {
        match event {
            TuiEvent::Key(key) => {
                if manager.handle_key(key) == ConversationAction::Exit {
                    break;
                }
            }
            TuiEvent::Paste(text) => manager.handle_paste(&text),
            // Next draw picks up the new size
            TuiEvent::Resize(..) => {}
            TuiEvent::Tick => manager.on_tick(),
        }

        terminal.draw(|frame| frame.render_widget(&*manager, frame.size()))?;
    }

    Ok(())
}
