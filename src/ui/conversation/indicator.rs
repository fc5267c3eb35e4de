use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

const MAX_DOTS: usize = 3;

/// "Gemini is thinking..." line shown while a reply is pending
#[derive(Debug, Clone, Default)]
pub struct TypingIndicator {
    frame: usize,
}

impl TypingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the animation by one step
    pub fn tick(&mut self) {
        self.frame = (self.frame + 1) % MAX_DOTS;
    }

    pub fn reset(&mut self) {
        self.frame = 0;
    }

    pub fn text(&self, assistant_name: &str) -> String {
        let dots = ".".repeat(self.frame + 1);
        format!("{assistant_name} is thinking{dots:<width$}", width = MAX_DOTS)
    }

    pub fn line(&self, assistant_name: &str) -> Line<'static> {
        Line::from(vec![
            Span::styled("🤖 ", Style::default().fg(Color::Green)),
            Span::styled(
                self.text(assistant_name),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_cycle() {
        let mut indicator = TypingIndicator::new();
        assert_eq!(indicator.text("Gemini"), "Gemini is thinking.  ");
        indicator.tick();
        indicator.tick();
        assert_eq!(indicator.text("Gemini"), "Gemini is thinking...");
        indicator.tick();
        assert_eq!(indicator.text("Gemini"), "Gemini is thinking.  ");
    }
}
