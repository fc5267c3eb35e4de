use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a new chat, discarding the current history
    New,
    /// Attach a PDF to the next message
    Attach,
    /// Drop the pending attachment
    Detach,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "start a new chat (history is discarded)",
            SlashCommand::Attach => "attach a PDF to your next message: /attach <path>",
            SlashCommand::Detach => "remove the pending PDF attachment",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }

    /// Whether the command reads the text after its keyword.
    pub fn takes_argument(self) -> bool {
        matches!(self, SlashCommand::Attach)
    }

    /// Whether this command can be run while a reply is pending.
    pub fn available_while_busy(self) -> bool {
        !matches!(self, SlashCommand::Attach)
    }
}

/// Parse a slash command from user input. Text after a command that takes no
/// argument means the input is an ordinary message.
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim_start().strip_prefix('/')?;

    let (head, argument) = match rest.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, Some(tail.trim()).filter(|arg| !arg.is_empty())),
        None => (rest.trim_end(), None),
    };

    let command = SlashCommand::from_str(head).ok().or_else(|| match head.to_lowercase().as_str() {
        "q" | "exit" | "bye" => Some(SlashCommand::Quit),
        "clear" | "reset" => Some(SlashCommand::New),
        "pdf" | "a" => Some(SlashCommand::Attach),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    if argument.is_some() && !command.takes_argument() {
        return None;
    }

    Some(ParsedCommand {
        command,
        argument: argument.map(str::to_string),
    })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for entry in command_entries() {
        help.push_str(&format!("- /{} - {}\n", entry.keyword, entry.description));
    }

    help.push_str("\nAliases: /q /exit /bye for /quit, /clear for /new, /pdf for /attach.");
    help.push_str("\nKeys: Enter sends, Alt+Enter adds a new line, Ctrl+N starts a new chat, PageUp/PageDown scroll, Ctrl+C quits.");

    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_command() {
        let parsed = parse_slash_command("/new").unwrap();
        assert_eq!(parsed.command, SlashCommand::New);
        assert_eq!(parsed.argument(), None);
    }

    #[test]
    fn keeps_path_argument_with_spaces() {
        let parsed = parse_slash_command("/attach  ~/My Docs/report.pdf ").unwrap();
        assert_eq!(parsed.command, SlashCommand::Attach);
        assert_eq!(parsed.argument(), Some("~/My Docs/report.pdf"));
    }

    #[test]
    fn resolves_aliases() {
        assert_eq!(parse_slash_command("/q").unwrap().command, SlashCommand::Quit);
        assert_eq!(parse_slash_command("/clear").unwrap().command, SlashCommand::New);
        assert_eq!(parse_slash_command("/pdf x.pdf").unwrap().command, SlashCommand::Attach);
    }

    #[test]
    fn ordinary_text_is_not_a_command() {
        assert!(parse_slash_command("hello /new").is_none());
        assert!(parse_slash_command("/unknown").is_none());
    }

    #[test]
    fn trailing_text_after_plain_command_is_a_message() {
        assert!(parse_slash_command("/new idea: cache the index").is_none());
        assert!(parse_slash_command("/quit smoking tips?").is_none());
        assert_eq!(parse_slash_command("/new  ").unwrap().command, SlashCommand::New);
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for entry in command_entries() {
            assert!(help.contains(&format!("/{}", entry.keyword)));
        }
    }
}
