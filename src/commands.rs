//! Operator chat commands

/// Longest display name accepted from chat or the UI
pub const MAX_NAME_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    /// `/start-game`
    StartGame,
    /// `/restart-game`
    RestartGame,
    /// `/set-name <name>`
    SetName(String),
    /// `/switch-team`
    SwitchTeam,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Usage: /set-name <name>")]
    MissingName,

    #[error("Unknown command: {0}")]
    Unknown(String),
}

impl OperatorCommand {
    /// Parse a chat line. Returns `None` for ordinary chat.
    pub fn parse(text: &str) -> Option<Result<Self, CommandError>> {
        let text = text.trim();
        let body = text.strip_prefix('/')?;
        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (body, ""),
        };

        let command = match name {
            "start-game" => Ok(Self::StartGame),
            "restart-game" => Ok(Self::RestartGame),
            "switch-team" => Ok(Self::SwitchTeam),
            "set-name" => sanitize_name(args)
                .map(Self::SetName)
                .ok_or(CommandError::MissingName),
            other => Err(CommandError::Unknown(other.to_string())),
        };
        Some(command)
    }
}

/// Trim and cap a requested display name; empty names are rejected
pub fn sanitize_name(raw: &str) -> Option<String> {
    let name: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LEN)
        .collect();
    let name = name.trim_end().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_chat_is_not_a_command() {
        assert_eq!(OperatorCommand::parse("gg everyone"), None);
    }

    #[test]
    fn parses_known_commands() {
        assert_eq!(
            OperatorCommand::parse("/start-game"),
            Some(Ok(OperatorCommand::StartGame))
        );
        assert_eq!(
            OperatorCommand::parse("  /switch-team "),
            Some(Ok(OperatorCommand::SwitchTeam))
        );
        assert_eq!(
            OperatorCommand::parse("/set-name  Ada Lovelace"),
            Some(Ok(OperatorCommand::SetName("Ada Lovelace".to_string())))
        );
    }

    #[test]
    fn set_name_needs_an_argument() {
        assert_eq!(
            OperatorCommand::parse("/set-name"),
            Some(Err(CommandError::MissingName))
        );
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert_eq!(
            OperatorCommand::parse("/fly"),
            Some(Err(CommandError::Unknown("fly".to_string())))
        );
    }

    #[test]
    fn long_names_are_capped() {
        let name = sanitize_name(&"x".repeat(40)).unwrap_or_default();
        assert_eq!(name.len(), MAX_NAME_LEN);
        assert_eq!(sanitize_name("   "), None);
    }
}
