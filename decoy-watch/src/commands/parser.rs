//! Chat command parsing.

/// A command typed into the target channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `!decoy_status`
    DecoyStatus,
    /// `!update_status`
    UpdateStatus,
    /// `!search_decoy`
    SearchDecoy,
    /// `!interval <seconds>`; the argument is validated on execution.
    SetInterval(String),
    /// `!interval` without exactly one argument.
    ShowInterval,
    /// `!cleanup`
    Cleanup,
    /// `!bot_info`
    BotInfo,
    /// `!show_decoy_messages`
    ShowDecoyMessages,
    /// `!server_messages`
    ServerMessages,
}

impl Command {
    /// Parse message text. Matching ignores case and surrounding whitespace.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let lower = text.to_lowercase();

        let command = match lower.as_str() {
            "!decoy_status" => Self::DecoyStatus,
            "!update_status" => Self::UpdateStatus,
            "!search_decoy" => Self::SearchDecoy,
            "!cleanup" => Self::Cleanup,
            "!bot_info" => Self::BotInfo,
            "!show_decoy_messages" => Self::ShowDecoyMessages,
            "!server_messages" => Self::ServerMessages,
            _ if lower.starts_with("!interval") => {
                let parts: Vec<&str> = text.split_whitespace().collect();
                if parts.first().is_some_and(|p| !p.eq_ignore_ascii_case("!interval")) {
                    return None;
                }
                match parts.as_slice() {
                    [_, arg] => Self::SetInterval((*arg).to_string()),
                    _ => Self::ShowInterval,
                }
            }
            _ => return None,
        };
        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DecoyStatus => "decoy_status",
            Self::UpdateStatus => "update_status",
            Self::SearchDecoy => "search_decoy",
            Self::SetInterval(_) | Self::ShowInterval => "interval",
            Self::Cleanup => "cleanup",
            Self::BotInfo => "bot_info",
            Self::ShowDecoyMessages => "show_decoy_messages",
            Self::ServerMessages => "server_messages",
        }
    }
}
