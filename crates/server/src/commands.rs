//! Bot command parsing.

/// A recognised bot command with its argument, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start [payload]`. Deep links arrive as `/start file_<id>`; some
    /// clients send `/start=file_<id>` instead.
    Start(Option<String>),
    Help,
    /// `/link`, sent as a reply to the media to share.
    Link,
    Search(Option<String>),
    DelFile(Option<String>),
    /// `/broadcast`, sent as a reply to the message to broadcast.
    Broadcast,
    Ping,
}

impl Command {
    /// Parse a message text. Returns `None` for anything that is not one of
    /// the known commands.
    ///
    /// A `@botname` suffix on the command is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let (head, rest) = match text.find(char::is_whitespace) {
            Some(i) => (&text[..i], text[i..].trim()),
            None => (text, ""),
        };
        let (head, inline) = match head.split_once('=') {
            Some((name, payload)) => (name, payload.trim()),
            None => (head, ""),
        };
        let name = head.split('@').next().unwrap_or(head);
        let arg = if rest.is_empty() { inline } else { rest };
        let arg = (!arg.is_empty()).then(|| arg.to_owned());

        match name.to_ascii_lowercase().as_str() {
            "/start" => Some(Self::Start(arg)),
            "/help" => Some(Self::Help),
            "/link" => Some(Self::Link),
            "/search" => Some(Self::Search(arg)),
            "/delfile" => Some(Self::DelFile(arg)),
            "/broadcast" => Some(Self::Broadcast),
            "/ping" => Some(Self::Ping),
            _ => None,
        }
    }

    /// Commands only configured administrators may run.
    pub fn is_admin_only(&self) -> bool {
        matches!(self, Self::DelFile(_) | Self::Broadcast | Self::Ping)
    }
}
