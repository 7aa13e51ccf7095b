//! Slash-command grammar
//!
//! Splits a `/`-prefixed line on whitespace into a verb and arguments.
//! Only the first token selects the verb; `/help`, `/list` and `/quit`
//! ignore anything after it.

use crate::error::CommandError;
use crate::types::Nickname;

/// Reply to `/help`
pub const HELP_TEXT: &str =
    "Available commands: /help, /list, /quit, /msg <user> <message>, /nick <newname>";

const MSG_USAGE: &str = "/msg <user> <message>";
const NICK_USAGE: &str = "/nick <newname>";

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the command list
    Help,
    /// Show online nicknames
    List,
    /// Leave the chat
    Quit,
    /// Private message; the body is the remaining tokens joined by single spaces
    Msg { recipient: String, body: String },
    /// Change nickname
    Nick { nickname: Nickname },
}

impl Command {
    /// Parse a command line
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default();

        match verb {
            "/help" => Ok(Command::Help),
            "/list" => Ok(Command::List),
            "/quit" => Ok(Command::Quit),
            "/msg" => {
                let recipient = parts.next().ok_or(CommandError::Usage(MSG_USAGE))?;
                let body = parts.collect::<Vec<_>>().join(" ");
                if body.is_empty() {
                    return Err(CommandError::Usage(MSG_USAGE));
                }
                Ok(Command::Msg {
                    recipient: recipient.to_string(),
                    body,
                })
            }
            "/nick" => {
                let (Some(name), None) = (parts.next(), parts.next()) else {
                    return Err(CommandError::Usage(NICK_USAGE));
                };
                Ok(Command::Nick {
                    nickname: Nickname::parse(name)?,
                })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
