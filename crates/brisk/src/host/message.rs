//! Wire format of messages between the execution thread and the host
//!
//! Outbound messages are single strings, `tag,content`. The receiver
//! splits on the first comma; tags it does not know are passed through
//! untouched. Inbound commands travel as JSON through the control buffer.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A message from the running program to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// Program output, exactly as `print` produced it
    Print(String),
    Warning(String),
    Error(String),
    /// The program asked the device to restart
    Reset,
    /// A tag this side does not interpret
    Other { tag: String, content: String },
}

impl HostMessage {
    /// Split a wire message on its first comma.
    pub fn parse(text: &str) -> Self {
        let (tag, content) = text.split_once(',').unwrap_or((text, ""));
        match tag {
            "print" => HostMessage::Print(content.to_string()),
            "warning" => HostMessage::Warning(content.to_string()),
            "error" => HostMessage::Error(content.to_string()),
            "reset" => HostMessage::Reset,
            _ => HostMessage::Other {
                tag: tag.to_string(),
                content: content.to_string(),
            },
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            HostMessage::Print(_) => "print",
            HostMessage::Warning(_) => "warning",
            HostMessage::Error(_) => "error",
            HostMessage::Reset => "reset",
            HostMessage::Other { tag, .. } => tag,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            HostMessage::Print(s) | HostMessage::Warning(s) | HostMessage::Error(s) => s,
            HostMessage::Reset => "",
            HostMessage::Other { content, .. } => content,
        }
    }
}

impl fmt::Display for HostMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostMessage::Reset => f.write_str("reset"),
            other => write!(f, "{},{}", other.tag(), other.content()),
        }
    }
}

impl FromStr for HostMessage {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HostMessage::parse(s))
    }
}

/// A command from the host to the execution thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    /// Stop the program at the next statement boundary
    Terminate,
}
