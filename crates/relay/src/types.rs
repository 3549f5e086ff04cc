use std::fmt;

use serde::{Deserialize, Serialize};

/// Where uploaded content currently lives before the relay takes a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentSource {
    /// Chat the content was posted in.
    pub chat_id: i64,
    /// Message carrying the content.
    pub message_id: i64,
}

impl ContentSource {
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chat_id, self.message_id)
    }
}
