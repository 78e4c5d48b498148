use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Thread id given to messages recorded before chats were partitioned.
pub const DEFAULT_CHAT_ID: &str = "default_chat";

const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("username is longer than {MAX_USERNAME_LEN} bytes")]
    UsernameTooLong,
    #[error("username contains a path separator or control character: {0:?}")]
    UnsafeUsername(String),
    #[error("username must not start with a dot: {0:?}")]
    HiddenUsername(String),
    #[error("chat id must not be empty")]
    EmptyChatId,
}

/// A registered user's name.
///
/// Usernames double as directory names under the storage root, so anything
/// that could escape that directory is rejected at parse time. Names starting
/// with a dot are refused too; the store keeps its scratch files there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdError::EmptyUsername);
        }
        if raw.len() > MAX_USERNAME_LEN {
            return Err(IdError::UsernameTooLong);
        }
        let unsafe_char = raw
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control());
        if unsafe_char {
            return Err(IdError::UnsafeUsername(raw));
        }
        if raw.starts_with('.') {
            return Err(IdError::HiddenUsername(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Groups conversation messages into one chat thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChatId(String);

impl ChatId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdError::EmptyChatId);
        }
        Ok(Self(raw))
    }

    /// Fresh id for a chat the client has not named yet.
    pub fn generate() -> Self {
        Self(format!("chat_{}", Uuid::new_v4().simple()))
    }

    pub fn default_thread() -> Self {
        Self(DEFAULT_CHAT_ID.to_string())
    }

    /// Legacy rows carry an empty chat id; they belong to the default thread.
    pub fn or_default_thread(raw: &str) -> Self {
        if raw.is_empty() {
            Self::default_thread()
        } else {
            Self(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChatId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ChatId> for String {
    fn from(value: ChatId) -> Self {
        value.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
