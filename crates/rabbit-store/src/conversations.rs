use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset};
use rabbit_types::models::{ChatSummary, ConversationMessage, DeletedChat, Role, timestamp_now};
use rabbit_types::{ChatId, Username};

use crate::error::Result;
use crate::Store;

const TITLE_MAX_CHARS: usize = 50;
const UNTITLED_CHAT: &str = "New Chat";

impl Store {
    // -- Conversations --

    /// Messages of one user, optionally limited to one chat. Rows recorded
    /// without a chat id come back under the default thread.
    pub fn get_conversations(
        &self,
        username: &Username,
        chat_id: Option<&ChatId>,
    ) -> Result<Vec<ConversationMessage>> {
        let messages: Vec<ConversationMessage> =
            self.read_rows(&self.user_path::<ConversationMessage>(username)?)?;
        Ok(match chat_id {
            Some(chat_id) => messages.into_iter().filter(|m| &m.chat_id == chat_id).collect(),
            None => messages,
        })
    }

    pub fn add_conversation(
        &self,
        username: &Username,
        message: &ConversationMessage,
    ) -> Result<()> {
        self.append_user_row(username, message)
    }

    /// Replace the user's whole conversation table.
    pub fn replace_conversations(
        &self,
        username: &Username,
        messages: &[ConversationMessage],
    ) -> Result<()> {
        self.ensure_user_directory(username)?;
        let path = self.user_path::<ConversationMessage>(username)?;
        self.locks.with_lock(&path, || self.write_rows(&path, messages))
    }

    /// One summary per chat that has not been soft-deleted, newest first.
    pub fn get_chat_list(&self, username: &Username) -> Result<Vec<ChatSummary>> {
        let messages = self.get_conversations(username, None)?;
        let deleted: HashSet<ChatId> = self
            .get_deleted_chats(username)?
            .into_iter()
            .map(|d| d.chat_id)
            .collect();

        let mut order: Vec<&ChatId> = Vec::new();
        let mut threads: HashMap<&ChatId, Vec<&ConversationMessage>> = HashMap::new();
        for message in &messages {
            threads
                .entry(&message.chat_id)
                .or_insert_with(|| {
                    order.push(&message.chat_id);
                    Vec::new()
                })
                .push(message);
        }

        let mut summaries: Vec<ChatSummary> = order
            .into_iter()
            .filter(|chat_id| !deleted.contains(*chat_id))
            .map(|chat_id| summarize(chat_id, &threads[chat_id]))
            .collect();

        // Stable: chats with equal or missing timestamps keep first-seen order.
        summaries.sort_by_cached_key(|s| Reverse(parse_timestamp(&s.last_message)));
        Ok(summaries)
    }

    // -- Deleted chats --

    pub fn get_deleted_chats(&self, username: &Username) -> Result<Vec<DeletedChat>> {
        self.read_rows(&self.user_path::<DeletedChat>(username)?)
    }

    pub fn is_chat_deleted(&self, username: &Username, chat_id: &ChatId) -> Result<bool> {
        Ok(self
            .get_deleted_chats(username)?
            .iter()
            .any(|d| &d.chat_id == chat_id))
    }

    /// Mark a chat as deleted. Returns `false` if it already was.
    pub fn add_deleted_chat(&self, username: &Username, chat_id: &ChatId) -> Result<bool> {
        self.ensure_user_directory(username)?;
        let path = self.user_path::<DeletedChat>(username)?;

        self.locks.with_lock(&path, || {
            let deleted: Vec<DeletedChat> = self.read_rows(&path)?;
            if deleted.iter().any(|d| &d.chat_id == chat_id) {
                return Ok(false);
            }
            let marker = DeletedChat { chat_id: chat_id.clone(), deleted_at: timestamp_now() };
            self.append_row(&path, &marker)?;
            Ok(true)
        })
    }
}

fn summarize(chat_id: &ChatId, messages: &[&ConversationMessage]) -> ChatSummary {
    let title = messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.chars().take(TITLE_MAX_CHARS).collect::<String>())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED_CHAT.to_string());

    ChatSummary {
        chat_id: chat_id.clone(),
        title,
        last_message: messages.last().map(|m| m.timestamp.clone()).unwrap_or_default(),
        message_count: messages.len(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok()
}
