//! Mapping between typed records and table rows.

use rabbit_types::models::{
    ConversationMessage, DeletedChat, EmailKind, EmailLogEntry, JournalEntry, MoodEntry, Role, User,
};
use rabbit_types::{ChatId, Username};

use crate::codec::Record;
use crate::error::{Result, StoreError};
use crate::table::TableSpec;

pub const USERS: TableSpec = TableSpec {
    file_name: "users.csv",
    header: &["username", "email", "password", "name", "emailVerified", "createdAt"],
};

pub const EMAILS: TableSpec = TableSpec {
    file_name: "emails.csv",
    header: &["id", "to", "subject", "type", "otp", "sentAt", "username"],
};

pub const CONVERSATIONS: TableSpec = TableSpec {
    file_name: "conversations.csv",
    header: &["id", "chatId", "role", "content", "timestamp"],
};

pub const MOODS: TableSpec = TableSpec {
    file_name: "moods.csv",
    header: &["id", "mood", "note", "timestamp"],
};

pub const JOURNALS: TableSpec = TableSpec {
    file_name: "journals.csv",
    header: &["id", "content", "timestamp"],
};

pub const DELETED_CHATS: TableSpec = TableSpec {
    file_name: "deleted_chats.csv",
    header: &["chatId", "deletedAt"],
};

/// Tables kept directly in the storage root, beside the user directories.
pub const GLOBAL_TABLES: &[TableSpec] = &[USERS, EMAILS];

/// A typed record stored in one table.
pub trait Row: Sized {
    const TABLE: TableSpec;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self>;
}

fn username_field(table: &'static str, raw: &str) -> Result<Username> {
    Username::parse(raw).map_err(|e| StoreError::corrupt(table, e))
}

impl Row for User {
    const TABLE: TableSpec = USERS;

    fn to_record(&self) -> Record {
        Record::new()
            .with("username", self.username.as_str())
            .with("email", self.email.as_str())
            .with("password", self.password.as_str())
            .with("name", self.name.as_str())
            .with("emailVerified", if self.email_verified { "true" } else { "false" })
            .with("createdAt", self.created_at.as_str())
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            username: username_field(USERS.file_name, record.get("username"))?,
            email: record.get("email").to_string(),
            password: record.get("password").to_string(),
            name: record.get("name").to_string(),
            email_verified: record.get("emailVerified") == "true",
            created_at: record.get("createdAt").to_string(),
        })
    }
}

impl Row for ConversationMessage {
    const TABLE: TableSpec = CONVERSATIONS;

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id.as_str())
            .with("chatId", self.chat_id.as_str())
            .with("role", self.role.as_str())
            .with("content", self.content.as_str())
            .with("timestamp", self.timestamp.as_str())
    }

    fn from_record(record: &Record) -> Result<Self> {
        let role = record
            .get("role")
            .parse::<Role>()
            .map_err(|e| StoreError::corrupt(CONVERSATIONS.file_name, e))?;
        Ok(Self {
            id: record.get("id").to_string(),
            chat_id: ChatId::or_default_thread(record.get("chatId")),
            role,
            content: record.get("content").to_string(),
            timestamp: record.get("timestamp").to_string(),
        })
    }
}

impl Row for DeletedChat {
    const TABLE: TableSpec = DELETED_CHATS;

    fn to_record(&self) -> Record {
        Record::new()
            .with("chatId", self.chat_id.as_str())
            .with("deletedAt", self.deleted_at.as_str())
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            chat_id: ChatId::parse(record.get("chatId"))
                .map_err(|e| StoreError::corrupt(DELETED_CHATS.file_name, e))?,
            deleted_at: record.get("deletedAt").to_string(),
        })
    }
}

impl Row for MoodEntry {
    const TABLE: TableSpec = MOODS;

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id.as_str())
            .with("mood", self.mood.as_str())
            .with("note", self.note.as_str())
            .with("timestamp", self.timestamp.as_str())
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.get("id").to_string(),
            mood: record.get("mood").to_string(),
            note: record.get("note").to_string(),
            timestamp: record.get("timestamp").to_string(),
        })
    }
}

impl Row for JournalEntry {
    const TABLE: TableSpec = JOURNALS;

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id.as_str())
            .with("content", self.content.as_str())
            .with("timestamp", self.timestamp.as_str())
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.get("id").to_string(),
            content: record.get("content").to_string(),
            timestamp: record.get("timestamp").to_string(),
        })
    }
}

impl Row for EmailLogEntry {
    const TABLE: TableSpec = EMAILS;

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id.as_str())
            .with("to", self.to.as_str())
            .with("subject", self.subject.as_str())
            .with("type", self.kind.as_str())
            .with("otp", self.otp.as_str())
            .with("sentAt", self.sent_at.as_str())
            .with("username", self.username.as_ref().map(Username::as_str).unwrap_or(""))
    }

    fn from_record(record: &Record) -> Result<Self> {
        let username = match record.get("username") {
            "" => None,
            raw => Some(username_field(EMAILS.file_name, raw)?),
        };
        Ok(Self {
            id: record.get("id").to_string(),
            to: record.get("to").to_string(),
            subject: record.get("subject").to_string(),
            kind: record
                .get("type")
                .parse::<EmailKind>()
                .map_err(|e| StoreError::corrupt(EMAILS.file_name, e))?,
            otp: record.get("otp").to_string(),
            sent_at: record.get("sentAt").to_string(),
            username,
        })
    }
}
