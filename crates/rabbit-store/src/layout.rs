use std::fs;
use std::path::PathBuf;

use rabbit_types::Username;

use crate::error::{Result, StoreError};
use crate::row::GLOBAL_TABLES;
use crate::table::TableSpec;

/// On-disk layout under the storage root:
///
/// ```text
/// <root>/users.csv
/// <root>/emails.csv
/// <root>/<username>/conversations.csv
/// <root>/<username>/moods.csv
/// <root>/<username>/journals.csv
/// <root>/<username>/deleted_chats.csv
/// ```
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn global_table(&self, table: &TableSpec) -> PathBuf {
        self.root.join(table.file_name)
    }

    /// A user's directory. Names taken by a global table are refused.
    pub fn user_dir(&self, username: &Username) -> Result<PathBuf> {
        if GLOBAL_TABLES.iter().any(|t| t.file_name == username.as_str()) {
            return Err(StoreError::ReservedName(username.to_string()));
        }
        Ok(self.root.join(username.as_str()))
    }

    pub fn user_table(&self, username: &Username, table: &TableSpec) -> Result<PathBuf> {
        Ok(self.user_dir(username)?.join(table.file_name))
    }

    /// Create the user's directory if needed and return its path.
    pub fn ensure_user_directory(&self, username: &Username) -> Result<PathBuf> {
        let dir = self.user_dir(username)?;
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(dir)
    }
}
