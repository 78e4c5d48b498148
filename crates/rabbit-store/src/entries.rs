use rabbit_types::Username;
use rabbit_types::models::{HistoryCounts, JournalEntry, MoodEntry};

use crate::error::Result;
use crate::Store;

impl Store {
    // -- Moods --

    pub fn get_mood_entries(&self, username: &Username) -> Result<Vec<MoodEntry>> {
        self.read_rows(&self.user_path::<MoodEntry>(username)?)
    }

    pub fn add_mood_entry(&self, username: &Username, entry: &MoodEntry) -> Result<()> {
        self.append_user_row(username, entry)
    }

    // -- Journals --

    pub fn get_journal_entries(&self, username: &Username) -> Result<Vec<JournalEntry>> {
        self.read_rows(&self.user_path::<JournalEntry>(username)?)
    }

    pub fn add_journal_entry(&self, username: &Username, entry: &JournalEntry) -> Result<()> {
        self.append_user_row(username, entry)
    }

    /// How much a user has stored, reported on login.
    pub fn user_history(&self, username: &Username) -> Result<HistoryCounts> {
        Ok(HistoryCounts {
            conversations: self.get_conversations(username, None)?.len(),
            mood_entries: self.get_mood_entries(username)?.len(),
            journal_entries: self.get_journal_entries(username)?.len(),
        })
    }
}
