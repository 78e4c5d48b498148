use rabbit_types::models::EmailLogEntry;

use crate::error::Result;
use crate::Store;

impl Store {
    // -- Outbound email log --

    pub fn add_email(&self, entry: &EmailLogEntry) -> Result<()> {
        let path = self.global_path::<EmailLogEntry>();
        self.append_locked(&path, entry)
    }

    pub fn get_emails(&self) -> Result<Vec<EmailLogEntry>> {
        self.read_rows(&self.global_path::<EmailLogEntry>())
    }
}
