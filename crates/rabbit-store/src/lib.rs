pub mod codec;
pub mod conversations;
pub mod emails;
pub mod entries;
pub mod error;
pub mod layout;
pub mod locks;
pub mod row;
pub mod table;
pub mod users;

use std::fs;
use std::path::{Path, PathBuf};

use rabbit_types::Username;
use tracing::info;

pub use codec::{FieldTrim, Record};
pub use error::{DecodeError, Result, StoreError};

use crate::layout::Layout;
use crate::locks::LockRegistry;
use crate::row::Row;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub field_trim: FieldTrim,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), field_trim: FieldTrim::default() }
    }
}

/// Flat-file record store. Global tables sit in the root, every user gets a
/// directory of their own tables.
#[derive(Debug)]
pub struct Store {
    layout: Layout,
    field_trim: FieldTrim,
    locks: LockRegistry,
}

impl Store {
    pub fn open(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.root).map_err(|e| StoreError::io(&config.root, e))?;
        info!("Storage opened at {}", config.root.display());
        Ok(Self {
            layout: Layout::new(config.root),
            field_trim: config.field_trim,
            locks: LockRegistry::new(),
        })
    }

    pub fn ensure_user_directory(&self, username: &Username) -> Result<PathBuf> {
        self.layout.ensure_user_directory(username)
    }

    fn global_path<R: Row>(&self) -> PathBuf {
        self.layout.global_table(&R::TABLE)
    }

    fn user_path<R: Row>(&self, username: &Username) -> Result<PathBuf> {
        self.layout.user_table(username, &R::TABLE)
    }

    fn read_rows<R: Row>(&self, path: &Path) -> Result<Vec<R>> {
        table::read_all(path, self.field_trim)?
            .iter()
            .map(R::from_record)
            .collect()
    }

    /// Callers must hold the table lock.
    fn write_rows<R: Row>(&self, path: &Path, rows: &[R]) -> Result<()> {
        let records: Vec<Record> = rows.iter().map(Row::to_record).collect();
        table::write_all(path, &records, R::TABLE.header)
    }

    /// Callers must hold the table lock.
    fn append_row<R: Row>(&self, path: &Path, row: &R) -> Result<()> {
        table::append(path, &row.to_record(), R::TABLE.header, self.field_trim)
    }

    fn append_locked<R: Row>(&self, path: &Path, row: &R) -> Result<()> {
        self.locks.with_lock(path, || self.append_row(path, row))
    }

    /// Append to a per-user table, creating the user's directory first.
    fn append_user_row<R: Row>(&self, username: &Username, row: &R) -> Result<()> {
        self.ensure_user_directory(username)?;
        let path = self.user_path::<R>(username)?;
        self.append_locked(&path, row)
    }
}
