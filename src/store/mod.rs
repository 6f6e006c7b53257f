pub mod cursor;
pub mod ledger;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::store::cursor::CursorFile;
use crate::store::ledger::Ledger;

pub const CURSOR_FILE: &str = "last_history_id.txt";
pub const LEDGER_FILE: &str = "processed_emails.txt";

/// Relay state loaded once at startup and written through on every change.
pub struct StateStore {
    pub cursor: CursorFile,
    pub ledger: Ledger,
}

impl StateStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(Self {
            cursor: CursorFile::open(dir.join(CURSOR_FILE))?,
            ledger: Ledger::open(dir.join(LEDGER_FILE))?,
        })
    }
}
