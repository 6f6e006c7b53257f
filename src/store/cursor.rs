use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::gmail::Cursor;

/// The last observed history id, mirrored in memory and written through to a text file.
pub struct CursorFile {
    path: PathBuf,
    current: Option<Cursor>,
}

impl CursorFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = load(&path)?;
        Ok(Self { path, current })
    }

    pub fn get(&self) -> Option<&Cursor> {
        self.current.as_ref()
    }

    /// Replaces the stored value. The file is synced before the in-memory copy moves.
    pub fn save(&mut self, cursor: Cursor) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut f = File::create(&tmp)
                .with_context(|| format!("creating {}", tmp.display()))?;
            f.write_all(cursor.as_str().as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        self.current = Some(cursor);
        Ok(())
    }
}

/// Reads a persisted cursor; a missing or blank file means none was ever stored.
pub fn load(path: &Path) -> Result<Option<Cursor>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let s = s.trim();
    if s.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Cursor::new(s)))
    }
}
