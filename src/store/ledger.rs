use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Append-only record of message ids whose notification was accepted.
///
/// Never pruned: it grows with every delivered message. Compacting it down to
/// the provider's history retention window is left for later.
pub struct Ledger {
    path: PathBuf,
    ids: HashSet<String>,
}

impl Ledger {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ids = if path.exists() {
            fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            HashSet::new()
        };
        Ok(Self { path, ids })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Appends and syncs the id before it becomes visible in memory.
    pub fn add(&mut self, id: &str) -> Result<()> {
        if self.ids.contains(id) {
            return Ok(());
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        writeln!(f, "{id}")?;
        f.sync_data()?;
        self.ids.insert(id.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
