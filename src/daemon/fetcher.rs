use anyhow::Result;
use log::{info, warn};

use crate::domain::message::CandidateMessage;
use crate::gmail::{Cursor, MailboxProvider, MessageRef, StaleCursor};
use crate::store::cursor::CursorFile;

const INBOX: &str = "INBOX";
const UNREAD: &str = "UNREAD";

/// Decides which messages might need a notification this cycle.
///
/// With a stored cursor, only messages added since then that are still unread
/// in the inbox are returned and the cursor advances. Without one, or when the
/// diff fails, every unread inbox message is returned instead.
pub fn fetch_candidates<P: MailboxProvider + ?Sized>(
    provider: &P,
    cursor: &mut CursorFile,
) -> Result<Vec<CandidateMessage>> {
    let Some(start) = cursor.get().cloned() else {
        info!("No stored history id; scanning all unread inbox mail");
        return scan_unread(provider, cursor, true);
    };

    match fetch_added_since(provider, cursor, &start) {
        Ok(found) => Ok(found),
        Err(e) if e.downcast_ref::<StaleCursor>().is_some() => {
            warn!("{e}; rescanning unread mail and resetting the history id");
            scan_unread(provider, cursor, true)
        }
        Err(e) => {
            warn!("History sync failed, falling back to unread scan: {e:#}");
            scan_unread(provider, cursor, false)
        }
    }
}

fn fetch_added_since<P: MailboxProvider + ?Sized>(
    provider: &P,
    cursor: &mut CursorFile,
    start: &Cursor,
) -> Result<Vec<CandidateMessage>> {
    let changes = provider.list_changes_since(start)?;

    let latest = match changes.cursor {
        Some(c) => c,
        None => provider.current_cursor()?,
    };
    cursor.save(latest)?;

    Ok(changes
        .events
        .into_iter()
        .flat_map(|event| event.added)
        .filter(|m| m.has_label(INBOX) && m.has_label(UNREAD))
        .map(candidate)
        .collect())
}

fn scan_unread<P: MailboxProvider + ?Sized>(
    provider: &P,
    cursor: &mut CursorFile,
    rebaseline: bool,
) -> Result<Vec<CandidateMessage>> {
    let unread = provider.list_unread()?;

    if rebaseline {
        let current = provider.current_cursor()?;
        info!("Recorded history id {current}");
        cursor.save(current)?;
    }

    Ok(unread.into_iter().map(candidate).collect())
}

fn candidate(m: MessageRef) -> CandidateMessage {
    CandidateMessage { id: m.id }
}
