pub mod api;
pub mod wire;

use anyhow::Result;
use std::fmt;

use crate::domain::content::{ContentNode, Header};
use crate::domain::message::MessageId;

/// Opaque mailbox change marker (Gmail history id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: MessageId,
    pub label_ids: Vec<String>,
}

impl MessageRef {
    pub fn has_label(&self, label: &str) -> bool {
        self.label_ids.iter().any(|l| l == label)
    }
}

/// One history record: the messages it added to the mailbox.
#[derive(Debug, Clone, Default)]
pub struct ChangeEvent {
    pub added: Vec<MessageRef>,
}

#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub cursor: Option<Cursor>,
    pub events: Vec<ChangeEvent>,
}

#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub id: MessageId,
    pub headers: Vec<Header>,
    pub content: ContentNode,
}

impl FetchedMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// The provider rejected the cursor because it is too old to diff against.
#[derive(Debug)]
pub struct StaleCursor(pub Cursor);

impl fmt::Display for StaleCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "history id {} is no longer available", self.0)
    }
}

impl std::error::Error for StaleCursor {}

/// The mailbox operations the relay relies on.
pub trait MailboxProvider {
    fn list_changes_since(&self, cursor: &Cursor) -> Result<ChangeSet>;
    fn list_unread(&self) -> Result<Vec<MessageRef>>;
    fn current_cursor(&self) -> Result<Cursor>;
    fn get_message(&self, id: &str) -> Result<FetchedMessage>;
    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>>;
    fn mark_read(&self, id: &str) -> Result<()>;
}

impl<T: MailboxProvider + ?Sized> MailboxProvider for &T {
    fn list_changes_since(&self, cursor: &Cursor) -> Result<ChangeSet> {
        (**self).list_changes_since(cursor)
    }

    fn list_unread(&self) -> Result<Vec<MessageRef>> {
        (**self).list_unread()
    }

    fn current_cursor(&self) -> Result<Cursor> {
        (**self).current_cursor()
    }

    fn get_message(&self, id: &str) -> Result<FetchedMessage> {
        (**self).get_message(id)
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        (**self).get_attachment(message_id, attachment_id)
    }

    fn mark_read(&self, id: &str) -> Result<()> {
        (**self).mark_read(id)
    }
}
