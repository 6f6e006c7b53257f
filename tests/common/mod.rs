#![allow(dead_code)]

use anyhow::{Result, anyhow};
use base64::Engine as _;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};

use gmail_discord_relay::discord::payload::NotificationPayload;
use gmail_discord_relay::discord::webhook::NotificationSink;
use gmail_discord_relay::domain::content::{ContentNode, Header, NodeBody};
use gmail_discord_relay::gmail::{
    ChangeEvent, ChangeSet, Cursor, FetchedMessage, MailboxProvider, MessageRef, StaleCursor,
};
use gmail_discord_relay::mail::decoders::URL_SAFE_LENIENT;

/// In-memory mailbox with a monotonically increasing history id.
#[derive(Default)]
pub struct FakeMailbox {
    messages: RefCell<HashMap<String, FetchedMessage>>,
    attachments: RefCell<HashMap<String, Vec<u8>>>,
    added: RefCell<Vec<(u64, String)>>,
    unread: RefCell<Vec<String>>,
    history_id: Cell<u64>,
    pub marked_read: RefCell<Vec<String>>,
    pub history_broken: Cell<bool>,
    pub history_stale: Cell<bool>,
    pub unloadable: RefCell<HashSet<String>>,
}

pub struct NewMail<'a> {
    pub id: &'a str,
    pub subject: &'a str,
    pub from: &'a str,
    pub body: &'a str,
    pub files: Vec<(String, String, Vec<u8>)>,
}

impl<'a> NewMail<'a> {
    pub fn text(id: &'a str, subject: &'a str, from: &'a str, body: &'a str) -> Self {
        Self {
            id,
            subject,
            from,
            body,
            files: Vec::new(),
        }
    }
}

impl FakeMailbox {
    pub fn new() -> Self {
        let mb = Self::default();
        mb.history_id.set(1000);
        mb
    }

    pub fn deliver_mail(&self, mail: NewMail<'_>) {
        let mut children = vec![ContentNode::new(
            "text/plain",
            "",
            NodeBody {
                data: Some(URL_SAFE_LENIENT.encode(mail.body)),
                size: mail.body.len() as u64,
                ..Default::default()
            },
            vec![],
        )];

        for (idx, (name, mime, data)) in mail.files.into_iter().enumerate() {
            let att_id = format!("{}-att{idx}", mail.id);
            children.push(ContentNode::new(
                mime,
                name,
                NodeBody {
                    attachment_id: Some(att_id.clone()),
                    size: data.len() as u64,
                    data: None,
                },
                vec![],
            ));
            self.attachments.borrow_mut().insert(att_id, data);
        }

        let headers = vec![
            header("Subject", mail.subject),
            header("From", mail.from),
            header("Date", "Mon, 1 Jan 2024 10:00:00 +0000"),
        ];

        self.messages.borrow_mut().insert(
            mail.id.to_string(),
            FetchedMessage {
                id: mail.id.to_string(),
                headers,
                content: ContentNode::new("multipart/mixed", "", NodeBody::default(), children),
            },
        );

        let next = self.history_id.get() + 1;
        self.history_id.set(next);
        self.added.borrow_mut().push((next, mail.id.to_string()));
        self.unread.borrow_mut().push(mail.id.to_string());
    }

    pub fn read_elsewhere(&self, id: &str) {
        self.unread.borrow_mut().retain(|u| u != id);
    }

    pub fn is_unread(&self, id: &str) -> bool {
        self.unread.borrow().iter().any(|u| u == id)
    }

    fn labels(&self, id: &str) -> Vec<String> {
        let mut labels = vec!["INBOX".to_string()];
        if self.is_unread(id) {
            labels.push("UNREAD".to_string());
        }
        labels
    }
}

fn header(name: &str, value: &str) -> Header {
    Header {
        name: name.to_string(),
        value: value.to_string(),
    }
}

impl MailboxProvider for FakeMailbox {
    fn list_changes_since(&self, cursor: &Cursor) -> Result<ChangeSet> {
        if self.history_stale.get() {
            return Err(StaleCursor(cursor.clone()).into());
        }
        if self.history_broken.get() {
            return Err(anyhow!("history backend unavailable"));
        }
        let since: u64 = cursor.as_str().parse()?;
        let events = self
            .added
            .borrow()
            .iter()
            .filter(|(hid, _)| *hid > since)
            .map(|(_, id)| ChangeEvent {
                added: vec![MessageRef {
                    id: id.clone(),
                    label_ids: self.labels(id),
                }],
            })
            .collect();
        Ok(ChangeSet {
            cursor: Some(Cursor::new(self.history_id.get().to_string())),
            events,
        })
    }

    fn list_unread(&self) -> Result<Vec<MessageRef>> {
        Ok(self
            .unread
            .borrow()
            .iter()
            .map(|id| MessageRef {
                id: id.clone(),
                label_ids: self.labels(id),
            })
            .collect())
    }

    fn current_cursor(&self) -> Result<Cursor> {
        Ok(Cursor::new(self.history_id.get().to_string()))
    }

    fn get_message(&self, id: &str) -> Result<FetchedMessage> {
        if self.unloadable.borrow().contains(id) {
            return Err(anyhow!("500 while loading {id}"));
        }
        self.messages
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("no message {id}"))
    }

    fn get_attachment(&self, _message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        self.attachments
            .borrow()
            .get(attachment_id)
            .cloned()
            .ok_or_else(|| anyhow!("no attachment {attachment_id}"))
    }

    fn mark_read(&self, id: &str) -> Result<()> {
        self.read_elsewhere(id);
        self.marked_read.borrow_mut().push(id.to_string());
        Ok(())
    }
}

/// Records every payload it is handed; accepts unless told to reject.
#[derive(Default)]
pub struct RecordingSink {
    pub received: RefCell<Vec<NotificationPayload>>,
    pub rejections: RefCell<VecDeque<String>>,
}

impl RecordingSink {
    pub fn reject_next(&self, reason: &str) {
        self.rejections.borrow_mut().push_back(reason.to_string());
    }

    pub fn titles(&self) -> Vec<String> {
        self.received
            .borrow()
            .iter()
            .filter_map(|p| p.embeds[0].title.clone())
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        self.received.borrow_mut().push(payload.clone());
        match self.rejections.borrow_mut().pop_front() {
            Some(reason) => Err(anyhow!("{reason}")),
            None => Ok(()),
        }
    }
}
