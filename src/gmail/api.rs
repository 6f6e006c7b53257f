use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::auth::token_manager::AccessTokenSource;
use crate::gmail::wire::{
    AttachmentBody, HistoryList, Message, MessageList, ModifyRequest, Profile,
};
use crate::gmail::{
    ChangeEvent, ChangeSet, Cursor, FetchedMessage, MailboxProvider, MessageRef, StaleCursor,
};
use crate::mail::decoders::URL_SAFE_LENIENT;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

const UNREAD_INBOX_QUERY: &str = "is:unread in:inbox";

/// Blocking Gmail REST client. Fetches a bearer token before every call.
pub struct GmailApi<T> {
    http: Client,
    base_url: String,
    tokens: T,
}

impl<T: AccessTokenSource> GmailApi<T> {
    pub fn new(tokens: T) -> Result<Self> {
        Self::with_base_url(tokens, GMAIL_API_BASE)
    }

    pub fn with_base_url(tokens: T, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("gmail_discord_relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn send(&self, req: RequestBuilder) -> Result<Response> {
        let token = self.tokens.access_token()?;
        Ok(req.bearer_auth(token).send()?)
    }

    fn get_json<R: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<R> {
        let resp = self.send(self.http.get(self.url(path)).query(query))?;
        read_json(resp, path)
    }
}

fn read_json<R: DeserializeOwned>(resp: Response, what: &str) -> Result<R> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(anyhow!("Gmail {what} failed: {status} - {body}"));
    }
    resp.json::<R>()
        .with_context(|| format!("decoding Gmail {what} response"))
}

impl<T: AccessTokenSource> MailboxProvider for GmailApi<T> {
    fn list_changes_since(&self, cursor: &Cursor) -> Result<ChangeSet> {
        let mut events = Vec::new();
        let mut latest = None;
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("startHistoryId", cursor.as_str()),
                ("historyTypes", "messageAdded"),
            ];
            if let Some(t) = page_token.as_deref() {
                query.push(("pageToken", t));
            }

            let resp = self.send(self.http.get(self.url("history")).query(&query))?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Err(StaleCursor(cursor.clone()).into());
            }
            let page: HistoryList = read_json(resp, "history.list")?;

            if let Some(h) = page.history_id {
                latest = Some(Cursor::new(h));
            }
            events.extend(page.history.into_iter().map(|rec| ChangeEvent {
                added: rec
                    .messages_added
                    .into_iter()
                    .map(|m| MessageRef::from(m.message))
                    .collect(),
            }));

            match page.next_page_token {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }

        debug!("history since {cursor}: {} records", events.len());
        Ok(ChangeSet {
            cursor: latest,
            events,
        })
    }

    fn list_unread(&self) -> Result<Vec<MessageRef>> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("q", UNREAD_INBOX_QUERY)];
            if let Some(t) = page_token.as_deref() {
                query.push(("pageToken", t));
            }
            let page: MessageList = self.get_json("messages", &query)?;
            out.extend(page.messages.into_iter().map(MessageRef::from));

            match page.next_page_token {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }

        Ok(out)
    }

    fn current_cursor(&self) -> Result<Cursor> {
        let profile: Profile = self.get_json("profile", &[])?;
        Ok(Cursor::new(profile.history_id))
    }

    fn get_message(&self, id: &str) -> Result<FetchedMessage> {
        let msg: Message = self.get_json(&format!("messages/{id}"), &[("format", "full")])?;
        let (headers, content) = msg.payload.into_headers_and_node();
        Ok(FetchedMessage {
            id: msg.id,
            headers,
            content,
        })
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let body: AttachmentBody = self.get_json(
            &format!("messages/{message_id}/attachments/{attachment_id}"),
            &[],
        )?;
        URL_SAFE_LENIENT
            .decode(body.data.as_bytes())
            .with_context(|| format!("attachment {attachment_id} of {message_id}"))
    }

    fn mark_read(&self, id: &str) -> Result<()> {
        let path = format!("messages/{id}/modify");
        let req = self.http.post(self.url(&path)).json(&ModifyRequest {
            remove_label_ids: &["UNREAD"],
        });
        let resp = self.send(req)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(anyhow!("Gmail modify {id} failed: {status} - {body}"));
        }
        Ok(())
    }
}
