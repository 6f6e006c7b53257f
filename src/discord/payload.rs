use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::domain::message::{Attachment, DecodedMessage};

pub const MAX_LISTED_ATTACHMENTS: usize = 10;
pub const MAX_IMAGE_EMBEDS: usize = 10;
pub const MAX_FILES: usize = 10;

const EMBED_COLOR: u32 = 0x00ff00;
const TITLE_MAX_CHARS: usize = 256;
const FIELD_VALUE_MAX_CHARS: usize = 1024;
const EMPTY_BODY: &str = "(empty body)";
const EMPTY_FIELD: &str = "-";
const FOOTER: &str = "📨 New mail notification";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedImage {
    pub url: String,
}

/// The JSON document Discord receives, either as the body or as `payload_json`.
#[derive(Debug, Serialize)]
pub struct WebhookBody<'a> {
    pub embeds: &'a [Embed],
}

/// Descriptor embed first, then image embeds, plus the files to upload.
#[derive(Debug, Clone)]
pub struct NotificationPayload {
    pub embeds: Vec<Embed>,
    pub files: Vec<Attachment>,
}

impl NotificationPayload {
    /// Binary parts force a multipart upload.
    pub fn is_multipart(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn body(&self) -> WebhookBody<'_> {
        WebhookBody {
            embeds: &self.embeds,
        }
    }
}

fn field(name: &str, value: impl Into<String>, inline: bool) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value: value.into(),
        inline,
    }
}

fn clip(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

pub fn attachment_line(att: &Attachment) -> String {
    let kib = att.data.len() as f64 / 1024.0;
    format!("📎 {} ({:.1} KB)", att.filename, kib)
}

/// Builds the webhook payload, taking ownership of the message's attachments.
pub fn build_notification(message: DecodedMessage, now: DateTime<Utc>) -> NotificationPayload {
    let DecodedMessage {
        subject,
        sender,
        date,
        body_excerpt,
        mut attachments,
        ..
    } = message;

    let mut fields = vec![
        field("From", sender, true),
        field(
            "Date",
            if date.is_empty() { EMPTY_FIELD.to_string() } else { date },
            true,
        ),
        field(
            "Preview",
            if body_excerpt.is_empty() {
                EMPTY_BODY.to_string()
            } else {
                body_excerpt
            },
            false,
        ),
    ];

    if !attachments.is_empty() {
        let lines: Vec<String> = attachments
            .iter()
            .take(MAX_LISTED_ATTACHMENTS)
            .map(attachment_line)
            .collect();
        fields.push(field(
            "Attachments",
            clip(&lines.join("\n"), FIELD_VALUE_MAX_CHARS),
            false,
        ));
    }

    let mut embeds = vec![Embed {
        title: Some(clip(&format!("📧 New mail: {subject}"), TITLE_MAX_CHARS)),
        color: EMBED_COLOR,
        fields,
        timestamp: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        footer: Some(EmbedFooter {
            text: FOOTER.to_string(),
        }),
        image: None,
    }];

    // images anywhere in the list get a block, even past the upload cap
    embeds.extend(
        attachments
            .iter()
            .filter(|a| a.is_image())
            .take(MAX_IMAGE_EMBEDS)
            .map(|img| Embed {
                title: None,
                color: EMBED_COLOR,
                fields: Vec::new(),
                timestamp: None,
                footer: None,
                image: Some(EmbedImage {
                    url: format!("attachment://{}", img.filename),
                }),
            }),
    );

    attachments.truncate(MAX_FILES);

    NotificationPayload {
        embeds,
        files: attachments,
    }
}
