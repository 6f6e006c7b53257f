use anyhow::{Result, anyhow};
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, multipart};

use crate::discord::payload::NotificationPayload;

/// Where notifications go. `Ok` means the target accepted the payload.
pub trait NotificationSink {
    fn deliver(&self, payload: &NotificationPayload) -> Result<()>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        (**self).deliver(payload)
    }
}

pub struct WebhookClient {
    http: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("gmail_discord_relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    fn multipart_form(payload: &NotificationPayload) -> Result<multipart::Form> {
        let json = serde_json::to_string(&payload.body())?;
        let mut form = multipart::Form::new().text("payload_json", json);

        for (idx, file) in payload.files.iter().enumerate() {
            let part = multipart::Part::bytes(file.data.clone())
                .file_name(file.filename.clone())
                .mime_str(&file.mime_type)
                .or_else(|_| {
                    multipart::Part::bytes(file.data.clone())
                        .file_name(file.filename.clone())
                        .mime_str("application/octet-stream")
                })?;
            form = form.part(format!("file{idx}"), part);
        }

        Ok(form)
    }
}

impl NotificationSink for WebhookClient {
    fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        let req = if payload.is_multipart() {
            debug!("posting multipart webhook with {} files", payload.files.len());
            self.http
                .post(&self.url)
                .multipart(Self::multipart_form(payload)?)
        } else {
            self.http.post(&self.url).json(&payload.body())
        };

        let resp = req.send()?;
        match resp.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            status => {
                let body = resp.text().unwrap_or_default();
                Err(anyhow!("webhook rejected notification: {status} - {body}"))
            }
        }
    }
}
