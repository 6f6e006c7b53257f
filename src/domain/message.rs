pub type MessageId = String;

/// Reference to a message that may need a notification. Carries no content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMessage {
    pub id: MessageId,
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// A message reduced to what a notification needs. Rebuilt every cycle, never stored.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    pub id: MessageId,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub body_excerpt: String,
    pub attachments: Vec<Attachment>,
}
