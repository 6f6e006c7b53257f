#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Inline data (URL-safe base64) or a reference to separately fetched bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeBody {
    pub data: Option<String>,
    pub attachment_id: Option<String>,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    PlainText,
    Html,
    Composite(Vec<ContentNode>),
    Opaque,
}

/// One node of a message's MIME part tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    pub mime_type: String,
    pub filename: String,
    pub body: NodeBody,
    pub kind: NodeKind,
}

impl ContentNode {
    /// Classifies a part by its mime type; any node with children is composite.
    pub fn new(
        mime_type: impl Into<String>,
        filename: impl Into<String>,
        body: NodeBody,
        children: Vec<ContentNode>,
    ) -> Self {
        let mime_type = mime_type.into();
        let lower = mime_type.to_ascii_lowercase();
        let kind = if !children.is_empty() || lower.starts_with("multipart/") {
            NodeKind::Composite(children)
        } else if lower == "text/plain" {
            NodeKind::PlainText
        } else if lower == "text/html" {
            NodeKind::Html
        } else {
            NodeKind::Opaque
        };

        Self {
            mime_type,
            filename: filename.into(),
            body,
            kind,
        }
    }

    /// True when the node names a file whose bytes live behind an attachment id.
    pub fn attachment_ref(&self) -> Option<&str> {
        if self.filename.is_empty() {
            return None;
        }
        self.body.attachment_id.as_deref().filter(|id| !id.is_empty())
    }
}
