//! JSON shapes of the Gmail v1 responses we consume.

use serde::{Deserialize, Serialize};

use crate::domain::content::{ContentNode, Header, NodeBody};
use crate::gmail::MessageRef;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub history_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryList {
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
    pub history_id: Option<String>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default)]
    pub messages_added: Vec<MessageAdded>,
}

#[derive(Debug, Deserialize)]
pub struct MessageAdded {
    pub message: MessageStub,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStub {
    pub id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
}

impl From<MessageStub> for MessageRef {
    fn from(m: MessageStub) -> Self {
        MessageRef {
            id: m.id,
            label_ids: m.label_ids,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageStub>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub id: String,
    pub payload: MessagePart,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub headers: Vec<PartHeader>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
pub struct PartHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttachmentBody {
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRequest<'a> {
    pub remove_label_ids: &'a [&'a str],
}

impl MessagePart {
    pub fn into_headers_and_node(self) -> (Vec<Header>, ContentNode) {
        let headers = self
            .headers
            .iter()
            .map(|h| Header {
                name: h.name.clone(),
                value: h.value.clone(),
            })
            .collect();
        (headers, self.into_node())
    }

    pub fn into_node(self) -> ContentNode {
        let children = self.parts.into_iter().map(MessagePart::into_node).collect();
        ContentNode::new(
            self.mime_type,
            self.filename,
            NodeBody {
                data: self.body.data,
                attachment_id: self.body.attachment_id,
                size: self.body.size,
            },
            children,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::NodeKind;

    #[test]
    fn message_payload_becomes_content_tree() {
        let raw = r#"{
            "id": "m1",
            "payload": {
                "mimeType": "multipart/mixed",
                "headers": [{"name": "Subject", "value": "Hi"}],
                "body": {"size": 0},
                "parts": [
                    {"partId": "0", "mimeType": "text/plain", "filename": "",
                     "body": {"size": 5, "data": "aGVsbG8="}},
                    {"partId": "1", "mimeType": "image/png", "filename": "a.png",
                     "body": {"size": 3, "attachmentId": "ANGj"}}
                ]
            }
        }"#;

        let msg: Message = serde_json::from_str(raw).unwrap();
        let (headers, node) = msg.payload.into_headers_and_node();
        assert_eq!(headers[0].name, "Subject");

        let NodeKind::Composite(children) = node.kind else {
            panic!("expected composite root");
        };
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].kind, NodeKind::PlainText);
        assert_eq!(children[0].body.data.as_deref(), Some("aGVsbG8="));
        assert_eq!(children[1].attachment_ref(), Some("ANGj"));
    }

    #[test]
    fn history_without_records_parses() {
        let list: HistoryList = serde_json::from_str(r#"{"historyId": "42"}"#).unwrap();
        assert!(list.history.is_empty());
        assert_eq!(list.history_id.as_deref(), Some("42"));
    }
}
