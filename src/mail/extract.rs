use anyhow::Result;
use log::{debug, warn};

use crate::domain::content::{ContentNode, NodeBody, NodeKind};
use crate::domain::message::{Attachment, DecodedMessage};
use crate::gmail::MailboxProvider;
use crate::mail::decoders::{EXCERPT_MAX_CHARS, decode_part_data, strip_html_minimal, truncate_excerpt};

const NO_SUBJECT: &str = "(no subject)";
const UNKNOWN_SENDER: &str = "(unknown sender)";

/// Fetches a message and reduces it to subject, sender, date, excerpt and attachments.
pub fn decode_message<P: MailboxProvider + ?Sized>(provider: &P, id: &str) -> Result<DecodedMessage> {
    let msg = provider.get_message(id)?;

    let subject = msg.header("Subject").unwrap_or(NO_SUBJECT).to_string();
    let sender = msg.header("From").unwrap_or(UNKNOWN_SENDER).to_string();
    let date = msg.header("Date").unwrap_or_default().to_string();

    let body = extract_body(&msg.content);
    let attachments = collect_attachments(id, &msg.content, |att_id| {
        provider.get_attachment(id, att_id)
    });

    Ok(DecodedMessage {
        id: id.to_string(),
        subject,
        sender,
        date,
        body_excerpt: truncate_excerpt(&body, EXCERPT_MAX_CHARS),
        attachments,
    })
}

/// Depth-first, left-to-right. The first non-empty `text/plain` leaf wins;
/// failing that, the first non-empty `text/html` leaf with tags stripped.
pub fn extract_body(root: &ContentNode) -> String {
    let mut search = BodySearch::default();
    match search.visit(root) {
        Some(plain) => plain,
        None => search
            .html
            .map(|html| strip_html_minimal(&html))
            .unwrap_or_default(),
    }
}

#[derive(Default)]
struct BodySearch {
    html: Option<String>,
}

impl BodySearch {
    fn visit(&mut self, node: &ContentNode) -> Option<String> {
        match &node.kind {
            NodeKind::PlainText => decode_inline(&node.body),
            NodeKind::Html => {
                if self.html.is_none() {
                    self.html = decode_inline(&node.body);
                }
                None
            }
            NodeKind::Composite(children) => children.iter().find_map(|child| self.visit(child)),
            NodeKind::Opaque => None,
        }
    }
}

fn decode_inline(body: &NodeBody) -> Option<String> {
    let data = body.data.as_deref()?;
    match decode_part_data(data) {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            debug!("skipping undecodable part: {e}");
            None
        }
    }
}

/// Walks the whole tree and fetches every attachment in encounter order.
/// A failed fetch drops that attachment only.
pub fn collect_attachments<F>(message_id: &str, root: &ContentNode, mut fetch: F) -> Vec<Attachment>
where
    F: FnMut(&str) -> Result<Vec<u8>>,
{
    let mut out = Vec::new();
    walk_attachments(message_id, root, &mut fetch, &mut out);
    out
}

fn walk_attachments<F>(message_id: &str, node: &ContentNode, fetch: &mut F, out: &mut Vec<Attachment>)
where
    F: FnMut(&str) -> Result<Vec<u8>>,
{
    if let Some(att_id) = node.attachment_ref() {
        match fetch(att_id) {
            Ok(data) => out.push(Attachment {
                filename: node.filename.clone(),
                mime_type: node.mime_type.clone(),
                data,
            }),
            Err(e) => warn!(
                "attachment {} of message {message_id} skipped: {e:#}",
                node.filename
            ),
        }
    }

    if let NodeKind::Composite(children) = &node.kind {
        for child in children {
            walk_attachments(message_id, child, fetch, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use base64::Engine as _;

    use crate::domain::content::Header;
    use crate::gmail::{ChangeSet, Cursor, FetchedMessage, MessageRef};
    use crate::mail::decoders::URL_SAFE_LENIENT;

    fn leaf(mime: &str, text: &str) -> ContentNode {
        ContentNode::new(
            mime,
            "",
            NodeBody {
                data: Some(URL_SAFE_LENIENT.encode(text)),
                ..Default::default()
            },
            vec![],
        )
    }

    fn file(mime: &str, name: &str, att_id: &str) -> ContentNode {
        ContentNode::new(
            mime,
            name,
            NodeBody {
                attachment_id: Some(att_id.into()),
                ..Default::default()
            },
            vec![],
        )
    }

    fn multi(mime: &str, children: Vec<ContentNode>) -> ContentNode {
        ContentNode::new(mime, "", NodeBody::default(), children)
    }

    #[test]
    fn plain_text_beats_html() {
        let tree = multi(
            "multipart/alternative",
            vec![leaf("text/html", "<b>rich</b>"), leaf("text/plain", "plain")],
        );
        assert_eq!(extract_body(&tree), "plain");
    }

    #[test]
    fn html_only_is_stripped() {
        let tree = multi(
            "multipart/alternative",
            vec![leaf("text/html", "<p>Hello <i>there</i></p>")],
        );
        assert_eq!(extract_body(&tree), "Hello there");
    }

    #[test]
    fn single_part_message() {
        assert_eq!(extract_body(&leaf("text/plain", "just text")), "just text");
        assert_eq!(extract_body(&leaf("text/html", "<div>x</div>")), "x");
    }

    #[test]
    fn nested_plain_found_after_empty_branch() {
        let tree = multi(
            "multipart/mixed",
            vec![
                multi("multipart/related", vec![leaf("text/html", "<p>first html</p>")]),
                multi(
                    "multipart/alternative",
                    vec![leaf("text/plain", ""), leaf("text/plain", "deep plain")],
                ),
            ],
        );
        assert_eq!(extract_body(&tree), "deep plain");
    }

    #[test]
    fn first_html_is_the_fallback() {
        let tree = multi(
            "multipart/mixed",
            vec![leaf("text/html", "<p>one</p>"), leaf("text/html", "<p>two</p>")],
        );
        assert_eq!(extract_body(&tree), "one");
    }

    #[test]
    fn broken_part_contributes_nothing() {
        let broken = ContentNode::new(
            "text/plain",
            "",
            NodeBody {
                data: Some("%%%".into()),
                ..Default::default()
            },
            vec![],
        );
        let tree = multi("multipart/mixed", vec![broken, leaf("text/plain", "ok")]);
        assert_eq!(extract_body(&tree), "ok");

        let empty = multi("multipart/mixed", vec![file("image/png", "a.png", "1")]);
        assert_eq!(extract_body(&empty), "");
    }

    #[test]
    fn attachments_in_tree_order() {
        let tree = multi(
            "multipart/mixed",
            vec![
                multi(
                    "multipart/related",
                    vec![leaf("text/html", "<p/>"), file("image/png", "inline.png", "a1")],
                ),
                file("application/pdf", "doc.pdf", "a2"),
                file("image/jpeg", "photo.jpg", "a3"),
            ],
        );

        let atts = collect_attachments("m1", &tree, |id| Ok(id.as_bytes().to_vec()));
        let names: Vec<_> = atts.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, ["inline.png", "doc.pdf", "photo.jpg"]);
        assert_eq!(atts[1].mime_type, "application/pdf");
        assert_eq!(atts[2].data, b"a3");
    }

    #[test]
    fn failed_attachment_is_dropped_alone() {
        let tree = multi(
            "multipart/mixed",
            vec![
                file("application/pdf", "a.pdf", "ok-1"),
                file("application/pdf", "b.pdf", "bad"),
                file("application/pdf", "c.pdf", "ok-2"),
            ],
        );

        let atts = collect_attachments("m1", &tree, |id| {
            if id == "bad" {
                Err(anyhow!("boom"))
            } else {
                Ok(vec![1, 2, 3])
            }
        });
        let names: Vec<_> = atts.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, ["a.pdf", "c.pdf"]);
    }

    struct OneMessage(Vec<Header>);

    impl MailboxProvider for OneMessage {
        fn list_changes_since(&self, _: &Cursor) -> Result<ChangeSet> {
            Err(anyhow!("unused"))
        }
        fn list_unread(&self) -> Result<Vec<MessageRef>> {
            Ok(vec![])
        }
        fn current_cursor(&self) -> Result<Cursor> {
            Ok(Cursor::new("1"))
        }
        fn get_message(&self, id: &str) -> Result<FetchedMessage> {
            Ok(FetchedMessage {
                id: id.to_string(),
                headers: self.0.clone(),
                content: leaf("text/plain", "body"),
            })
        }
        fn get_attachment(&self, _: &str, _: &str) -> Result<Vec<u8>> {
            Err(anyhow!("no attachments"))
        }
        fn mark_read(&self, _: &str) -> Result<()> {
            Ok(())
        }
    }

    fn header(name: &str, value: &str) -> Header {
        Header {
            name: name.into(),
            value: value.into(),
        }
    }

    #[test]
    fn missing_headers_get_defaults() {
        let msg = decode_message(&OneMessage(vec![]), "m1").unwrap();
        assert_eq!(msg.subject, "(no subject)");
        assert_eq!(msg.sender, "(unknown sender)");
        assert_eq!(msg.date, "");
        assert_eq!(msg.body_excerpt, "body");
    }

    #[test]
    fn header_names_ignore_case() {
        let provider = OneMessage(vec![
            header("subject", "lower"),
            header("FROM", "a@b.com"),
            header("dAtE", "Tue, 2 Jan 2024 08:00:00 +0000"),
        ]);
        let msg = decode_message(&provider, "m1").unwrap();
        assert_eq!(msg.subject, "lower");
        assert_eq!(msg.sender, "a@b.com");
        assert_eq!(msg.date, "Tue, 2 Jan 2024 08:00:00 +0000");
    }
}
