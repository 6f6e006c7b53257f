use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

/// Gmail's URL-safe base64; padding is present on some payloads and absent on others.
pub const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub const EXCERPT_MAX_CHARS: usize = 1000;
pub const ELLIPSIS: &str = "...";

/// Decodes an inline part body. Invalid UTF-8 is replaced rather than rejected.
pub fn decode_part_data(data: &str) -> Result<String, base64::DecodeError> {
    let bytes = URL_SAFE_LENIENT.decode(data.trim().as_bytes())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Best-effort tag removal: drops every `<...>` run that has at least one
/// character and no nested `<`. Entities are left as-is.
pub fn strip_html_minimal(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];

        let opens_tag = tail.chars().next().is_some_and(|c| c != '<');
        let close = tail
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '<' || c == '>');

        match close {
            Some((end, '>')) if opens_tag => rest = &tail[end + 1..],
            _ => {
                out.push('<');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// First `max_chars` characters plus an ellipsis when longer; otherwise unchanged.
pub fn truncate_excerpt(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &body[..cut], ELLIPSIS),
        None => body.to_string(),
    }
}
