//! Input sanitizers for untrusted form data.
//!
//! Every function here is pure and total: no I/O, no panics, and a
//! best-effort cleaned string (possibly empty) for any input.  Field
//! dispatch is driven by an explicit [`FormSchema`] declared at the call
//! site — never by guessing from field names, which has no well-defined
//! precedence when several hints match.

use serde_json::{Map, Value};
use std::collections::HashMap;
use url::Url;

// ---------------------------------------------------------------------------
// Scalar sanitizers
// ---------------------------------------------------------------------------

/// Plain text: drops `<`/`>`, any `javascript:` scheme (case-insensitive),
/// and inline `on<word>=` event-handler patterns, then trims.
pub fn text(input: &str) -> String {
    let no_angles: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();
    let no_scheme = strip_ascii_case_insensitive(&no_angles, "javascript:");
    strip_event_handlers(&no_scheme).trim().to_string()
}

/// Email: truncates at the first `<`/`>` (markup can never be part of an
/// address), lowercases, and keeps only `[a-z0-9@._-]`.
pub fn email(input: &str) -> String {
    let cut = input
        .find(['<', '>'])
        .map(|i| &input[..i])
        .unwrap_or(input);

    cut.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '@' | '.' | '_' | '-'))
        .collect()
}

/// URL: must parse and carry an http/https scheme; anything else becomes
/// the empty string.  The parsed URL is returned re-serialized, so the
/// output is normalized.
pub fn url(input: &str) -> String {
    match Url::parse(input.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed.to_string(),
        _ => String::new(),
    }
}

/// Phone: keeps only digits, `+`, `-`, spaces and parentheses.
pub fn phone(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
        .collect::<String>()
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// HTML sanitizer
// ---------------------------------------------------------------------------

/// Tags that survive cleaning.  Everything else is stripped, keeping the
/// inner text, except the tags in [`DROP_CONTENT_TAGS`].
const ALLOWED_TAGS: &[&str] = &["b", "i", "em", "strong", "a", "p", "br", "ul", "ol", "li"];

/// Tags whose *content* is dangerous too — removed together with their body.
const DROP_CONTENT_TAGS: &[&str] = &["script", "style", "iframe", "object", "embed"];

/// Allow-list HTML cleaner: keeps the minimal inline/structural tag set with
/// `href`/`target` attributes only.  `href` survives only when it passes
/// [`url`]; every event-handler attribute is dropped with the rest.
pub fn html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];

        match parse_tag(after) {
            Some((tag, consumed)) => {
                rest = &after[consumed..];
                if !tag.closing && DROP_CONTENT_TAGS.contains(&tag.name.as_str()) {
                    rest = skip_past_closing_tag(rest, &tag.name);
                } else if ALLOWED_TAGS.contains(&tag.name.as_str()) {
                    render_tag(&tag, &mut out);
                }
                // Disallowed tag: markup dropped, inner text kept by the scan.
            }
            None => {
                // Stray '<' that never forms a tag — drop the bracket.
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

struct Tag {
    closing: bool,
    name: String,
    attrs: Vec<(String, String)>,
}

/// Parse one tag starting just after a `<`.  Returns the tag and the number
/// of bytes consumed (including the closing `>`), or `None` when the input
/// does not look like a tag.
fn parse_tag(s: &str) -> Option<(Tag, usize)> {
    let gt = s.find('>')?;
    let body = &s[..gt];
    let (closing, body) = match body.strip_prefix('/') {
        Some(remainder) => (true, remainder),
        None => (false, body),
    };

    let name_len = body
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if name_len == 0 {
        return None;
    }

    let name = body[..name_len].to_ascii_lowercase();
    let attrs = parse_attrs(&body[name_len..]);

    Some((Tag { closing, name, attrs }, gt + 1))
}

/// Minimal attribute scanner: `name`, `name=value`, `name="value"`,
/// `name='value'`.  Values keep their raw form; filtering happens in
/// [`render_tag`].
fn parse_attrs(mut s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();

    loop {
        s = s.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
        if s.is_empty() {
            break;
        }

        let name_len = s
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
            .count();
        if name_len == 0 {
            // Unparseable junk; skip one character and keep going.
            let mut chars = s.chars();
            chars.next();
            s = chars.as_str();
            continue;
        }

        let name = s[..name_len].to_ascii_lowercase();
        s = &s[name_len..];

        let value = if let Some(remainder) = s.strip_prefix('=') {
            let (value, remainder) = take_attr_value(remainder);
            s = remainder;
            value
        } else {
            String::new()
        };

        attrs.push((name, value));
    }

    attrs
}

fn take_attr_value(s: &str) -> (String, &str) {
    if let Some(remainder) = s.strip_prefix('"') {
        match remainder.find('"') {
            Some(end) => (remainder[..end].to_string(), &remainder[end + 1..]),
            None => (remainder.to_string(), ""),
        }
    } else if let Some(remainder) = s.strip_prefix('\'') {
        match remainder.find('\'') {
            Some(end) => (remainder[..end].to_string(), &remainder[end + 1..]),
            None => (remainder.to_string(), ""),
        }
    } else {
        let end = s
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(s.len());
        (s[..end].to_string(), &s[end..])
    }
}

fn render_tag(tag: &Tag, out: &mut String) {
    if tag.closing {
        out.push_str("</");
        out.push_str(&tag.name);
        out.push('>');
        return;
    }

    out.push('<');
    out.push_str(&tag.name);

    for (name, value) in &tag.attrs {
        match name.as_str() {
            "href" => {
                let clean = url(value);
                if !clean.is_empty() {
                    out.push_str(" href=\"");
                    out.push_str(&clean);
                    out.push('"');
                }
            }
            "target" => {
                let clean: String = text(value).replace('"', "");
                if !clean.is_empty() {
                    out.push_str(" target=\"");
                    out.push_str(&clean);
                    out.push('"');
                }
            }
            // Everything else — events, styles, data attributes — is dropped.
            _ => {}
        }
    }

    out.push('>');
}

/// Skip everything up to and including `</name ... >` (case-insensitive).
/// An unclosed tag swallows the rest of the input, mirroring how browsers
/// treat an unterminated `<script>`.
fn skip_past_closing_tag<'a>(s: &'a str, name: &str) -> &'a str {
    let needle = format!("</{}", name);
    let bytes = s.as_bytes();
    let nb = needle.as_bytes();

    let mut i = 0;
    while i + nb.len() <= bytes.len() {
        if bytes[i..i + nb.len()].eq_ignore_ascii_case(nb) {
            return match s[i..].find('>') {
                Some(gt) => &s[i + gt + 1..],
                None => "",
            };
        }
        i += 1;
    }
    ""
}

// ---------------------------------------------------------------------------
// Byte-level helpers (ASCII needles only, so UTF-8 stays intact)
// ---------------------------------------------------------------------------

fn strip_ascii_case_insensitive(input: &str, needle: &str) -> String {
    debug_assert!(needle.is_ascii() && !needle.is_empty());
    let bytes = input.as_bytes();
    let nb = needle.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        if i + nb.len() <= bytes.len() && bytes[i..i + nb.len()].eq_ignore_ascii_case(nb) {
            i += nb.len();
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    // Only whole ASCII matches were removed, so the bytes are still UTF-8.
    String::from_utf8(out).unwrap_or_default()
}

/// Remove `on<word>=` spans (onclick=, onerror=, ...), the inline
/// event-handler pattern.
fn strip_event_handlers(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        if i + 2 < bytes.len() && bytes[i..i + 2].eq_ignore_ascii_case(b"on") {
            let mut j = i + 2;
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }
            if j > i + 2 && j < bytes.len() && bytes[j] == b'=' {
                i = j + 1;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Form-level sanitation
// ---------------------------------------------------------------------------

/// Which sanitizer applies to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Url,
    Phone,
    Html,
}

impl FieldKind {
    pub fn apply(&self, value: &str) -> String {
        match self {
            FieldKind::Text => text(value),
            FieldKind::Email => email(value),
            FieldKind::Url => url(value),
            FieldKind::Phone => phone(value),
            FieldKind::Html => html(value),
        }
    }
}

/// Explicit field-name → sanitizer mapping, declared where the form is
/// handled.  Fields not listed fall back to the text sanitizer.
#[derive(Debug, Clone, Default)]
pub struct FormSchema {
    fields: HashMap<String, FieldKind>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.insert(name.to_string(), kind);
        self
    }

    pub fn kind_for(&self, name: &str) -> FieldKind {
        self.fields.get(name).copied().unwrap_or(FieldKind::Text)
    }
}

/// Sanitize a JSON object field by field.  String values run through the
/// schema's sanitizer for that key; string arrays sanitize each element as
/// text; everything else passes through unchanged.
pub fn form(data: &Map<String, Value>, schema: &FormSchema) -> Map<String, Value> {
    let mut cleaned = Map::new();

    for (key, value) in data {
        let sanitized = match value {
            Value::String(s) => Value::String(schema.kind_for(key).apply(s)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => Value::String(text(s)),
                        other => other.clone(),
                    })
                    .collect(),
            ),
            other => other.clone(),
        };
        cleaned.insert(key.clone(), sanitized);
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_strips_angle_brackets() {
        let cleaned = text("<script>alert(1)</script>");
        assert!(!cleaned.contains('<'));
        assert!(!cleaned.contains('>'));
    }

    #[test]
    fn text_strips_javascript_scheme_case_insensitively() {
        assert_eq!(text("JaVaScRiPt:alert(1)"), "alert(1)");
    }

    #[test]
    fn text_strips_event_handler_patterns() {
        assert_eq!(text("a onclick=evil b"), "a evil b");
        assert_eq!(text("ONERROR=x"), "x");
    }

    #[test]
    fn text_keeps_ordinary_words_starting_with_on() {
        assert_eq!(text("online ordering only"), "online ordering only");
    }

    #[test]
    fn text_trims_whitespace() {
        assert_eq!(text("  warung makan  "), "warung makan");
    }

    #[test]
    fn text_handles_unicode() {
        assert_eq!(text("kopi susu ☕ <b>enak</b>"), "kopi susu ☕ benak/b");
    }

    #[test]
    fn email_normalizes_and_strips_markup() {
        assert_eq!(email("  USER@Example.COM<script>"), "user@example.com");
    }

    #[test]
    fn email_drops_disallowed_characters() {
        assert_eq!(email("user+tag@example.com"), "usertag@example.com");
    }

    #[test]
    fn url_accepts_http_and_https() {
        assert_eq!(url("https://umkm.example.com/toko"), "https://umkm.example.com/toko");
        assert!(url("http://example.com").starts_with("http://example.com"));
    }

    #[test]
    fn url_rejects_other_schemes() {
        assert_eq!(url("javascript:alert(1)"), "");
        assert_eq!(url("ftp://example.com/file"), "");
        assert_eq!(url("not a url"), "");
    }

    #[test]
    fn phone_keeps_dial_characters_only() {
        assert_eq!(phone("+62 (021) 555-0199 ext<script>"), "+62 (021) 555-0199");
    }

    #[test]
    fn html_keeps_allowed_tags() {
        assert_eq!(html("<p>halo <b>dunia</b></p>"), "<p>halo <b>dunia</b></p>");
    }

    #[test]
    fn html_removes_script_with_content() {
        assert_eq!(html("before<script>alert(1)</script>after"), "beforeafter");
    }

    #[test]
    fn html_unclosed_script_swallows_rest() {
        assert_eq!(html("safe<script>alert(1)"), "safe");
    }

    #[test]
    fn html_strips_disallowed_tags_but_keeps_text() {
        assert_eq!(html("<div>inner</div>"), "inner");
    }

    #[test]
    fn html_drops_event_handler_attributes() {
        assert_eq!(html("<p onclick=\"evil()\">hi</p>"), "<p>hi</p>");
    }

    #[test]
    fn html_keeps_safe_href_and_target() {
        assert_eq!(
            html("<a href=\"https://example.com/\" target=\"_blank\" onclick=\"x\">link</a>"),
            "<a href=\"https://example.com/\" target=\"_blank\">link</a>"
        );
    }

    #[test]
    fn html_drops_javascript_href() {
        assert_eq!(html("<a href=\"javascript:alert(1)\">link</a>"), "<a>link</a>");
    }

    #[test]
    fn html_drops_img_markup_entirely() {
        assert_eq!(html("<img src=x onerror=alert(1)>photo"), "photo");
    }

    #[test]
    fn form_applies_schema_per_field() {
        let schema = FormSchema::new()
            .field("contact_email", FieldKind::Email)
            .field("website", FieldKind::Url)
            .field("phone", FieldKind::Phone)
            .field("description", FieldKind::Html);

        let data = json!({
            "name": "Toko <b>Maju</b>",
            "contact_email": "OWNER@Toko.ID<x>",
            "website": "javascript:alert(1)",
            "phone": "0812-3456-7890abc",
            "description": "<p>Jualan</p><script>x()</script>",
            "tags": ["<batik>", "kopi", 7],
            "price": 15000
        });

        let cleaned = form(data.as_object().unwrap(), &schema);

        assert_eq!(cleaned["name"], "Toko bMaju/b");
        assert_eq!(cleaned["contact_email"], "owner@toko.id");
        assert_eq!(cleaned["website"], "");
        assert_eq!(cleaned["phone"], "0812-3456-7890");
        assert_eq!(cleaned["description"], "<p>Jualan</p>");
        assert_eq!(cleaned["tags"], json!(["batik", "kopi", 7]));
        // Non-string values pass through untouched.
        assert_eq!(cleaned["price"], 15000);
    }
}
