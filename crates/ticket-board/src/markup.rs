//! Markup dialects used when rendering replies for a transport.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Enumerates supported `MarkupMode` values.
pub enum MarkupMode {
    /// Text is emitted verbatim; bold and code spans are no-ops.
    Plain,
    /// Telegram-style HTML subset: `<b>` and `<code>`.
    #[default]
    Html,
}

impl MarkupMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Html => "html",
        }
    }

    /// Escapes literal text so the transport renders it unchanged.
    pub fn escape(self, text: &str) -> String {
        match self {
            Self::Plain => text.to_string(),
            Self::Html => escape_html(text),
        }
    }

    pub fn bold(self, text: &str) -> String {
        match self {
            Self::Plain => text.to_string(),
            Self::Html => format!("<b>{}</b>", escape_html(text)),
        }
    }

    pub fn code(self, text: &str) -> String {
        match self {
            Self::Plain => text.to_string(),
            Self::Html => format!("<code>{}</code>", escape_html(text)),
        }
    }

    /// Makes stored text safe to send in this dialect.
    pub fn sanitize(self, stored: &str) -> String {
        match self {
            Self::Plain => stored.to_string(),
            Self::Html => sanitize_html(stored),
        }
    }

    /// Reduces stored text in this dialect to what a reader would see.
    pub fn to_plain(self, text: &str) -> String {
        match self {
            Self::Plain => text.to_string(),
            Self::Html => html_to_plain(text),
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Byte length of the tag at the start of `text`. A `<` that is not followed
/// by a tag name or never reaches `>` is not a tag.
pub fn html_tag_len(text: &str) -> Option<usize> {
    let body = text.strip_prefix('<')?;
    match body.chars().next() {
        Some(ch) if ch.is_ascii_alphabetic() || ch == '/' => {}
        _ => return None,
    }
    let end = body.find(|ch: char| ch == '<' || ch == '>')?;
    body[end..].starts_with('>').then_some(end + 2)
}

/// Byte length of the character reference at the start of `text`, e.g.
/// `&amp;` or `&#39;`.
pub fn html_entity_len(text: &str) -> Option<usize> {
    let body = text.strip_prefix('&')?;
    let (end, _) = body
        .char_indices()
        .take(10)
        .find(|(_, ch)| *ch == ';')?;
    let name = body[..end].strip_prefix('#').unwrap_or(&body[..end]);
    let valid = !name.is_empty() && name.chars().all(|ch| ch.is_ascii_alphanumeric());
    valid.then_some(end + 2)
}

fn decode_entity(entity: &str) -> &str {
    match entity {
        "&lt;" => "<",
        "&gt;" => ">",
        "&amp;" => "&",
        "&quot;" => "\"",
        "&#39;" => "'",
        _ => entity,
    }
}

/// Strips tags and decodes the entities Telegram emits. Stray `<` and `&`
/// that open neither a tag nor an entity are kept as text.
pub fn html_to_plain(html: &str) -> String {
    let mut plain = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(ch) = rest.chars().next() {
        if let Some(len) = html_tag_len(rest) {
            rest = &rest[len..];
            continue;
        }
        if let Some(len) = html_entity_len(rest) {
            plain.push_str(decode_entity(&rest[..len]));
            rest = &rest[len..];
            continue;
        }
        plain.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    plain
}

/// Keeps tags and entities of stored HTML and escapes every other `<`, `>`
/// and `&`, so text written before HTML mode still parses.
pub fn sanitize_html(html: &str) -> String {
    let mut sanitized = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(ch) = rest.chars().next() {
        let markup_len = match ch {
            '<' => html_tag_len(rest),
            '&' => html_entity_len(rest),
            _ => None,
        };
        if let Some(len) = markup_len {
            sanitized.push_str(&rest[..len]);
            rest = &rest[len..];
            continue;
        }
        match ch {
            '<' => sanitized.push_str("&lt;"),
            '>' => sanitized.push_str("&gt;"),
            '&' => sanitized.push_str("&amp;"),
            _ => sanitized.push(ch),
        }
        rest = &rest[ch.len_utf8()..];
    }
    sanitized
}
