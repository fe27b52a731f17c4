//! Conversion from Bot API messages to pipeline requests.

use ticket_board::{escape_html, MarkupMode};
use ticket_router::InboundRequest;

use crate::telegram_types::{TelegramMessage, TelegramMessageEntity};

/// Builds the pipeline request for a text message. Non-text messages and
/// messages without a sender yield `None`.
pub fn message_to_request(message: &TelegramMessage, markup: MarkupMode) -> Option<InboundRequest> {
    let text = message.text.as_deref()?;
    let sender = message.from.as_ref()?;
    let request = InboundRequest::new(sender.id.to_string(), message.chat.id.to_string(), text)
        .with_sender_display(sender.display_name());
    Some(match markup {
        MarkupMode::Html => request.with_markup_text(entities_to_html(text, &message.entities)),
        MarkupMode::Plain => request,
    })
}

fn entity_tags(entity: &TelegramMessageEntity) -> Option<(String, &'static str)> {
    let tags = match entity.kind.as_str() {
        "bold" => ("<b>".to_string(), "</b>"),
        "italic" => ("<i>".to_string(), "</i>"),
        "underline" => ("<u>".to_string(), "</u>"),
        "strikethrough" => ("<s>".to_string(), "</s>"),
        "spoiler" => ("<tg-spoiler>".to_string(), "</tg-spoiler>"),
        "code" => ("<code>".to_string(), "</code>"),
        "pre" => ("<pre>".to_string(), "</pre>"),
        "text_link" => {
            let url = entity.url.as_deref()?;
            (
                format!("<a href=\"{}\">", escape_html(url).replace('"', "&quot;")),
                "</a>",
            )
        }
        _ => return None,
    };
    Some(tags)
}

struct OpenSpan {
    end: usize,
    open: String,
    close: &'static str,
}

/// Re-renders `text` as Telegram HTML using its formatting entities.
///
/// Entity offsets are UTF-16 code units. Entity kinds without an HTML form
/// (mentions, hashtags, bot commands) keep their text unformatted.
pub fn entities_to_html(text: &str, entities: &[TelegramMessageEntity]) -> String {
    let units = text.encode_utf16().collect::<Vec<_>>();
    let mut spans = entities
        .iter()
        .filter(|entity| entity.length > 0 && entity.offset < units.len())
        .filter_map(|entity| {
            let (open, close) = entity_tags(entity)?;
            let end = entity.offset.saturating_add(entity.length).min(units.len());
            Some((entity.offset, end, open, close))
        })
        .collect::<Vec<_>>();
    // Outer spans first when two start together.
    spans.sort_by(|left, right| left.0.cmp(&right.0).then(right.1.cmp(&left.1)));

    let mut boundaries = spans
        .iter()
        .flat_map(|span| [span.0, span.1])
        .chain([0, units.len()])
        .collect::<Vec<_>>();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut html = String::with_capacity(text.len());
    let mut stack: Vec<OpenSpan> = Vec::new();
    let mut pending = spans.into_iter().peekable();
    for window in boundaries.windows(2) {
        let (position, next) = (window[0], window[1]);
        close_spans_ending_at(&mut html, &mut stack, position);
        while let Some((_, end, open, close)) = pending.next_if(|span| span.0 == position) {
            html.push_str(&open);
            stack.push(OpenSpan { end, open, close });
        }
        html.push_str(&escape_html(&String::from_utf16_lossy(&units[position..next])));
    }
    close_spans_ending_at(&mut html, &mut stack, units.len());
    html
}

/// Closes every span ending at `position`. Spans that overlap without nesting
/// are closed and reopened so the output stays well formed.
fn close_spans_ending_at(html: &mut String, stack: &mut Vec<OpenSpan>, position: usize) {
    if !stack.iter().any(|span| span.end <= position) {
        return;
    }
    let mut reopen = Vec::new();
    while let Some(span) = stack.pop() {
        html.push_str(span.close);
        if span.end > position {
            reopen.push(span);
        }
        if !stack.iter().any(|span| span.end <= position) {
            break;
        }
    }
    for span in reopen.into_iter().rev() {
        html.push_str(&span.open);
        stack.push(span);
    }
}
