//! Board rendering: one fixed-width summary line per ticket.

use ticket_store::{Ticket, TicketId};

use crate::markup::MarkupMode;

pub const BOARD_HEADER: &str = "TICKETS:";
pub const ELLIPSIS: &str = "...";

const NORMAL_LINE_BUDGET: usize = 40;
const WIDE_LINE_BUDGET: usize = 51;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Enumerates supported `BoardWidth` values.
pub enum BoardWidth {
    #[default]
    Normal,
    Wide,
}

impl BoardWidth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Wide => "wide",
        }
    }

    /// Visible characters available for reference, separator, and title.
    pub fn line_budget(self) -> usize {
        match self {
            Self::Normal => NORMAL_LINE_BUDGET,
            Self::Wide => WIDE_LINE_BUDGET,
        }
    }
}

/// Returns the clickable reference for a ticket, e.g. `[/r_42]`.
pub fn reference_token(id: TicketId) -> String {
    format!("[/r_{id}]")
}

fn ticket_reference(ticket: &Ticket) -> String {
    ticket
        .id
        .map(reference_token)
        .unwrap_or_else(|| "[draft]".to_string())
}

/// Fits `title` into the space left after `reference_chars` plus one separator.
pub fn summarize_title(title: &str, reference_chars: usize, width: BoardWidth) -> String {
    let budget = width.line_budget();
    let title_chars = title.chars().count();
    if reference_chars + 1 + title_chars <= budget {
        return title.to_string();
    }
    let keep = budget.saturating_sub(reference_chars + 1);
    let mut summary = title.chars().take(keep).collect::<String>();
    summary.push_str(ELLIPSIS);
    summary
}

pub fn render_board_line(ticket: &Ticket, width: BoardWidth, markup: MarkupMode) -> String {
    let reference = ticket_reference(ticket);
    let title = markup.to_plain(ticket.title());
    let summary = summarize_title(&title, reference.chars().count(), width);
    format!("{} {}", markup.bold(&reference), markup.code(&summary))
}

/// Renders the bold header followed by one line per ticket.
pub fn render_board(tickets: &[Ticket], width: BoardWidth, markup: MarkupMode) -> String {
    let mut lines = Vec::with_capacity(tickets.len() + 1);
    lines.push(markup.bold(BOARD_HEADER));
    lines.extend(
        tickets
            .iter()
            .map(|ticket| render_board_line(ticket, width, markup)),
    );
    lines.join("\n")
}

/// Renders the full ticket under its reference. Stored text keeps its markup;
/// stray `<`, `>` and `&` are escaped for the dialect.
pub fn render_ticket(ticket: &Ticket, markup: MarkupMode) -> String {
    format!(
        "{}\n{}",
        markup.bold(&ticket_reference(ticket)),
        markup.sanitize(&ticket.text)
    )
}

#[cfg(test)]
mod tests {
    use super::{
        reference_token, render_board, render_board_line, render_ticket, summarize_title,
        BoardWidth, ELLIPSIS,
    };
    use crate::MarkupMode;
    use ticket_store::Ticket;

    #[test]
    fn unit_reference_token_shape_and_budgets() {
        assert_eq!(reference_token(1), "[/r_1]");
        assert_eq!(reference_token(1234), "[/r_1234]");
        assert_eq!(BoardWidth::Normal.line_budget(), 40);
        assert_eq!(BoardWidth::Wide.line_budget(), 51);
    }

    #[test]
    fn functional_summarize_title_keeps_text_that_fits_exactly() {
        let reference = reference_token(1);
        let fits = "x".repeat(40 - reference.len() - 1);
        assert_eq!(summarize_title(&fits, reference.len(), BoardWidth::Normal), fits);
    }

    #[test]
    fn functional_summarize_title_truncates_to_remaining_budget() {
        let reference = reference_token(7);
        let title = "y".repeat(40 - reference.len());
        let summary = summarize_title(&title, reference.len(), BoardWidth::Normal);
        let expected_chars = 40 - reference.len() - 1;
        assert_eq!(summary, format!("{}{ELLIPSIS}", "y".repeat(expected_chars)));

        let wide = summarize_title(&"z".repeat(80), reference.len(), BoardWidth::Wide);
        assert_eq!(wide, format!("{}{ELLIPSIS}", "z".repeat(51 - reference.len() - 1)));
    }

    #[test]
    fn regression_summarize_title_counts_unicode_scalars() {
        let title = "🌊".repeat(50);
        let summary = summarize_title(&title, 6, BoardWidth::Normal);
        assert_eq!(summary.trim_end_matches(ELLIPSIS).chars().count(), 33);
    }

    #[test]
    fn unit_render_board_on_empty_list_emits_header_only() {
        assert_eq!(
            render_board(&[], BoardWidth::Normal, MarkupMode::Html),
            "<b>TICKETS:</b>"
        );
        assert_eq!(
            render_board(&[], BoardWidth::Wide, MarkupMode::Plain),
            "TICKETS:"
        );
    }

    #[test]
    fn functional_render_board_uses_first_line_and_markup_spans() {
        let tickets = vec![
            Ticket::persisted(1, "Buy milk\nfrom the corner shop"),
            Ticket::persisted(2, "Fix a < b & c"),
        ];
        let board = render_board(&tickets, BoardWidth::Normal, MarkupMode::Html);
        assert_eq!(
            board,
            "<b>TICKETS:</b>\n<b>[/r_1]</b> <code>Buy milk</code>\n<b>[/r_2]</b> <code>Fix a &lt; b &amp; c</code>"
        );
        assert!(!board.contains("corner shop"));
    }

    #[test]
    fn functional_render_board_line_budgets_visible_text_of_stored_markup() {
        let ticket = Ticket::persisted(3, format!("<b>{}</b>", "w".repeat(33)));
        let line = render_board_line(&ticket, BoardWidth::Normal, MarkupMode::Html);
        assert_eq!(line, format!("<b>[/r_3]</b> <code>{}</code>", "w".repeat(33)));
    }

    #[test]
    fn unit_render_ticket_shows_full_text_under_reference() {
        let ticket = Ticket::persisted(5, "Buy milk\nand bread");
        assert_eq!(
            render_ticket(&ticket, MarkupMode::Plain),
            "[/r_5]\nBuy milk\nand bread"
        );
        assert_eq!(
            render_ticket(&Ticket::draft("pending"), MarkupMode::Html),
            "<b>[draft]</b>\npending"
        );
    }

    #[test]
    fn regression_unescaped_stored_text_keeps_comparisons_in_html() {
        let ticket = Ticket::persisted(3, "check x < 5 and y > 2");
        assert_eq!(
            render_board_line(&ticket, BoardWidth::Normal, MarkupMode::Html),
            "<b>[/r_3]</b> <code>check x &lt; 5 and y &gt; 2</code>"
        );
        assert_eq!(
            render_ticket(&ticket, MarkupMode::Html),
            "<b>[/r_3]</b>\ncheck x &lt; 5 and y &gt; 2"
        );
    }
}
