//! Text command grammar for ticket operations.
//!
//! Incoming text is classified by an ordered rule table. The first rule whose
//! matcher accepts the leading token wins; text that matches no rule becomes a
//! new ticket.

use ticket_board::BoardWidth;
use ticket_store::TicketId;

pub const READ_COMMAND_PREFIX: &str = "/r_";
pub const UPDATE_COMMAND_PREFIX: &str = "/u_";
pub const DELETE_COMMAND_PREFIX: &str = "/d_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// How `/d_` arguments are interpreted.
pub enum DeleteMode {
    /// One id; anything else is an invalid argument.
    #[default]
    Single,
    /// Whitespace-separated ids; unparsable tokens are skipped.
    Batch,
}

impl DeleteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Batch => "batch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Operation label reported to the request logger.
pub enum TicketOperation {
    Start,
    Board,
    WideBoard,
    Read,
    Update,
    Delete,
    Create,
    InvalidArgument,
    Unauthorized,
}

impl TicketOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Board => "board",
            Self::WideBoard => "wide_board",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Create => "create",
            Self::InvalidArgument => "invalid_argument",
            Self::Unauthorized => "unauthorized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketCommand {
    Start,
    Board(BoardWidth),
    Read { id: TicketId },
    Update { id_token: String },
    Delete { ids: Vec<TicketId> },
    Create { text: String },
    Invalid { command: &'static str, token: String },
}

impl TicketCommand {
    pub fn operation(&self) -> TicketOperation {
        match self {
            Self::Start => TicketOperation::Start,
            Self::Board(BoardWidth::Normal) => TicketOperation::Board,
            Self::Board(BoardWidth::Wide) => TicketOperation::WideBoard,
            Self::Read { .. } => TicketOperation::Read,
            Self::Update { .. } => TicketOperation::Update,
            Self::Delete { .. } => TicketOperation::Delete,
            Self::Create { .. } => TicketOperation::Create,
            Self::Invalid { .. } => TicketOperation::InvalidArgument,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandMatcher {
    Exact(&'static str),
    Prefix(&'static str),
}

impl CommandMatcher {
    /// Returns the part of `token` left after the matched command name.
    fn accept<'a>(&self, token: &'a str) -> Option<&'a str> {
        match self {
            Self::Exact(name) => (token == *name).then_some(""),
            Self::Prefix(prefix) => token.strip_prefix(prefix),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CommandArgs<'a> {
    /// Remainder of the leading token after the command prefix.
    id_token: &'a str,
    /// Text after the first whitespace.
    rest: &'a str,
}

type CommandExtractor = fn(CommandArgs<'_>, DeleteMode) -> TicketCommand;

struct CommandRule {
    matcher: CommandMatcher,
    extract: CommandExtractor,
}

const COMMAND_GRAMMAR: &[CommandRule] = &[
    CommandRule {
        matcher: CommandMatcher::Exact("/start"),
        extract: extract_start,
    },
    CommandRule {
        matcher: CommandMatcher::Exact("/board"),
        extract: extract_board,
    },
    CommandRule {
        matcher: CommandMatcher::Exact("/wide_board"),
        extract: extract_wide_board,
    },
    CommandRule {
        matcher: CommandMatcher::Prefix(READ_COMMAND_PREFIX),
        extract: extract_read,
    },
    CommandRule {
        matcher: CommandMatcher::Prefix(UPDATE_COMMAND_PREFIX),
        extract: extract_update,
    },
    CommandRule {
        matcher: CommandMatcher::Prefix(DELETE_COMMAND_PREFIX),
        extract: extract_delete,
    },
];

/// Classifies message text. `create_text` is stored verbatim when no command
/// rule matches.
pub fn classify_ticket_command(
    text: &str,
    create_text: &str,
    delete_mode: DeleteMode,
) -> TicketCommand {
    let trimmed = text.trim();
    if trimmed.starts_with('/') {
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let token = parts.next().unwrap_or_default();
        let rest = parts.next().map(str::trim).unwrap_or_default();
        let token = strip_bot_mention(token);
        for rule in COMMAND_GRAMMAR {
            if let Some(id_token) = rule.matcher.accept(token) {
                return (rule.extract)(CommandArgs { id_token, rest }, delete_mode);
            }
        }
    }
    TicketCommand::Create {
        text: create_text.to_string(),
    }
}

pub fn parse_ticket_command(text: &str, delete_mode: DeleteMode) -> TicketCommand {
    classify_ticket_command(text, text, delete_mode)
}

/// Drops the `@botname` suffix group chats append to commands.
fn strip_bot_mention(token: &str) -> &str {
    token
        .split_once('@')
        .map(|(command, _)| command)
        .unwrap_or(token)
}

fn parse_ticket_id(token: &str) -> Option<TicketId> {
    token.trim().parse::<TicketId>().ok()
}

fn extract_start(_: CommandArgs<'_>, _: DeleteMode) -> TicketCommand {
    TicketCommand::Start
}

fn extract_board(_: CommandArgs<'_>, _: DeleteMode) -> TicketCommand {
    TicketCommand::Board(BoardWidth::Normal)
}

fn extract_wide_board(_: CommandArgs<'_>, _: DeleteMode) -> TicketCommand {
    TicketCommand::Board(BoardWidth::Wide)
}

fn extract_read(args: CommandArgs<'_>, _: DeleteMode) -> TicketCommand {
    match parse_ticket_id(args.id_token) {
        Some(id) => TicketCommand::Read { id },
        None => TicketCommand::Invalid {
            command: READ_COMMAND_PREFIX,
            token: args.id_token.to_string(),
        },
    }
}

fn extract_update(args: CommandArgs<'_>, _: DeleteMode) -> TicketCommand {
    TicketCommand::Update {
        id_token: args.id_token.to_string(),
    }
}

fn extract_delete(args: CommandArgs<'_>, delete_mode: DeleteMode) -> TicketCommand {
    match delete_mode {
        DeleteMode::Single => match parse_ticket_id(args.id_token) {
            Some(id) => TicketCommand::Delete { ids: vec![id] },
            None => TicketCommand::Invalid {
                command: DELETE_COMMAND_PREFIX,
                token: args.id_token.to_string(),
            },
        },
        DeleteMode::Batch => {
            let ids = std::iter::once(args.id_token)
                .chain(args.rest.split_whitespace())
                .filter_map(parse_ticket_id)
                .collect::<Vec<_>>();
            if ids.is_empty() {
                TicketCommand::Invalid {
                    command: DELETE_COMMAND_PREFIX,
                    token: format!("{} {}", args.id_token, args.rest)
                        .trim()
                        .to_string(),
                }
            } else {
                TicketCommand::Delete { ids }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        classify_ticket_command, parse_ticket_command, DeleteMode, TicketCommand,
        TicketOperation,
    };
    use ticket_board::BoardWidth;

    fn parse(text: &str) -> TicketCommand {
        parse_ticket_command(text, DeleteMode::Single)
    }

    #[test]
    fn unit_named_commands_classify_in_precedence_order() {
        assert_eq!(parse("/start"), TicketCommand::Start);
        assert_eq!(parse("/board"), TicketCommand::Board(BoardWidth::Normal));
        assert_eq!(parse("/wide_board"), TicketCommand::Board(BoardWidth::Wide));
        assert_eq!(parse("  /board  "), TicketCommand::Board(BoardWidth::Normal));
    }

    #[test]
    fn functional_read_extracts_id_and_ignores_remainder() {
        assert_eq!(parse("/r_42 extra"), TicketCommand::Read { id: 42 });
        assert_eq!(parse("/r_7"), TicketCommand::Read { id: 7 });
        assert_eq!(parse("/r_7@ticket_bot"), TicketCommand::Read { id: 7 });
    }

    #[test]
    fn regression_read_with_bad_or_missing_id_is_invalid_argument() {
        assert_eq!(
            parse("/r_abc"),
            TicketCommand::Invalid {
                command: "/r_",
                token: "abc".to_string()
            }
        );
        assert_eq!(
            parse("/r_"),
            TicketCommand::Invalid {
                command: "/r_",
                token: String::new()
            }
        );
        assert_eq!(parse("/r_12abc").operation(), TicketOperation::InvalidArgument);
    }

    #[test]
    fn unit_update_is_parsed_regardless_of_id_validity() {
        assert_eq!(
            parse("/u_5 new text"),
            TicketCommand::Update {
                id_token: "5".to_string()
            }
        );
        assert_eq!(parse("/u_nope").operation(), TicketOperation::Update);
    }

    #[test]
    fn functional_delete_single_mode_uses_one_id() {
        assert_eq!(parse("/d_3 4 5"), TicketCommand::Delete { ids: vec![3] });
        assert_eq!(parse("/d_x").operation(), TicketOperation::InvalidArgument);
    }

    #[test]
    fn functional_delete_batch_mode_skips_unparsable_ids() {
        assert_eq!(
            parse_ticket_command("/d_3 x 5 7y 9", DeleteMode::Batch),
            TicketCommand::Delete { ids: vec![3, 5, 9] }
        );
        assert_eq!(
            parse_ticket_command("/d_ 1 2", DeleteMode::Batch),
            TicketCommand::Delete { ids: vec![1, 2] }
        );
        assert_eq!(
            parse_ticket_command("/d_a b", DeleteMode::Batch),
            TicketCommand::Invalid {
                command: "/d_",
                token: "a b".to_string()
            }
        );
    }

    #[test]
    fn unit_plain_text_and_unknown_commands_become_create() {
        assert_eq!(
            parse("hello world"),
            TicketCommand::Create {
                text: "hello world".to_string()
            }
        );
        assert_eq!(parse("/boardgame").operation(), TicketOperation::Create);
        assert_eq!(parse("/help").operation(), TicketOperation::Create);
        assert_eq!(
            parse("Buy milk\n/r_1 later"),
            TicketCommand::Create {
                text: "Buy milk\n/r_1 later".to_string()
            }
        );
    }

    #[test]
    fn functional_create_keeps_markup_preserving_text() {
        assert_eq!(
            classify_ticket_command("Buy milk", "<b>Buy</b> milk", DeleteMode::Single),
            TicketCommand::Create {
                text: "<b>Buy</b> milk".to_string()
            }
        );
        assert_eq!(
            classify_ticket_command("/r_1", "<b>/r_1</b>", DeleteMode::Single),
            TicketCommand::Read { id: 1 }
        );
    }
}
