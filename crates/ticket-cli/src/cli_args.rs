use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli_types::{CliBoardWidth, CliDeleteMode, CliMarkupMode};

pub const DEFAULT_DB_PATH: &str = ".ticketbot/tickets.sqlite3";

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "ticketbot",
    about = "Single-operator ticket tracker driven from a Telegram chat",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    #[arg(
        long = "telegram-bot-token",
        env = "TICKETBOT_TELEGRAM_BOT_TOKEN",
        hide_env_values = true,
        global = true,
        help = "Telegram bot token used by the run command"
    )]
    pub telegram_bot_token: Option<String>,

    #[arg(
        long = "operator-id",
        env = "TICKETBOT_OPERATOR_ID",
        global = true,
        help = "Telegram user id of the only sender allowed to manage tickets"
    )]
    pub operator_id: Option<String>,

    #[arg(
        long = "db-path",
        env = "TICKETBOT_DB_PATH",
        default_value = DEFAULT_DB_PATH,
        global = true,
        help = "SQLite database file holding the tickets table"
    )]
    pub db_path: PathBuf,

    #[arg(
        long = "telegram-api-base",
        env = "TICKETBOT_TELEGRAM_API_BASE",
        default_value = "https://api.telegram.org",
        global = true,
        help = "Telegram Bot API base URL"
    )]
    pub telegram_api_base: String,

    #[arg(
        long = "poll-timeout-seconds",
        env = "TICKETBOT_POLL_TIMEOUT_SECONDS",
        default_value_t = 30,
        global = true,
        help = "Long-poll timeout passed to getUpdates"
    )]
    pub poll_timeout_seconds: u64,

    #[arg(
        long = "request-timeout-ms",
        env = "TICKETBOT_REQUEST_TIMEOUT_MS",
        default_value_t = 15_000,
        value_parser = parse_positive_u64,
        global = true,
        help = "HTTP timeout for Bot API calls other than long polls"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "TICKETBOT_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        global = true,
        help = "Attempts per Bot API call before giving up"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "TICKETBOT_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        global = true,
        help = "Base delay for exponential retry backoff"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "markup",
        env = "TICKETBOT_MARKUP",
        value_enum,
        default_value_t = CliMarkupMode::Html,
        global = true,
        help = "Markup dialect for replies and stored ticket text"
    )]
    pub markup: CliMarkupMode,

    #[arg(
        long = "delete-mode",
        env = "TICKETBOT_DELETE_MODE",
        value_enum,
        default_value_t = CliDeleteMode::Single,
        global = true,
        help = "single deletes the first id after /d_, batch deletes every numeric token"
    )]
    pub delete_mode: CliDeleteMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CliCommand {
    /// Poll Telegram and answer the operator (default).
    Run,
    /// Copy rows from a legacy `backlog` table into `tickets`.
    MigrateBacklog,
    /// Print the current board to stdout.
    Board {
        #[arg(long, value_enum, default_value_t = CliBoardWidth::Normal)]
        width: CliBoardWidth,
    },
}
