//! Subcommand dispatch for the `ticketbot` binary.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ticket_board::{BoardWidth, MarkupMode};
use ticket_router::{build_ticket_pipeline, render_store_board, TicketBotConfig};
use ticket_store::{MigrationReport, SqliteTicketStore};
use ticket_telegram::{run_telegram_bot, TelegramBotConfig};
use tracing::{info, warn};

use crate::cli_args::{Cli, CliCommand};
use crate::cli_types::CliBoardWidth;

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    match cli.command.clone().unwrap_or(CliCommand::Run) {
        CliCommand::Run => run_bot(&cli).await,
        CliCommand::MigrateBacklog => {
            let report = migrate_backlog(&cli.db_path, cli.markup.into())?;
            write_stdout(&render_migration_report(&report))
        }
        CliCommand::Board { width } => {
            let board = board_text(&cli.db_path, width, cli.markup.into()).await?;
            write_stdout(&board)
        }
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}").context("failed to write to stdout")
}

pub(crate) fn open_store(db_path: &Path) -> Result<SqliteTicketStore> {
    SqliteTicketStore::new(db_path)
        .with_context(|| format!("ticket storage unavailable at {}", db_path.display()))
}

pub(crate) fn ticket_bot_config(cli: &Cli) -> Result<TicketBotConfig> {
    let operator_id = cli
        .operator_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("--operator-id (or TICKETBOT_OPERATOR_ID) is required"))?;
    let mut config = TicketBotConfig::new(operator_id);
    config.markup = cli.markup.into();
    config.delete_mode = cli.delete_mode.into();
    config.validate()?;
    Ok(config)
}

pub(crate) fn telegram_bot_config(cli: &Cli) -> Result<TelegramBotConfig> {
    let token = cli
        .telegram_bot_token
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            anyhow!("--telegram-bot-token (or TICKETBOT_TELEGRAM_BOT_TOKEN) is required")
        })?;
    let mut config = TelegramBotConfig::new(token);
    config.api_base = cli.telegram_api_base.clone();
    config.poll_timeout_seconds = cli.poll_timeout_seconds;
    config.request_timeout_ms = cli.request_timeout_ms;
    config.retry_max_attempts = cli.retry_max_attempts;
    config.retry_base_delay_ms = cli.retry_base_delay_ms;
    config.markup = cli.markup.into();
    Ok(config)
}

async fn run_bot(cli: &Cli) -> Result<()> {
    let bot_config = ticket_bot_config(cli)?;
    let telegram_config = telegram_bot_config(cli)?;
    let store = Arc::new(open_store(&cli.db_path)?);
    info!(
        db_path = %store.db_path().display(),
        markup = bot_config.markup.as_str(),
        delete_mode = bot_config.delete_mode.as_str(),
        "ticket storage ready"
    );
    let pipeline = build_ticket_pipeline(&bot_config, store);
    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for ctrl-c; stopping");
        }
    };
    run_telegram_bot(&telegram_config, pipeline, shutdown).await?;
    Ok(())
}

/// Copies legacy backlog rows, escaping their raw text into `markup`.
pub(crate) fn migrate_backlog(db_path: &Path, markup: MarkupMode) -> Result<MigrationReport> {
    let store = open_store(db_path)?;
    let report = store
        .migrate_legacy_backlog(|text| markup.escape(text))
        .context("failed to migrate backlog table")?;
    info!(
        source_table_present = report.source_table_present,
        copied = report.copied,
        skipped = report.skipped,
        "backlog migration finished"
    );
    Ok(report)
}

pub(crate) fn render_migration_report(report: &MigrationReport) -> String {
    if !report.source_table_present {
        return "no backlog table found; nothing to migrate".to_string();
    }
    format!(
        "migrated backlog: copied={} skipped={}",
        report.copied, report.skipped
    )
}

/// Renders the board in the dialect tickets were stored in, then reduces it to
/// plain text for the terminal.
pub(crate) async fn board_text(
    db_path: &Path,
    width: CliBoardWidth,
    markup: MarkupMode,
) -> Result<String> {
    let store = open_store(db_path)?;
    let width = match width {
        CliBoardWidth::Normal => BoardWidth::Normal,
        CliBoardWidth::Wide => BoardWidth::Wide,
    };
    let board = render_store_board(&store, width, markup)
        .await
        .context("failed to read tickets")?;
    Ok(markup.to_plain(&board))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::tempdir;
    use ticket_board::{render_board_line, BoardWidth, MarkupMode};
    use ticket_router::DeleteMode;
    use ticket_store::{MigrationReport, TicketStore};

    use super::{
        board_text, migrate_backlog, open_store, render_migration_report, telegram_bot_config,
        ticket_bot_config,
    };
    use crate::cli_args::Cli;
    use crate::cli_types::CliBoardWidth;

    #[test]
    fn unit_run_configs_require_operator_and_token() {
        let cli = Cli::try_parse_from(["ticketbot", "run"]).expect("parse");
        let error = ticket_bot_config(&cli).expect_err("operator required");
        assert!(error.to_string().contains("--operator-id"));
        assert!(telegram_bot_config(&cli).is_err());
    }

    #[test]
    fn functional_run_configs_carry_cli_settings() {
        let cli = Cli::try_parse_from([
            "ticketbot",
            "--operator-id",
            "1001",
            "--telegram-bot-token",
            "token",
            "--markup",
            "plain",
            "--delete-mode",
            "batch",
            "--poll-timeout-seconds",
            "5",
        ])
        .expect("parse");
        let bot = ticket_bot_config(&cli).expect("bot config");
        assert_eq!(bot.operator_id, "1001");
        assert_eq!(bot.markup, MarkupMode::Plain);
        assert_eq!(bot.delete_mode, DeleteMode::Batch);

        let telegram = telegram_bot_config(&cli).expect("telegram config");
        assert_eq!(telegram.bot_token, "token");
        assert_eq!(telegram.poll_timeout_seconds, 5);
        assert_eq!(telegram.markup, MarkupMode::Plain);
    }

    #[tokio::test]
    async fn functional_board_text_renders_plain_board_from_sqlite() {
        let temp = tempdir().expect("tempdir");
        let db_path = temp.path().join("nested/tickets.sqlite3");
        let store = open_store(&db_path).expect("store");
        store.insert("<b>Buy</b> milk").await.expect("insert");

        let board = board_text(&db_path, CliBoardWidth::Normal, MarkupMode::Html)
            .await
            .expect("board");
        assert_eq!(board, "TICKETS:\n[/r_1] Buy milk");

        let raw = board_text(&db_path, CliBoardWidth::Wide, MarkupMode::Plain)
            .await
            .expect("board");
        assert_eq!(raw, "TICKETS:\n[/r_1] <b>Buy</b> milk");
    }

    #[test]
    fn regression_open_store_reports_unavailable_path() {
        let temp = tempdir().expect("tempdir");
        let error = open_store(temp.path()).expect_err("directory is not a database");
        assert!(format!("{error:#}").contains("ticket storage unavailable"));
    }

    #[test]
    fn unit_migration_report_rendering() {
        let missing = MigrationReport {
            source_table_present: false,
            copied: 0,
            skipped: 0,
        };
        assert!(render_migration_report(&missing).contains("nothing to migrate"));
        let done = MigrationReport {
            source_table_present: true,
            copied: 2,
            skipped: 1,
        };
        assert_eq!(render_migration_report(&done), "migrated backlog: copied=2 skipped=1");
    }

    #[tokio::test]
    async fn regression_migrated_backlog_text_is_escaped_for_html_board() {
        let temp = tempdir().expect("tempdir");
        let db_path = temp.path().join("tickets.sqlite3");
        {
            let connection = rusqlite::Connection::open(&db_path).expect("open legacy db");
            connection
                .execute_batch(
                    "CREATE TABLE backlog (id INTEGER PRIMARY KEY, text TEXT);
                     INSERT INTO backlog (id, text) VALUES (4, 'x < 5 & y > 2');",
                )
                .expect("seed backlog");
        }

        let report = migrate_backlog(&db_path, MarkupMode::Html).expect("migrate");
        assert_eq!(report.copied, 1);

        let store = open_store(&db_path).expect("store");
        let ticket = store.fetch_by_id(4).await.expect("fetch").expect("ticket");
        assert_eq!(ticket.text, "x &lt; 5 &amp; y &gt; 2");
        assert_eq!(
            render_board_line(&ticket, BoardWidth::Normal, MarkupMode::Html),
            "<b>[/r_4]</b> <code>x &lt; 5 &amp; y &gt; 2</code>"
        );
        let board = board_text(&db_path, CliBoardWidth::Normal, MarkupMode::Html)
            .await
            .expect("board");
        assert_eq!(board, "TICKETS:\n[/r_4] x < 5 & y > 2");
    }
}
