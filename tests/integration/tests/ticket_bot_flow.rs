use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use ticket_board::MarkupMode;
use ticket_router::{
    build_ticket_pipeline, InboundRequest, TicketBotConfig, TicketOperation,
    UNAUTHORIZED_PLACEHOLDER,
};
use ticket_store::{SqliteTicketStore, TicketStore};
use ticket_telegram::{run_telegram_bot, TelegramBotConfig};

const OPERATOR_ID: &str = "1001";

fn plain_config() -> TicketBotConfig {
    let mut config = TicketBotConfig::new(OPERATOR_ID);
    config.markup = MarkupMode::Plain;
    config
}

#[tokio::test]
async fn integration_buy_milk_scenario_over_sqlite() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(SqliteTicketStore::new(temp.path().join("tickets.sqlite3")).expect("store"));
    let pipeline = build_ticket_pipeline(&plain_config(), Arc::clone(&store) as _);
    let send = |text: &str| InboundRequest::new(OPERATOR_ID, OPERATOR_ID, text);

    let created = pipeline.handle(&send("Buy milk")).await;
    assert_eq!(created.operation, TicketOperation::Create);
    assert_eq!(created.text, "created ticket [/r_1]");

    let board = pipeline.handle(&send("/board")).await;
    assert_eq!(board.text, "TICKETS:\n[/r_1] Buy milk");

    let read = pipeline.handle(&send("/r_1")).await;
    assert_eq!(read.text, "[/r_1]\nBuy milk");

    let deleted = pipeline.handle(&send("/d_1")).await;
    assert_eq!(deleted.text, "deleted ticket [/r_1]");

    let board = pipeline.handle(&send("/board")).await;
    assert_eq!(board.text, "TICKETS:");

    let created = pipeline.handle(&send("Call plumber")).await;
    assert_eq!(created.text, "created ticket [/r_2]");
}

#[tokio::test]
async fn integration_unauthorized_sender_leaves_sqlite_untouched() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(SqliteTicketStore::new(temp.path().join("tickets.sqlite3")).expect("store"));
    store.insert("existing").await.expect("insert");
    let pipeline = build_ticket_pipeline(&plain_config(), Arc::clone(&store) as _);

    for text in ["intruder ticket", "/d_1", "/board"] {
        let reply = pipeline.handle(&InboundRequest::new("666", "666", text)).await;
        assert_eq!(reply.text, UNAUTHORIZED_PLACEHOLDER);
    }

    let tickets = store.fetch_all().await.expect("fetch all");
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].text, "existing");
}

#[tokio::test]
async fn integration_telegram_message_creates_formatted_ticket() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(SqliteTicketStore::new(temp.path().join("tickets.sqlite3")).expect("store"));
    let pipeline = build_ticket_pipeline(&TicketBotConfig::new(OPERATOR_ID), Arc::clone(&store) as _);

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/botintegration-token/getMe");
        then.status(200).json_body(json!({
            "ok": true,
            "result": {"id": 77, "is_bot": true, "first_name": "Tickets"}
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/botintegration-token/getUpdates")
            .body_includes("\"offset\":0");
        then.status(200).json_body(json!({
            "ok": true,
            "result": [{
                "update_id": 500,
                "message": {
                    "message_id": 1,
                    "chat": {"id": 1001},
                    "from": {"id": 1001, "first_name": "Ann"},
                    "text": "Buy milk & bread",
                    "entities": [{"type": "bold", "offset": 0, "length": 3}]
                }
            }]
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/botintegration-token/getUpdates")
            .body_includes("\"offset\":501");
        then.status(200)
            .delay(Duration::from_millis(20))
            .json_body(json!({"ok": true, "result": []}));
    });
    let reply = server.mock(|when, then| {
        when.method(POST)
            .path("/botintegration-token/sendMessage")
            .body_includes("created ticket <b>[/r_1]</b>")
            .body_includes("\"parse_mode\":\"HTML\"");
        then.status(200).json_body(json!({
            "ok": true,
            "result": {"message_id": 2, "chat": {"id": 1001}, "text": "created ticket [/r_1]"}
        }));
    });

    let mut telegram = TelegramBotConfig::new("integration-token");
    telegram.api_base = server.base_url();
    telegram.poll_timeout_seconds = 0;
    telegram.retry_max_attempts = 1;
    telegram.error_backoff_ms = 10;
    let summary = run_telegram_bot(
        &telegram,
        pipeline,
        tokio::time::sleep(Duration::from_millis(300)),
    )
    .await
    .expect("run bot");

    reply.assert();
    assert_eq!(summary.messages_handled, 1);
    let ticket = store.fetch_by_id(1).await.expect("fetch").expect("ticket");
    assert_eq!(ticket.text, "<b>Buy</b> milk &amp; bread");
}
