use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::Arc;
use vivid_decks::api::{AppState, create_router};
use vivid_decks::capabilities::SequentialIdSource;
use vivid_decks::{DeckStore, MemoryStorage, NotificationLog, SeedPolicy, Workspace};

fn create_test_server() -> TestServer {
    let store = DeckStore::load(
        Box::new(MemoryStorage::new()),
        Arc::new(SequentialIdSource::new("test")),
        SeedPolicy::DefaultDecks,
    )
    .unwrap();
    let notifications = Arc::new(NotificationLog::new(16));
    let workspace = Workspace::new(store, notifications.clone(), "http://localhost:3000/");

    let app = create_router(AppState::new(workspace, notifications));
    TestServer::new(app).unwrap()
}

async fn play_through(server: &TestServer, answer_correctly: bool) -> Value {
    loop {
        let session: Value = server.get("/api/session").await.json();
        let input = if answer_correctly {
            // the back is only exposed after checking, so look it up in the deck
            let deck_id = session["data"]["deck_id"].as_str().unwrap();
            let front = session["data"]["front"].as_str().unwrap();
            let deck: Value = server.get(&format!("/api/decks/{}", deck_id)).await.json();
            deck["data"]["cards"]
                .as_array()
                .unwrap()
                .iter()
                .find(|c| c["front"] == front)
                .unwrap()["back"]
                .as_str()
                .unwrap()
                .to_string()
        } else {
            "nope".to_string()
        };

        server
            .post("/api/session/answer")
            .json(&json!({ "input": input }))
            .await
            .assert_status_ok();

        let advanced: Value = server.post("/api/session/advance").await.json();
        if advanced["data"]["finished"] == true {
            return advanced;
        }
    }
}

#[tokio::test]
async fn test_api_lists_default_decks() {
    let server = create_test_server();

    let response = server.get("/api/decks").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    let decks = body["data"].as_array().unwrap();
    assert_eq!(decks.len(), 3);
    assert_eq!(decks[0]["id"], "vivid-en");
    assert_eq!(decks[0]["cards"][0]["promotion_level"], 1);
}

#[tokio::test]
async fn test_api_create_deck_and_cards() {
    let server = create_test_server();

    let response = server
        .post("/api/decks")
        .json(&json!({ "name": "  Farben  ", "description": "Grundfarben" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["name"], "Farben");
    let deck_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = server
        .post(&format!("/api/decks/{}/cards", deck_id))
        .json(&json!({ "front": "Rot", "back": "Red" }))
        .await;
    response.assert_status_ok();
    let card_id = response.json::<Value>()["data"]["id"].as_str().unwrap().to_string();

    let deck: Value = server.get(&format!("/api/decks/{}", deck_id)).await.json();
    assert_eq!(deck["data"]["cards"].as_array().unwrap().len(), 1);

    server
        .delete(&format!("/api/decks/{}/cards/{}", deck_id, card_id))
        .await
        .assert_status_ok();
    server
        .delete(&format!("/api/decks/{}/cards/{}", deck_id, card_id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_validation_errors() {
    let server = create_test_server();

    let response = server.post("/api/decks").json(&json!({ "name": "   " })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    server
        .post("/api/decks/vivid-en/cards")
        .json(&json!({ "front": "Haus", "back": "" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/decks/missing/cards")
        .json(&json!({ "front": "Haus", "back": "House" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_delete_card_names_what_is_missing() {
    let server = create_test_server();

    let response = server.delete("/api/decks/missing/cards/en-1").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Deck with id 'missing' not found");

    let response = server.delete("/api/decks/vivid-en/cards/nope").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Card with id 'nope' not found");
}

#[tokio::test]
async fn test_api_delete_deck() {
    let server = create_test_server();

    server.delete("/api/decks/vivid-it").await.assert_status_ok();
    server.get("/api/decks/vivid-it").await.assert_status(StatusCode::NOT_FOUND);
    server.delete("/api/decks/vivid-it").await.assert_status(StatusCode::NOT_FOUND);

    let decks: Value = server.get("/api/decks").await.json();
    assert_eq!(decks["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_api_session_requires_cards() {
    let server = create_test_server();

    let created: Value = server.post("/api/decks").json(&json!({ "name": "Leer" })).await.json();
    let deck_id = created["data"]["id"].as_str().unwrap();

    server
        .post("/api/session/start")
        .json(&json!({ "deck_id": deck_id }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let session: Value = server.get("/api/session").await.json();
    assert!(session["data"].is_null());

    let notifications: Value = server.get("/api/notifications").await.json();
    assert_eq!(notifications["data"], json!(["Deck is empty"]));
}

#[tokio::test]
async fn test_api_session_out_of_order_calls() {
    let server = create_test_server();

    server.post("/api/session/advance").await.assert_status(StatusCode::CONFLICT);

    server
        .post("/api/session/start")
        .json(&json!({ "deck_id": "vivid-en" }))
        .await
        .assert_status_ok();

    // nothing has been answered yet
    server.post("/api/session/advance").await.assert_status(StatusCode::CONFLICT);

    server
        .post("/api/session/answer")
        .json(&json!({ "input": "x" }))
        .await
        .assert_status_ok();
    server
        .post("/api/session/answer")
        .json(&json!({ "input": "x" }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_api_session_hides_back_until_checked() {
    let server = create_test_server();

    let started: Value = server
        .post("/api/session/start")
        .json(&json!({ "deck_id": "vivid-es" }))
        .await
        .json();
    assert_eq!(started["data"]["position"], 1);
    assert_eq!(started["data"]["total"], 4);
    assert!(started["data"]["revealed_back"].is_null());

    server
        .post("/api/session/input")
        .json(&json!({ "input": "gracias" }))
        .await
        .assert_status_ok();

    let answered: Value = server.post("/api/session/answer").json(&json!({})).await.json();
    assert_eq!(answered["data"]["session"]["user_input"], "gracias");
    assert!(answered["data"]["session"]["revealed_back"].is_string());
    assert_eq!(
        answered["data"]["feedback"]["expected"],
        answered["data"]["session"]["revealed_back"]
    );
}

#[tokio::test]
async fn test_api_full_session_updates_deck() {
    let server = create_test_server();

    server
        .post("/api/session/start")
        .json(&json!({ "deck_id": "vivid-en" }))
        .await
        .assert_status_ok();

    let finished = play_through(&server, true).await;
    let summary = &finished["data"]["session"]["summary"];
    assert_eq!(summary["percent"], 100);
    assert_eq!(summary["correct"], 4);
    assert!(summary["wrong_answers"].as_array().unwrap().is_empty());

    let deck: Value = server.get("/api/decks/vivid-en").await.json();
    assert_eq!(deck["data"]["stats"]["best_percent"], 100);
    assert_eq!(deck["data"]["stats"]["last_percent"], 100);
    for card in deck["data"]["cards"].as_array().unwrap() {
        assert_eq!(card["promotion_level"], 2);
    }

    // a failed run lowers last_percent but keeps the best
    server
        .post("/api/session/start")
        .json(&json!({ "deck_id": "vivid-en" }))
        .await
        .assert_status_ok();
    let finished = play_through(&server, false).await;
    let summary = &finished["data"]["session"]["summary"];
    assert_eq!(summary["percent"], 0);
    assert_eq!(summary["wrong_answers"].as_array().unwrap().len(), 4);

    let deck: Value = server.get("/api/decks/vivid-en").await.json();
    assert_eq!(deck["data"]["stats"]["best_percent"], 100);
    assert_eq!(deck["data"]["stats"]["last_percent"], 0);
    for card in deck["data"]["cards"].as_array().unwrap() {
        assert_eq!(card["promotion_level"], 1);
    }

    let stats: Value = server.get("/api/stats").await.json();
    assert_eq!(stats["data"]["deck_count"], 3);
    assert_eq!(stats["data"]["total_cards"], 12);
}

#[tokio::test]
async fn test_api_abandon_session() {
    let server = create_test_server();

    server
        .post("/api/session/start")
        .json(&json!({ "deck_id": "vivid-it" }))
        .await
        .assert_status_ok();

    let abandoned: Value = server.delete("/api/session").await.json();
    assert_eq!(abandoned["data"], true);
    let abandoned: Value = server.delete("/api/session").await.json();
    assert_eq!(abandoned["data"], false);

    let deck: Value = server.get("/api/decks/vivid-it").await.json();
    assert_eq!(deck["data"]["stats"]["best_percent"], 0);
}

#[tokio::test]
async fn test_api_share_and_import() {
    let server = create_test_server();

    let shared: Value = server.get("/api/decks/vivid-it/share").await.json();
    let link = shared["data"]["link"].as_str().unwrap().to_string();
    assert!(link.starts_with("http://localhost:3000/?seed="));

    let imported = server
        .post("/api/share/import")
        .json(&json!({ "token": link }))
        .await;
    imported.assert_status_ok();
    let body: Value = imported.json();
    assert_eq!(body["data"]["name"], "Sprache: Italienisch");
    assert_ne!(body["data"]["id"], "vivid-it");
    assert_eq!(body["data"]["cards"].as_array().unwrap().len(), 4);

    server
        .post("/api/share/import")
        .json(&json!({ "token": "not a token" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let notifications: Value = server.get("/api/notifications").await.json();
    assert_eq!(
        notifications["data"],
        json!(["Link copied", "Imported \"Sprache: Italienisch\"", "Invalid share link"])
    );

    let decks: Value = server.get("/api/decks").await.json();
    assert_eq!(decks["data"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_api_backup_round_trip_and_reset() {
    let server = create_test_server();

    let backup = server.get("/api/backup").await;
    backup.assert_status_ok();
    let disposition = backup.header("content-disposition");
    assert!(disposition.to_str().unwrap().contains("vivid_backup.json"));
    let bytes = backup.as_bytes().clone();

    server.delete("/api/decks/vivid-en").await.assert_status_ok();

    server
        .post("/api/backup")
        .bytes("{ broken".into())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    let decks: Value = server.get("/api/decks").await.json();
    assert_eq!(decks["data"].as_array().unwrap().len(), 2);

    let restored: Value = server.post("/api/backup").bytes(bytes).await.json();
    assert_eq!(restored["data"]["deck_count"], 3);

    server.delete("/api/decks/vivid-es").await.assert_status_ok();
    let reset: Value = server.post("/api/reset").await.json();
    assert_eq!(reset["data"].as_array().unwrap().len(), 3);
}
