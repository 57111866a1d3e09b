//! AnkiConnect bridge and export tests against a local mock server
//!
//! AnkiConnect multiplexes every action over one POST endpoint, so the
//! mocks discriminate on the `action` field of the request envelope.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lexio::Lexio;
use lexio::anki::AnkiConnect;
use lexio::export::{ExportOptions, export_card, export_cards};
use lexio::settings::AnkiSettings;
use lexio::types::{ExamplePhrase, ExportCard, ImageResult, PhraseCategory, StudyResult};

fn ok_result(value: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "result": value, "error": null }))
}

fn sample_card(word: &str) -> ExportCard {
    ExportCard {
        word: word.to_string(),
        explanation: format!("{word} is a word"),
        phrase: ExamplePhrase::new(
            format!("The {word} is here."),
            format!("El {word} está aquí."),
            PhraseCategory::Descriptive,
        ),
        image: None,
        audio: None,
    }
}

// ============ Bridge Protocol Tests ============

#[tokio::test]
async fn test_ping_reports_reachable_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({ "action": "version", "version": 6 })))
        .respond_with(ok_result(json!(6)))
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    assert!(bridge.ping().await);
}

#[tokio::test]
async fn test_ping_false_when_unreachable() {
    // no mocks mounted: every request gets a 404
    let server = MockServer::start().await;

    let bridge = AnkiConnect::new(server.uri());
    assert!(!bridge.ping().await);
}

#[tokio::test]
async fn test_deck_names() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "deckNames" })))
        .respond_with(ok_result(json!(["Default", "Lexio::Vocabulary"])))
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    let decks = bridge.deck_names().await.unwrap();
    assert_eq!(decks, vec!["Default", "Lexio::Vocabulary"]);
}

#[tokio::test]
async fn test_api_error_field_becomes_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "deckNames" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": null,
            "error": "collection is not available"
        })))
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    let result = bridge.deck_names().await;

    let error = result.unwrap_err();
    assert!(error.to_string().contains("collection is not available"));
}

#[tokio::test]
async fn test_ensure_deck_creates_missing_deck() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "deckNames" })))
        .respond_with(ok_result(json!(["Default"])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "createDeck",
            "params": { "deck": "Lexio::Vocabulary" }
        })))
        .respond_with(ok_result(json!(1_746_113_344_001_i64)))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    bridge.ensure_deck("Lexio::Vocabulary").await.unwrap();
}

#[tokio::test]
async fn test_ensure_deck_skips_existing_deck() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "deckNames" })))
        .respond_with(ok_result(json!(["Lexio::Vocabulary"])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "createDeck" })))
        .respond_with(ok_result(json!(0)))
        .expect(0)
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    bridge.ensure_deck("Lexio::Vocabulary").await.unwrap();
}

#[tokio::test]
async fn test_models_with_fields_skips_failing_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "modelNames" })))
        .respond_with(ok_result(json!(["Basic", "Broken"])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "modelFieldNames",
            "params": { "modelName": "Basic" }
        })))
        .respond_with(ok_result(json!(["Front", "Back"])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "modelFieldNames",
            "params": { "modelName": "Broken" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": null,
            "error": "model was not found: Broken"
        })))
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    let models = bridge.models_with_fields().await.unwrap();

    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "Basic");
    assert_eq!(models[0].fields, vec!["Front", "Back"]);
}

#[tokio::test]
async fn test_add_note_returns_note_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "addNote",
            "version": 6,
            "params": {
                "note": {
                    "deckName": "Lexio::Vocabulary",
                    "modelName": "Basic",
                    "fields": { "Front": "apple", "Back": "an apple" },
                    "options": { "allowDuplicate": false },
                    "tags": ["lexio", "vocabulary", "apple"]
                }
            }
        })))
        .respond_with(ok_result(json!(1_496_198_395_707_i64)))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    let mut fields = BTreeMap::new();
    fields.insert("Front".to_string(), "apple".to_string());
    fields.insert("Back".to_string(), "an apple".to_string());
    let tags = vec![
        "lexio".to_string(),
        "vocabulary".to_string(),
        "apple".to_string(),
    ];

    let note_id = bridge
        .add_note("Lexio::Vocabulary", "Basic", &fields, &tags)
        .await
        .unwrap();
    assert_eq!(note_id, Some(1_496_198_395_707));
}

#[tokio::test]
async fn test_add_note_null_result_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "addNote" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": null,
            "error": null
        })))
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    let note_id = bridge
        .add_note("Deck", "Basic", &BTreeMap::new(), &[])
        .await
        .unwrap();
    assert_eq!(note_id, None);
}

// ============ Export Flow Tests ============

#[tokio::test]
async fn test_export_card_uploads_audio_media() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let audio_path = dir.path().join("apple.mp3");
    std::fs::write(&audio_path, b"mp3 bytes").unwrap();

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "deckNames" })))
        .respond_with(ok_result(json!(["Lexio::Vocabulary"])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "addNote",
            "params": { "note": { "tags": ["lexio", "vocabulary", "apple"] } }
        })))
        .respond_with(ok_result(json!(42)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "storeMediaFile",
            "params": {
                "filename": "apple_audio.mp3",
                "data": STANDARD.encode(b"mp3 bytes")
            }
        })))
        .respond_with(ok_result(json!("apple_audio.mp3")))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    let mut card = sample_card("apple");
    card.audio = Some(audio_path.to_string_lossy().into_owned());

    let exported = export_card(
        &bridge,
        &card,
        &AnkiSettings::default(),
        &ExportOptions::default(),
    )
    .await;
    assert!(exported);
}

#[tokio::test]
async fn test_export_card_survives_media_upload_failure() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let audio_path = dir.path().join("apple.mp3");
    std::fs::write(&audio_path, b"mp3 bytes").unwrap();

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "deckNames" })))
        .respond_with(ok_result(json!(["Lexio::Vocabulary"])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "addNote" })))
        .respond_with(ok_result(json!(42)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "storeMediaFile" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": null,
            "error": "disk full"
        })))
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    let mut card = sample_card("apple");
    card.audio = Some(audio_path.to_string_lossy().into_owned());

    // the note was created; a lost attachment does not fail the card
    let exported = export_card(
        &bridge,
        &card,
        &AnkiSettings::default(),
        &ExportOptions::default(),
    )
    .await;
    assert!(exported);
}

#[tokio::test]
async fn test_export_cards_mixed_outcome() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "deckNames" })))
        .respond_with(ok_result(json!(["Lexio::Vocabulary"])))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "addNote",
            "params": { "note": { "tags": ["lexio", "vocabulary", "good"] } }
        })))
        .respond_with(ok_result(json!(7)))
        .expect(1)
        .mount(&server)
        .await;

    // AnkiConnect answers without a note id, e.g. for a duplicate
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "addNote",
            "params": { "note": { "tags": ["lexio", "vocabulary", "bad"] } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": null,
            "error": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = AnkiConnect::new(server.uri());
    let cards = vec![sample_card("good"), sample_card("bad")];

    let summary = export_cards(
        &bridge,
        &cards,
        &AnkiSettings::default(),
        &ExportOptions::default(),
    )
    .await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
}

// ============ Facade Integration Tests ============

#[tokio::test]
async fn test_facade_talks_to_configured_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "version" })))
        .respond_with(ok_result(json!(6)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "deckNames" })))
        .respond_with(ok_result(json!(["Default", "Lexio::Vocabulary"])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "addNote" })))
        .respond_with(ok_result(json!(99)))
        .mount(&server)
        .await;

    let app = Lexio::in_memory().unwrap().with_anki_url(server.uri());

    assert!(app.anki_available().await);
    assert_eq!(
        app.anki_decks().await.unwrap(),
        vec!["Default", "Lexio::Vocabulary"]
    );

    let card = sample_card("apple");
    let exported = app.export_card(&card, &ExportOptions::default()).await.unwrap();
    assert!(exported);
}

#[tokio::test]
async fn test_export_study_result_drops_out_of_range_selection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "deckNames" })))
        .respond_with(ok_result(json!(["Lexio::Vocabulary"])))
        .expect(1)
        .mount(&server)
        .await;

    // only the in-range phrase becomes a note
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "addNote",
            "params": { "note": { "tags": ["lexio", "vocabulary", "manzana"] } }
        })))
        .respond_with(ok_result(json!(11)))
        .expect(1)
        .mount(&server)
        .await;

    // the default web speech backend leaves every card silent, so no
    // media upload may happen even with include_audio on
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "storeMediaFile" })))
        .respond_with(ok_result(json!("")))
        .expect(0)
        .mount(&server)
        .await;

    let app = Lexio::in_memory().unwrap().with_anki_url(server.uri());

    let result = StudyResult {
        word: "manzana".to_string(),
        explanation: None,
        images: vec![ImageResult {
            url: "https://img.example/manzana.jpg".to_string(),
            thumbnail_url: "https://img.example/manzana_thumb.jpg".to_string(),
            title: None,
            source: None,
        }],
        phrases: vec![
            ExamplePhrase::new(
                "La manzana es roja.",
                "The apple is red.",
                PhraseCategory::Descriptive,
            ),
            ExamplePhrase::new(
                "Compré una manzana.",
                "I bought an apple.",
                PhraseCategory::Practical,
            ),
        ],
    };

    // phrase index 5 and image index 3 point past their lists
    let summary = app
        .export_study_result(&result, &[0, 5], &[0, 3], &ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
}
