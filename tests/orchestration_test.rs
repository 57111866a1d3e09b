//! End-to-end orchestration tests with no cloud credentials
//!
//! These run the full lookup pipeline through the `Lexio` facade and
//! verify that every capability degrades to its synthetic fallback:
//! - placeholder images with stable pagination
//! - template phrases in the preferred language
//! - absent explanation
//! - the web-speech sentinel for audio

use lexio::settings::{SettingsPatch, SpeechBackend, VoiceSettings};
use lexio::types::{AudioHandle, PageRequest, PhraseCategory};
use lexio::Lexio;

// ============ Lookup Pipeline Tests ============

#[tokio::test]
async fn test_lookup_without_credentials_yields_synthetic_content() {
    let app = Lexio::in_memory().unwrap();

    let result = app.lookup("apple", &PageRequest::default()).await.unwrap();

    assert_eq!(result.word, "apple");

    // placeholder gallery: exactly one page of mock images
    assert_eq!(result.images.len(), 6);
    assert_eq!(result.images[0].title.as_deref(), Some("apple image 1"));
    for image in &result.images {
        assert_eq!(image.source.as_deref(), Some("picsum.photos (mock)"));
        assert!(image.url.contains("apple"));
    }

    // template phrases: one per category, each mentioning the word
    assert_eq!(result.phrases.len(), 5);
    let categories: Vec<PhraseCategory> = result.phrases.iter().map(|p| p.category).collect();
    for category in PhraseCategory::all() {
        assert!(categories.contains(category), "missing {category}");
    }
    for phrase in &result.phrases {
        assert!(phrase.text.contains("apple"));
    }

    // no synthetic explanations exist
    assert!(result.explanation.is_none());
}

#[tokio::test]
async fn test_lookup_records_search_history() {
    let app = Lexio::in_memory().unwrap();

    app.lookup("apple", &PageRequest::default()).await.unwrap();

    let history = app.search_history(false).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].word, "apple");
    assert_eq!(history[0].search_count, 1);

    // a repeat lookup bumps the counter instead of adding a row
    app.lookup("apple", &PageRequest::default()).await.unwrap();
    let history = app.search_history(false).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].search_count, 2);
}

// ============ Image Pagination Tests ============

#[tokio::test]
async fn test_placeholder_pagination_metadata() {
    let app = Lexio::in_memory().unwrap();

    let first = app
        .search_images("apple", &PageRequest::new(1, 6))
        .await
        .unwrap();
    assert_eq!(first.current_page, 1);
    assert_eq!(first.total_pages, 5);
    assert!(first.has_next);
    assert!(!first.has_previous);

    let second = app
        .search_images("apple", &PageRequest::new(2, 6))
        .await
        .unwrap();
    assert_eq!(second.current_page, 2);
    assert!(second.has_previous);
    // page 2 continues where page 1 left off
    assert_eq!(second.images[0].title.as_deref(), Some("apple image 7"));
}

#[tokio::test]
async fn test_page_count_follows_page_size() {
    let app = Lexio::in_memory().unwrap();

    let ten = app
        .search_images("apple", &PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(ten.total_pages, 3);

    let fifty = app
        .search_images("apple", &PageRequest::new(1, 50))
        .await
        .unwrap();
    assert_eq!(fifty.total_pages, 1);
    assert!(!fifty.has_next);
}

// ============ Phrase Language Tests ============

#[tokio::test]
async fn test_template_phrases_follow_preferred_language() {
    let app = Lexio::in_memory().unwrap();

    // default language resolves to Spanish translations
    let phrases = app.generate_phrases("pan").await.unwrap();
    assert!(phrases[0].translation.contains("hermoso"));

    app.save_settings(&SettingsPatch {
        preferred_language: Some("fr".to_string()),
        ..SettingsPatch::default()
    })
    .unwrap();

    let phrases = app.generate_phrases("pain").await.unwrap();
    assert!(phrases[0].translation.contains("lumière"));
    assert!(phrases[0].translation.contains("pain"));
}

#[tokio::test]
async fn test_explanation_absent_without_provider() {
    let app = Lexio::in_memory().unwrap();

    let explanation = app.generate_explanation("apple").await.unwrap();
    assert!(explanation.is_none());
}

// ============ Audio Fallback Tests ============

#[tokio::test]
async fn test_audio_defaults_to_web_speech_sentinel() {
    let app = Lexio::in_memory().unwrap();

    let handle = app.generate_audio("manzana", None).await.unwrap();
    assert_eq!(handle, AudioHandle::WebSpeech);
    assert!(handle.cached_path().is_none());
}

#[tokio::test]
async fn test_cloud_audio_without_key_degrades_to_sentinel() {
    let app = Lexio::in_memory().unwrap();

    app.save_settings(&SettingsPatch {
        voice_settings: Some(VoiceSettings {
            provider: SpeechBackend::Google,
            language: "es-ES".to_string(),
            voice: None,
        }),
        ..SettingsPatch::default()
    })
    .unwrap();

    let handle = app.generate_audio("manzana", None).await.unwrap();
    assert_eq!(handle, AudioHandle::WebSpeech);
}

#[tokio::test]
async fn test_voices_default_without_cloud_backend() {
    let app = Lexio::in_memory().unwrap();

    let voices = app.available_voices(None).await.unwrap();
    assert_eq!(voices, vec!["default".to_string()]);
}

// ============ Key Validation Tests ============

#[tokio::test]
async fn test_validate_api_keys_all_false_without_credentials() {
    let app = Lexio::in_memory().unwrap();

    let results = app.validate_api_keys().await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results.get("openai"), Some(&false));
    assert_eq!(results.get("google"), Some(&false));
    assert_eq!(results.get("pixabay"), Some(&false));
}

// ============ Favorites Through the Facade ============

#[tokio::test]
async fn test_favorites_flow() {
    let app = Lexio::in_memory().unwrap();

    app.lookup("casa", &PageRequest::default()).await.unwrap();
    app.set_favorite("casa", true).unwrap();

    assert!(app.is_favorite("casa").unwrap());
    let favorites = app.search_history(true).unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].word, "casa");

    app.set_favorite("casa", false).unwrap();
    assert!(app.search_history(true).unwrap().is_empty());
    assert_eq!(app.search_history(false).unwrap().len(), 1);
}

// ============ Settings Through the Facade ============

#[tokio::test]
async fn test_settings_roundtrip() {
    let app = Lexio::in_memory().unwrap();

    app.save_settings(&SettingsPatch {
        openai_api_key: Some("sk-test".to_string()),
        preferred_language: Some("de".to_string()),
        ..SettingsPatch::default()
    })
    .unwrap();

    let settings = app.get_settings().unwrap();
    assert_eq!(settings.openai_key(), Some("sk-test"));
    assert_eq!(settings.preferred_language, "de");
    assert_eq!(settings.target_language(), "German");
}
