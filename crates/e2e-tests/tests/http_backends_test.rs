//! HTTP backend E2E tests.
//!
//! Build the pipeline from settings against local mock servers standing in
//! for the generative API and the artist-search API.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use diary_capsule::{CapsulePipeline, CapsuleService, InMemoryDiaryStore};
use diary_types::{CapsuleSource, Provider, Settings, ThemeTag};
use e2e_tests::{rainy_artist_a_day, test_date, TEST_TIMEZONE};

fn settings(provider: Provider, llm: &MockServer, genres: &MockServer) -> Settings {
    let mut settings = Settings::default();
    settings.capsule.provider = provider;
    settings.capsule.api_key = Some("test-key".to_string());
    settings.capsule.api_base_url = Some(llm.uri());
    settings.capsule.backoff_unit_ms = 1;
    settings.genres.api_base_url = genres.uri();
    settings.genres.access_token = Some("spotify-token".to_string());
    settings
}

async fn mount_artist_search(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Artist A"))
        .and(query_param("type", "artist"))
        .and(header("authorization", "Bearer spotify-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "artists": { "items": [ { "name": "Artist A", "genres": ["k-pop", "dance pop"] } ] }
        })))
        .mount(server)
        .await;
}

async fn run(settings: &Settings) -> diary_types::DailyCapsule {
    let store = Arc::new(InMemoryDiaryStore::new());
    store.add_records("u1", rainy_artist_a_day()).await;
    let pipeline = CapsulePipeline::from_settings(settings).unwrap();
    let service = CapsuleService::new(pipeline, store.clone(), store, TEST_TIMEZONE);

    service
        .create_daily_capsule("u1", test_date(), &CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_gemini_and_spotify_end_to_end() {
    let llm = MockServer::start().await;
    let genres = MockServer::start().await;
    mount_artist_search(&genres).await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [
                { "content": { "parts": [ { "text": "  A bright beat carried you through the rain  " } ] } }
            ]
        })))
        .expect(1)
        .mount(&llm)
        .await;

    let capsule = run(&settings(Provider::Gemini, &llm, &genres)).await;

    assert_eq!(capsule.source, CapsuleSource::Generated);
    assert_eq!(capsule.summary, "A bright beat carried you through the rain.");
    assert_eq!(capsule.theme, ThemeTag::Y2k);
}

#[tokio::test]
async fn test_openai_rate_limit_then_success() {
    let llm = MockServer::start().await;
    let genres = MockServer::start().await;
    mount_artist_search(&genres).await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .mount(&llm)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": "A lively, rainy day." } } ]
        })))
        .mount(&llm)
        .await;

    let capsule = run(&settings(Provider::OpenAi, &llm, &genres)).await;

    assert_eq!(capsule.source, CapsuleSource::Generated);
    assert_eq!(capsule.summary, "A lively, rainy day.");
    assert_eq!(llm.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_server_error_degrades_without_retry() {
    let llm = MockServer::start().await;
    let genres = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(1)
        .mount(&llm)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&genres)
        .await;

    let capsule = run(&settings(Provider::Gemini, &llm, &genres)).await;

    assert_eq!(capsule.source, CapsuleSource::Fallback);
    assert!(capsule.summary.contains("Artist A"));
    assert_eq!(capsule.theme, ThemeTag::Aura);
}
