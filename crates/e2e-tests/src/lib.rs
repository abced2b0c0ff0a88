//! End-to-end test infrastructure for the auditory diary.
//!
//! Provides a shared TestHarness and record builders for tests covering
//! the full records-to-capsule path.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use diary_capsule::fallback::{FallbackSynthesizer, FixedPicker};
use diary_capsule::genre::GenreError;
use diary_capsule::{
    CapsuleGenerator, CapsulePipeline, CapsuleService, GenerativeBackend, GenreSource,
    InMemoryDiaryStore, MockBackend, RetryPolicy,
};
use diary_types::ListeningRecord;

/// Diary timezone used by every E2E test.
pub const TEST_TIMEZONE: Tz = chrono_tz::Asia::Seoul;

/// Shared test harness for E2E tests.
///
/// Wires a scripted backend, an optional genre source and an in-memory
/// store into a [`CapsuleService`].
pub struct TestHarness {
    /// Records and capsules
    pub store: Arc<InMemoryDiaryStore>,
    /// Scripted generative backend
    pub backend: Arc<MockBackend>,
    /// Service under test
    pub service: CapsuleService,
}

impl TestHarness {
    /// Harness with the given backend and no genre enrichment.
    pub fn new(backend: MockBackend) -> Self {
        Self::build(backend, None)
    }

    /// Harness with the given backend and genre source.
    pub fn with_genres(backend: MockBackend, genres: Arc<dyn GenreSource>) -> Self {
        Self::build(backend, Some(genres))
    }

    fn build(backend: MockBackend, genres: Option<Arc<dyn GenreSource>>) -> Self {
        let store = Arc::new(InMemoryDiaryStore::new());
        let backend = Arc::new(backend);

        let mut pipeline = CapsulePipeline::new(generator(backend.clone()));
        if let Some(genres) = genres {
            pipeline = pipeline.with_genre_source(genres);
        }

        let service = CapsuleService::new(pipeline, store.clone(), store.clone(), TEST_TIMEZONE);

        Self {
            store,
            backend,
            service,
        }
    }

    /// Store records for a user.
    pub async fn add_records(&self, user_id: &str, records: Vec<ListeningRecord>) {
        self.store.add_records(user_id, records).await;
    }
}

/// Generator over a mock backend with the default retry policy and a
/// deterministic fallback picker.
pub fn generator(backend: Arc<MockBackend>) -> CapsuleGenerator {
    let backend: Arc<dyn GenerativeBackend> = backend;
    CapsuleGenerator::new(Some(backend))
        .with_policy(RetryPolicy::default())
        .with_fallback(FallbackSynthesizer::with_picker(Arc::new(FixedPicker(0))))
}

/// The test calendar day.
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid test date")
}

/// 09:00 local time on the test day.
pub fn morning() -> DateTime<Utc> {
    TEST_TIMEZONE
        .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .expect("valid local time")
}

/// `count` plays spread over `artists` distinct artists, one minute apart
/// starting at [`morning`]. Play `i` is "Song {i}" by "Artist {i % artists}".
pub fn create_test_records(count: usize, artists: usize) -> Vec<ListeningRecord> {
    let start = morning();
    (0..count)
        .map(|i| {
            ListeningRecord::new(
                format!("Song {}", i),
                format!("Artist {}", i % artists.max(1)),
                start + Duration::minutes(i as i64),
            )
        })
        .collect()
}

/// Three plays by "Artist A", two of them tagged "Rain".
pub fn rainy_artist_a_day() -> Vec<ListeningRecord> {
    let start = morning();
    vec![
        ListeningRecord::new("Puddles", "Artist A", start)
            .with_weather("Rain")
            .with_artwork("https://img.example/puddles.jpg"),
        ListeningRecord::new("Umbrella", "Artist A", start + Duration::minutes(30))
            .with_weather("Rain")
            .with_artwork("https://img.example/umbrella.jpg"),
        ListeningRecord::new("Dry Spell", "Artist A", start + Duration::hours(2)),
    ]
}

/// Genre source backed by a fixed table. Artists listed in `failing`
/// return an error; unknown artists return no match.
#[derive(Debug, Default)]
pub struct StaticGenreSource {
    table: HashMap<String, Vec<String>>,
    failing: Vec<String>,
}

impl StaticGenreSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artist(mut self, name: &str, genres: &[&str]) -> Self {
        self.table.insert(
            name.to_string(),
            genres.iter().map(|g| g.to_string()).collect(),
        );
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }
}

#[async_trait]
impl GenreSource for StaticGenreSource {
    async fn search_artist_genres(&self, name: &str) -> Result<Option<Vec<String>>, GenreError> {
        if self.failing.iter().any(|f| f == name) {
            return Err(GenreError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.table.get(name).cloned())
    }
}
