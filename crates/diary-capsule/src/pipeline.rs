//! Capsule pipeline: aggregate, enrich, generate, theme, artwork.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use diary_types::{CapsuleSummary, ListeningRecord, Settings, ThemeTag};

use crate::aggregate::{
    aggregate_with_limit, lead_artists, representative_artwork, AggregateContext,
    MAX_GENRE_ARTISTS, MAX_PROMPT_TRACKS,
};
use crate::backend::build_backend;
use crate::engine::CapsuleGenerator;
use crate::error::CapsuleError;
use crate::genre::{resolve_genres, GenreSource, SpotifyGenreClient};
use crate::theme::score_theme;

/// Everything produced for one day, before persistence.
#[derive(Debug, Clone, Serialize)]
pub struct CapsuleOutcome {
    pub summary: CapsuleSummary,
    pub representative_artwork: Option<String>,
    pub theme: ThemeTag,
    pub aggregate: AggregateContext,
}

/// Dry-run result: what would be sent, without calling the backend.
#[derive(Debug, Clone, Serialize)]
pub struct CapsulePreview {
    pub aggregate: AggregateContext,
    pub prompt: String,
    pub theme: ThemeTag,
    pub representative_artwork: Option<String>,
}

/// Runs one day's records through the full capsule pipeline.
#[derive(Clone)]
pub struct CapsulePipeline {
    generator: CapsuleGenerator,
    genres: Option<Arc<dyn GenreSource>>,
    max_prompt_tracks: usize,
    max_genre_artists: usize,
}

impl CapsulePipeline {
    /// Pipeline with default limits and no genre enrichment.
    pub fn new(generator: CapsuleGenerator) -> Self {
        Self {
            generator,
            genres: None,
            max_prompt_tracks: MAX_PROMPT_TRACKS,
            max_genre_artists: MAX_GENRE_ARTISTS,
        }
    }

    /// Build the backend, genre client and generator from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, CapsuleError> {
        let backend = build_backend(&settings.capsule)?;
        let generator = CapsuleGenerator::from_settings(backend, &settings.capsule);

        let genres: Option<Arc<dyn GenreSource>> =
            match SpotifyGenreClient::from_settings(&settings.genres)? {
                Some(client) => Some(Arc::new(client)),
                None => {
                    info!("Genre access token is not set, genre enrichment disabled");
                    None
                }
            };

        Ok(Self {
            generator,
            genres,
            max_prompt_tracks: settings.capsule.max_prompt_tracks,
            max_genre_artists: settings.capsule.max_genre_artists,
        })
    }

    pub fn with_genre_source(mut self, source: Arc<dyn GenreSource>) -> Self {
        self.genres = Some(source);
        self
    }

    pub fn with_limits(mut self, max_prompt_tracks: usize, max_genre_artists: usize) -> Self {
        self.max_prompt_tracks = max_prompt_tracks;
        self.max_genre_artists = max_genre_artists;
        self
    }

    /// Generator used by this pipeline.
    pub fn generator(&self) -> &CapsuleGenerator {
        &self.generator
    }

    /// Aggregate records and attach whatever genres could be resolved
    /// before `cancel` fired.
    pub async fn prepare(
        &self,
        records: &[ListeningRecord],
        cancel: &CancellationToken,
    ) -> AggregateContext {
        let aggregate = aggregate_with_limit(records, self.max_prompt_tracks);

        match &self.genres {
            Some(source) => {
                let artists = lead_artists(records, self.max_genre_artists);
                let genres =
                    resolve_genres(source.as_ref(), &artists, self.max_genre_artists, cancel)
                        .await;
                aggregate.with_genres(genres)
            }
            None => aggregate,
        }
    }

    /// Produce the capsule content for a day.
    pub async fn run(
        &self,
        records: &[ListeningRecord],
        cancel: &CancellationToken,
    ) -> CapsuleOutcome {
        let aggregate = self.prepare(records, cancel).await;
        let summary = self.generator.generate(&aggregate, cancel).await;
        let theme = score_theme(&aggregate.genres_by_artist);
        let representative_artwork = representative_artwork(records);

        info!(
            tracks = aggregate.total_count,
            artists_with_genres = aggregate.genres_by_artist.len(),
            source = %summary.source,
            theme = %theme,
            "Capsule content ready"
        );

        CapsuleOutcome {
            summary,
            representative_artwork,
            theme,
            aggregate,
        }
    }

    /// Everything but the backend call.
    pub async fn preview(
        &self,
        records: &[ListeningRecord],
        cancel: &CancellationToken,
    ) -> CapsulePreview {
        let aggregate = self.prepare(records, cancel).await;
        CapsulePreview {
            prompt: self.generator.prompt_for(&aggregate),
            theme: score_theme(&aggregate.genres_by_artist),
            representative_artwork: representative_artwork(records),
            aggregate,
        }
    }
}
