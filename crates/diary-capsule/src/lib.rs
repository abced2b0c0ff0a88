//! # diary-capsule
//!
//! Daily capsule generation for the auditory diary.
//!
//! A capsule is a one or two sentence summary of a user's day of listening.
//! The pipeline aggregates the day's records, enriches the top artists with
//! genre tags, asks a generative backend for the summary and falls back to
//! template sentences when the backend is unavailable or rate limited.
//!
//! ## Modules
//! - `aggregate`: record digest (descriptors, weather, top artist, artwork)
//! - `genre`: best-effort genre enrichment
//! - `backend`: generative backends and error classification
//! - `prompt`: prompt construction
//! - `retry`: linear backoff for rate limits
//! - `engine`: generation with retries and fallback
//! - `fallback`: template sentences
//! - `theme`: visual theme from genres
//! - `pipeline`: the stages above end to end
//! - `store` and `service`: persistence and the per-day capsule request

pub mod aggregate;
pub mod backend;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod genre;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod service;
pub mod store;
pub mod theme;

pub use aggregate::{aggregate, AggregateContext, GenresByArtist};
pub use backend::{build_backend, BackendError, GenerativeBackend, MockBackend};
pub use engine::CapsuleGenerator;
pub use error::CapsuleError;
pub use fallback::{FallbackSynthesizer, TemplatePicker};
pub use genre::{GenreSource, SpotifyGenreClient};
pub use pipeline::{CapsuleOutcome, CapsulePipeline, CapsulePreview};
pub use retry::RetryPolicy;
pub use service::CapsuleService;
pub use store::{CapsuleStore, InMemoryDiaryStore, ListeningStore};
pub use theme::score_theme;
