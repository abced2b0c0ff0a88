//! Genre enrichment.
//!
//! Resolves artist names to genre tags through an artist-search API.
//! Enrichment is best-effort: a failed lookup only leaves that artist out
//! of the result, it never fails the capsule.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use diary_types::GenreSettings;

use crate::aggregate::{GenresByArtist, MAX_GENRE_ARTISTS};

/// Error type for genre lookups.
#[derive(Debug, Error)]
pub enum GenreError {
    #[error("Genre request failed: {0}")]
    Request(String),

    #[error("Genre API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse genre response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Artist-search boundary.
#[async_trait]
pub trait GenreSource: Send + Sync {
    /// Genre tags of the best match for `name`, or `None` if nothing matched.
    async fn search_artist_genres(&self, name: &str) -> Result<Option<Vec<String>>, GenreError>;
}

/// Resolve genres for up to `limit` artists (at most [`MAX_GENRE_ARTISTS`]),
/// one lookup at a time.
///
/// Never fails. Artists whose lookup errors, finds nothing, or returns no
/// tags are simply absent. Results keep the supplied artist order. Once
/// `cancel` fires no further lookups start and the partial mapping is returned.
pub async fn resolve_genres(
    source: &dyn GenreSource,
    artists: &[String],
    limit: usize,
    cancel: &CancellationToken,
) -> GenresByArtist {
    let mut resolved = GenresByArtist::new();

    for artist in artists.iter().take(limit.min(MAX_GENRE_ARTISTS)) {
        if cancel.is_cancelled() {
            info!(resolved = resolved.len(), "Genre enrichment cancelled");
            break;
        }
        if resolved.contains(artist) {
            continue;
        }

        match source.search_artist_genres(artist).await {
            Ok(Some(genres)) if !genres.is_empty() => {
                debug!(artist = %artist, genres = genres.len(), "Resolved artist genres");
                resolved.insert(artist.clone(), genres);
            }
            Ok(_) => {
                debug!(artist = %artist, "No genres found for artist");
            }
            Err(e) => {
                warn!(artist = %artist, error = %e, "Genre lookup failed, skipping artist");
            }
        }
    }

    resolved
}

/// Spotify Web API artist search.
pub struct SpotifyGenreClient {
    client: Client,
    base_url: String,
    access_token: SecretString,
}

impl SpotifyGenreClient {
    /// Create a client against `base_url` (e.g. "https://api.spotify.com/v1").
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenreError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: SecretString::from(access_token.into()),
        })
    }

    /// Build from settings. Returns `None` when no access token is set.
    pub fn from_settings(settings: &GenreSettings) -> Result<Option<Self>, GenreError> {
        match settings.access_token.as_deref() {
            Some(token) if !token.is_empty() => Self::new(
                settings.api_base_url.clone(),
                token,
                Duration::from_secs(settings.timeout_secs),
            )
            .map(Some),
            _ => Ok(None),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    artists: Option<ArtistPage>,
}

#[derive(Deserialize)]
struct ArtistPage {
    #[serde(default)]
    items: Vec<ArtistItem>,
}

#[derive(Deserialize)]
struct ArtistItem {
    #[serde(default)]
    genres: Vec<String>,
}

#[async_trait]
impl GenreSource for SpotifyGenreClient {
    async fn search_artist_genres(&self, name: &str) -> Result<Option<Vec<String>>, GenreError> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.access_token.expose_secret())
            .query(&[("q", name), ("type", "artist"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| GenreError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenreError::Status { status, body });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| GenreError::Parse(e.to_string()))?;

        Ok(body
            .artists
            .and_then(|page| page.items.into_iter().next())
            .map(|artist| artist.genres))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Canned lookups; names missing from the table error out.
    struct TableSource {
        table: HashMap<String, Option<Vec<String>>>,
        calls: Mutex<Vec<String>>,
    }

    impl TableSource {
        fn new(entries: Vec<(&str, Option<Vec<&str>>)>) -> Self {
            let table = entries
                .into_iter()
                .map(|(name, genres)| {
                    (
                        name.to_string(),
                        genres.map(|g| g.into_iter().map(str::to_string).collect()),
                    )
                })
                .collect();
            Self {
                table,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenreSource for TableSource {
        async fn search_artist_genres(
            &self,
            name: &str,
        ) -> Result<Option<Vec<String>>, GenreError> {
            self.calls.lock().unwrap().push(name.to_string());
            self.table
                .get(name)
                .cloned()
                .ok_or_else(|| GenreError::Request("connection reset".to_string()))
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn none() -> CancellationToken {
        CancellationToken::new()
    }

    /// Answers every lookup and cancels `token` on the first one.
    struct CancelAfterFirst {
        token: CancellationToken,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl GenreSource for CancelAfterFirst {
        async fn search_artist_genres(
            &self,
            _name: &str,
        ) -> Result<Option<Vec<String>>, GenreError> {
            *self.calls.lock().unwrap() += 1;
            self.token.cancel();
            Ok(Some(vec!["pop".to_string()]))
        }
    }

    #[tokio::test]
    async fn test_resolve_genres_partial_on_failure() {
        let source = TableSource::new(vec![
            ("Artist A", Some(vec!["k-pop", "dance pop"])),
            ("Artist C", Some(vec!["jazz"])),
        ]);

        let resolved =
            resolve_genres(&source, &names(&["Artist A", "Artist B", "Artist C"]), 10, &none()).await;

        assert_eq!(resolved.len(), 2);
        assert!(resolved.contains("Artist A"));
        assert!(!resolved.contains("Artist B"));
        let order: Vec<&str> = resolved.iter().map(|(a, _)| a).collect();
        assert_eq!(order, vec!["Artist A", "Artist C"]);
    }

    #[tokio::test]
    async fn test_resolve_genres_skips_empty_and_missing() {
        let source = TableSource::new(vec![("Artist A", Some(vec![])), ("Artist B", None)]);
        let resolved =
            resolve_genres(&source, &names(&["Artist A", "Artist B"]), 10, &none()).await;
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_genres_respects_limit() {
        let source = TableSource::new(vec![("A", Some(vec!["pop"])), ("B", Some(vec!["pop"]))]);
        let resolved = resolve_genres(&source, &names(&["A", "B"]), 1, &none()).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(source.calls.lock().unwrap().as_slice(), &["A".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_genres_stops_when_cancelled() {
        let token = CancellationToken::new();
        let source = CancelAfterFirst {
            token: token.clone(),
            calls: Mutex::new(0),
        };

        let resolved = resolve_genres(&source, &names(&["A", "B", "C"]), 10, &token).await;

        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains("A"));
        assert_eq!(*source.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resolve_genres_caps_artist_count() {
        let artists: Vec<String> = (0..12).map(|i| format!("Artist {}", i)).collect();
        let source = TableSource::new(
            artists
                .iter()
                .map(|a| (a.as_str(), Some(vec!["pop"])))
                .collect(),
        );

        let resolved = resolve_genres(&source, &artists, 40, &none()).await;

        assert_eq!(resolved.len(), MAX_GENRE_ARTISTS);
    }

    #[tokio::test]
    async fn test_spotify_client_reads_top_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Artist A"))
            .and(query_param("type", "artist"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "artists": {
                    "items": [
                        { "name": "Artist A", "genres": ["indie pop", "bedroom pop"] },
                        { "name": "Artist A Tribute", "genres": ["karaoke"] }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client =
            SpotifyGenreClient::new(server.uri(), "test-token", Duration::from_secs(5)).unwrap();
        let genres = client.search_artist_genres("Artist A").await.unwrap();

        assert_eq!(
            genres,
            Some(vec!["indie pop".to_string(), "bedroom pop".to_string()])
        );
    }

    #[tokio::test]
    async fn test_spotify_client_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "artists": { "items": [] } })),
            )
            .mount(&server)
            .await;

        let client =
            SpotifyGenreClient::new(server.uri(), "test-token", Duration::from_secs(5)).unwrap();
        assert_eq!(client.search_artist_genres("Nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_spotify_client_unauthorized_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;

        let client =
            SpotifyGenreClient::new(server.uri(), "stale", Duration::from_secs(5)).unwrap();
        let result = client.search_artist_genres("Artist A").await;
        assert!(matches!(result, Err(GenreError::Status { status: 401, .. })));
    }

    #[test]
    fn test_from_settings_without_token() {
        let settings = GenreSettings::default();
        assert!(SpotifyGenreClient::from_settings(&settings).unwrap().is_none());
    }
}
