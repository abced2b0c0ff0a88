//! Listening record type.
//!
//! A listening record is one scrobbled play: the track, who performed it,
//! and the context captured when it was played.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single play captured by the scrobbler.
///
/// Records are read-only inputs to the capsule pipeline. Their order by
/// `listened_at` is significant: aggregation runs oldest-first, artwork
/// selection newest-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListeningRecord {
    /// Track title as reported by the streaming service
    pub track_title: String,

    /// Primary artist credit. May hold a comma-joined credit list
    /// ("Artist A, Artist B") when the source only provided a single string.
    pub primary_artist: String,

    /// Featured/secondary artists, never shown in descriptors
    #[serde(default)]
    pub secondary_artists: Vec<String>,

    /// Weather condition at play time (e.g. "Clear", "Rain")
    #[serde(default)]
    pub weather_tag: Option<String>,

    /// Album artwork URL
    #[serde(default)]
    pub album_artwork_url: Option<String>,

    /// When the track was played
    pub listened_at: DateTime<Utc>,
}

impl ListeningRecord {
    /// Create a record with no secondary artists, weather or artwork.
    pub fn new(
        track_title: impl Into<String>,
        primary_artist: impl Into<String>,
        listened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            track_title: track_title.into(),
            primary_artist: primary_artist.into(),
            secondary_artists: Vec::new(),
            weather_tag: None,
            album_artwork_url: None,
            listened_at,
        }
    }

    /// Attach a weather tag.
    pub fn with_weather(mut self, weather: impl Into<String>) -> Self {
        self.weather_tag = Some(weather.into());
        self
    }

    /// Attach an artwork URL.
    pub fn with_artwork(mut self, url: impl Into<String>) -> Self {
        self.album_artwork_url = Some(url.into());
        self
    }

    /// Attach secondary artists.
    pub fn with_secondary_artists(mut self, artists: Vec<String>) -> Self {
        self.secondary_artists = artists;
        self
    }

    /// Lead artist: the first comma segment of the primary credit, trimmed.
    ///
    /// This is the name used for play counts, genre lookup and fallback text.
    pub fn lead_artist(&self) -> &str {
        self.primary_artist
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
    }

    /// Display descriptor, `"{title} by {artist}"`.
    pub fn descriptor(&self) -> String {
        format!("{} by {}", self.track_title.trim(), self.primary_artist.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_lead_artist_takes_first_comma_segment() {
        let record = ListeningRecord::new("Song", "Artist A, Artist B", ts());
        assert_eq!(record.lead_artist(), "Artist A");

        let record = ListeningRecord::new("Song", "  Solo  ", ts());
        assert_eq!(record.lead_artist(), "Solo");
    }

    #[test]
    fn test_descriptor_excludes_secondary_artists() {
        let record = ListeningRecord::new("Song", "Artist A", ts())
            .with_secondary_artists(vec!["Guest".to_string()]);
        assert_eq!(record.descriptor(), "Song by Artist A");
    }

    #[test]
    fn test_deserialize_with_missing_optionals() {
        let json = r#"{
            "track_title": "Song",
            "primary_artist": "Artist A",
            "listened_at": "2024-03-01T12:00:00Z"
        }"#;
        let record: ListeningRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.listened_at, ts());
        assert!(record.weather_tag.is_none());
        assert!(record.secondary_artists.is_empty());
    }
}
