//! Listening-record aggregation.
//!
//! Turns one day of listening records into the compact digest used to
//! build a prompt or a fallback sentence. Everything here is pure: no I/O,
//! no clock, no randomness.

use serde::{Deserialize, Serialize};

use diary_types::ListeningRecord;

pub use diary_types::{MAX_GENRE_ARTISTS, MAX_PROMPT_TRACKS};

/// Genre tags per artist, in the order artists were supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenresByArtist {
    entries: Vec<(String, Vec<String>)>,
}

impl GenresByArtist {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an artist's genres. Duplicate genres are dropped,
    /// first occurrence wins.
    pub fn insert(&mut self, artist: impl Into<String>, genres: Vec<String>) {
        let artist = artist.into();
        let mut unique: Vec<String> = Vec::with_capacity(genres.len());
        for genre in genres {
            if !unique.contains(&genre) {
                unique.push(genre);
            }
        }

        match self.entries.iter_mut().find(|(name, _)| *name == artist) {
            Some((_, existing)) => *existing = unique,
            None => self.entries.push((artist, unique)),
        }
    }

    /// Genres for an artist, if resolved.
    pub fn get(&self, artist: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == artist)
            .map(|(_, genres)| genres.as_slice())
    }

    /// True if the artist was resolved.
    pub fn contains(&self, artist: &str) -> bool {
        self.get(artist).is_some()
    }

    /// Iterate `(artist, genres)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, genres)| (name.as_str(), genres.as_slice()))
    }

    /// Every genre string across all artists, repeats included.
    pub fn all_genres(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .flat_map(|(_, genres)| genres.iter().map(String::as_str))
    }

    /// Number of resolved artists.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no artist was resolved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for GenresByArtist {
    fn from_iter<I: IntoIterator<Item = (S, Vec<String>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (artist, genres) in iter {
            map.insert(artist, genres);
        }
        map
    }
}

/// Digest of one day of listening.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateContext {
    /// `"{title} by {artist}"`, chronological, at most the prompt cap
    pub track_descriptors: Vec<String>,

    /// Number of descriptors kept (equals `track_descriptors.len()`)
    pub truncated_count: usize,

    /// Number of records in the day
    pub total_count: usize,

    /// Most frequent weather tag
    pub majority_weather: Option<String>,

    /// Most played lead artist over all records, not just the kept ones
    pub top_artist: Option<String>,

    /// Genres resolved for the day's lead artists
    pub genres_by_artist: GenresByArtist,
}

impl AggregateContext {
    /// True if the day has no records.
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// True if descriptors were dropped to respect the prompt cap.
    pub fn is_truncated(&self) -> bool {
        self.truncated_count < self.total_count
    }

    /// Attach enrichment results.
    pub fn with_genres(mut self, genres: GenresByArtist) -> Self {
        self.genres_by_artist = genres;
        self
    }
}

/// Aggregate a day's records with the default prompt cap.
pub fn aggregate(records: &[ListeningRecord]) -> AggregateContext {
    aggregate_with_limit(records, MAX_PROMPT_TRACKS)
}

/// Aggregate a day's records, keeping at most `max_tracks` descriptors.
/// `max_tracks` is capped at [`MAX_PROMPT_TRACKS`].
///
/// Genres are left empty; enrichment runs afterwards and is attached with
/// [`AggregateContext::with_genres`].
pub fn aggregate_with_limit(records: &[ListeningRecord], max_tracks: usize) -> AggregateContext {
    let ordered = chronological(records);

    let track_descriptors: Vec<String> = ordered
        .iter()
        .take(max_tracks.min(MAX_PROMPT_TRACKS))
        .map(|r| r.descriptor())
        .collect();

    AggregateContext {
        truncated_count: track_descriptors.len(),
        total_count: ordered.len(),
        track_descriptors,
        majority_weather: majority_weather(records),
        top_artist: top_artist(records),
        genres_by_artist: GenresByArtist::new(),
    }
}

/// Most frequent non-empty weather tag.
///
/// Ties go to the tag seen first in chronological order.
pub fn majority_weather(records: &[ListeningRecord]) -> Option<String> {
    let ordered = chronological(records);
    mode_first_seen(
        ordered
            .iter()
            .filter_map(|r| r.weather_tag.as_deref())
            .map(str::trim)
            .filter(|w| !w.is_empty()),
    )
}

/// Most played lead artist.
///
/// Ties go to the artist seen first in chronological order.
pub fn top_artist(records: &[ListeningRecord]) -> Option<String> {
    let ordered = chronological(records);
    mode_first_seen(ordered.iter().map(|r| r.lead_artist()).filter(|a| !a.is_empty()))
}

/// Distinct lead artists in first-seen order, capped at `limit`.
pub fn lead_artists(records: &[ListeningRecord], limit: usize) -> Vec<String> {
    let mut artists: Vec<String> = Vec::new();
    for record in chronological(records) {
        if artists.len() >= limit {
            break;
        }
        let artist = record.lead_artist();
        if !artist.is_empty() && !artists.iter().any(|a| a == artist) {
            artists.push(artist.to_string());
        }
    }
    artists
}

/// Artwork for the capsule: the most recent artwork of the most played
/// lead artist.
pub fn representative_artwork(records: &[ListeningRecord]) -> Option<String> {
    let top = top_artist(records)?;

    chronological(records)
        .into_iter()
        .rev()
        .filter(|r| r.lead_artist() == top)
        .find_map(|r| {
            r.album_artwork_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
        })
}

/// Records sorted oldest-first. The sort is stable so records sharing a
/// timestamp keep their supplied order.
fn chronological(records: &[ListeningRecord]) -> Vec<&ListeningRecord> {
    let mut ordered: Vec<&ListeningRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.listened_at);
    ordered
}

/// Highest-count value; equal counts resolve to the value first seen.
fn mode_first_seen<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match tally.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => tally.push((value, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in tally {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}
