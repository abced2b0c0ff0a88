//! Template-based fallback summaries.
//!
//! Used when the generative backend is unavailable or gave up. The sentence
//! is built from the same facts the prompt would have used (top artist,
//! weather, track count) so a failed generation still reads personal.
//! Only the choice among equivalent templates is random.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};

use diary_types::ListeningRecord;

use crate::aggregate::{top_artist, AggregateContext};

/// Message for a day with no records.
pub const EMPTY_DAY_MESSAGE: &str =
    "No songs were recorded today. What kind of day did you have?";

/// Chooses among equivalent templates.
pub trait TemplatePicker: Send + Sync {
    /// Index in `0..choices`. `choices` is never zero.
    fn pick(&self, choices: usize) -> usize;
}

/// Uniform choice from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl TemplatePicker for RandomPicker {
    fn pick(&self, choices: usize) -> usize {
        rand::rng().random_range(0..choices)
    }
}

/// Uniform choice from a seeded generator, reproducible across runs.
pub struct SeededPicker {
    rng: Mutex<StdRng>,
}

impl SeededPicker {
    /// Create a picker from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl TemplatePicker for SeededPicker {
    fn pick(&self, choices: usize) -> usize {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..choices)
    }
}

/// Always the same index (wrapped to the number of choices).
#[derive(Debug, Clone, Copy)]
pub struct FixedPicker(pub usize);

impl TemplatePicker for FixedPicker {
    fn pick(&self, choices: usize) -> usize {
        self.0 % choices
    }
}

/// Mood phrase for a weather tag, phrased to follow a verb
/// ("kept you company under a clear sky").
pub fn weather_mood(weather: &str) -> Option<&'static str> {
    let phrase = match weather.trim().to_lowercase().as_str() {
        "clear" | "sunny" => "under a clear sky",
        "clouds" | "cloudy" | "overcast" => "beneath soft grey clouds",
        "rain" => "to the sound of falling rain",
        "drizzle" => "through a light drizzle",
        "thunderstorm" => "beneath a stormy sky",
        "snow" => "as the snow drifted down",
        "mist" => "in the misty air",
        "fog" => "wrapped in a quiet fog",
        "haze" => "in the hazy light",
        _ => return None,
    };
    Some(phrase)
}

/// Composes fallback sentences.
#[derive(Clone)]
pub struct FallbackSynthesizer {
    picker: Arc<dyn TemplatePicker>,
}

impl FallbackSynthesizer {
    /// Synthesizer with uniform random template choice.
    pub fn new() -> Self {
        Self::with_picker(Arc::new(RandomPicker))
    }

    /// Synthesizer with an injected template picker.
    pub fn with_picker(picker: Arc<dyn TemplatePicker>) -> Self {
        Self { picker }
    }

    /// Summarize a day from its records.
    ///
    /// `majority_weather` is normally the aggregate's value; when `None` is
    /// passed the weather phrase is omitted.
    pub fn synthesize(
        &self,
        records: &[ListeningRecord],
        majority_weather: Option<&str>,
    ) -> String {
        let artist = top_artist(records);
        self.compose(artist.as_deref(), majority_weather, records.len())
    }

    /// Summarize a day from its aggregate.
    pub fn synthesize_from(&self, aggregate: &AggregateContext) -> String {
        self.compose(
            aggregate.top_artist.as_deref(),
            aggregate.majority_weather.as_deref(),
            aggregate.total_count,
        )
    }

    fn compose(&self, artist: Option<&str>, weather: Option<&str>, track_count: usize) -> String {
        if track_count == 0 {
            return EMPTY_DAY_MESSAGE.to_string();
        }

        let mood = weather.and_then(weather_mood);
        let artist = artist.map(|a| a.replace('*', "")).filter(|a| !a.trim().is_empty());

        let templates: Vec<String> = match (artist.as_deref(), mood) {
            (Some(artist), Some(mood)) => vec![
                format!("{artist}'s music kept you company {mood} today."),
                format!(
                    "You spent the day {mood}, returning to {artist} again and again; \
                     it sounds like a day with its own gentle rhythm."
                ),
                format!(
                    "Listening to {artist} {mood}, it seems the music matched the mood of \
                     your day perfectly."
                ),
            ],
            (Some(artist), None) => vec![
                format!("{artist} was at the heart of your listening today."),
                format!(
                    "You kept coming back to {artist} today; their music must have suited \
                     your mood."
                ),
                format!("Today's soundtrack leaned on {artist}, giving the day a rhythm of its own."),
            ],
            _ => {
                let songs = song_count(track_count);
                let lead = capitalize(&songs);
                vec![
                    format!(
                        "You listened to {songs} today, each one leaving a small mark on your day."
                    ),
                    format!("{lead} filled your day with music; it sounds like a day worth remembering."),
                ]
            }
        };

        let index = self.picker.pick(templates.len()).min(templates.len() - 1);
        templates[index].clone()
    }
}

impl Default for FallbackSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FallbackSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackSynthesizer").finish_non_exhaustive()
    }
}

fn song_count(count: usize) -> String {
    if count == 1 {
        "1 song".to_string()
    } else {
        format!("{} songs", count)
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
