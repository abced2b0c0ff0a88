//! Capsule prompt construction.
//!
//! The wording is free to change. The rules block is not: the model must
//! not invent tracks or artists, must reason only from the data given, must
//! answer with one or two polite, terminated sentences and nothing else.

use crate::aggregate::AggregateContext;

/// Builds the capsule prompt from an aggregate.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    /// Allow naming tracks and artists in the summary.
    name_tracks: bool,
}

impl PromptBuilder {
    /// Builder that asks for mood only, without naming tracks or artists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow or forbid naming tracks and artists in the answer.
    pub fn name_tracks(mut self, allowed: bool) -> Self {
        self.name_tracks = allowed;
        self
    }

    /// Build the prompt text.
    pub fn build(&self, aggregate: &AggregateContext) -> String {
        let mut data = String::new();

        if let Some(weather) = &aggregate.majority_weather {
            data.push_str(&format!("Main weather today: {}\n", weather));
        }

        if !aggregate.genres_by_artist.is_empty() {
            data.push_str("Genres by artist:\n");
            for (artist, genres) in aggregate.genres_by_artist.iter() {
                data.push_str(&format!("- {}: {}\n", artist, genres.join(", ")));
            }
        }

        data.push_str("Songs listened to today");
        if aggregate.is_truncated() {
            data.push_str(&sampling_note(aggregate));
        }
        data.push_str(":\n");

        let tracks = aggregate
            .track_descriptors
            .iter()
            .map(|t| format!("- {}", t))
            .collect::<Vec<_>>()
            .join("\n");
        data.push_str(&tracks);

        let mut rules = vec![
            "Never invent songs or artists that are not listed above.",
            "Trust the data completely and infer the mood only from it.",
            "End every sentence with proper punctuation and keep a soft, gentle, polite tone.",
            "Return only the diary sentence(s), with no introduction or explanation.",
            "Write one or two sentences.",
        ];
        if !self.name_tracks {
            rules.push(
                "Do not mention song titles or artist names. Describe the mood, energy and \
                 emotion suggested by the genres instead.",
            );
        }

        let rules_text = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| format!("{}. {}", i + 1, rule))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are a warm, perceptive music diary curator.
Based on the playlist and context below, infer what kind of day the listener had and write a short, poetic one-line diary entry.

[DATA]
{data}

[RULES]
{rules_text}"#
        )
    }
}

/// `" (based on N of M songs)"`
fn sampling_note(aggregate: &AggregateContext) -> String {
    format!(
        " (based on {} of {} songs)",
        aggregate.truncated_count, aggregate.total_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, GenresByArtist};
    use chrono::{Duration, TimeZone, Utc};
    use diary_types::ListeningRecord;

    fn records(count: i64) -> Vec<ListeningRecord> {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                ListeningRecord::new(
                    format!("Song {}", i),
                    format!("Artist {}", i % 5),
                    base + Duration::minutes(i),
                )
            })
            .collect()
    }

    #[test]
    fn test_prompt_includes_sampling_note_when_truncated() {
        let context = aggregate(&records(20));
        let prompt = PromptBuilder::new().build(&context);
        assert!(prompt.contains("based on 15 of 20 songs"));
        assert!(prompt.contains("- Song 14 by Artist 4"));
        assert!(!prompt.contains("Song 15 by"));
    }

    #[test]
    fn test_prompt_omits_sampling_note_when_complete() {
        let context = aggregate(&records(3));
        let prompt = PromptBuilder::new().build(&context);
        assert!(!prompt.contains("based on"));
    }

    #[test]
    fn test_prompt_includes_weather_and_genres() {
        let mut genres = GenresByArtist::new();
        genres.insert("Artist 0", vec!["lo-fi".to_string(), "chillhop".to_string()]);
        let mut context = aggregate(&records(2)).with_genres(genres);
        context.majority_weather = Some("Rain".to_string());

        let prompt = PromptBuilder::new().build(&context);
        assert!(prompt.contains("Main weather today: Rain"));
        assert!(prompt.contains("- Artist 0: lo-fi, chillhop"));
    }

    #[test]
    fn test_prompt_rules() {
        let context = aggregate(&records(2));

        let strict = PromptBuilder::new().build(&context);
        assert!(strict.contains("Never invent songs or artists"));
        assert!(strict.contains("one or two sentences"));
        assert!(strict.contains("Do not mention song titles or artist names"));

        let naming = PromptBuilder::new().name_tracks(true).build(&context);
        assert!(naming.contains("Never invent songs or artists"));
        assert!(!naming.contains("Do not mention song titles"));
    }
}
