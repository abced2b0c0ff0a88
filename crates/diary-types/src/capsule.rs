//! Daily capsule types.
//!
//! A capsule is the single persisted one-line summary of a user's day of
//! listening, together with the artwork and theme used to present it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where a summary's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapsuleSource {
    /// Written by the generative backend
    Generated,
    /// Fixed message or template-based synthesis
    Fallback,
}

impl std::fmt::Display for CapsuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapsuleSource::Generated => write!(f, "generated"),
            CapsuleSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// Summary text plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapsuleSummary {
    /// One or two sentences, terminated, without `*` formatting
    pub text: String,

    /// Generated or fallback
    pub source: CapsuleSource,
}

impl CapsuleSummary {
    /// Summary produced by the generative backend.
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: CapsuleSource::Generated,
        }
    }

    /// Summary produced without the generative backend.
    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: CapsuleSource::Fallback,
        }
    }

    /// True if the text came from the generative backend.
    pub fn is_generated(&self) -> bool {
        self.source == CapsuleSource::Generated
    }
}

/// Presentation theme derived from the day's genres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeTag {
    /// Upbeat, electronic, pop
    Y2k,
    /// R&B, soul, jazz, ambient, lo-fi, chill
    Midnight,
    /// Acoustic, folk, classical, soundtrack
    Editorial,
    /// Nothing matched
    #[default]
    Aura,
}

impl ThemeTag {
    /// Stable lowercase name, as stored and sent to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeTag::Y2k => "y2k",
            ThemeTag::Midnight => "midnight",
            ThemeTag::Editorial => "editorial",
            ThemeTag::Aura => "aura",
        }
    }
}

impl std::fmt::Display for ThemeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted daily capsule, one per `(user_id, target_date)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCapsule {
    /// Unique identifier (ULID string)
    pub id: String,

    /// Owner of the capsule
    pub user_id: String,

    /// Calendar day the capsule covers, in the diary timezone
    pub target_date: NaiveDate,

    /// Summary sentence(s)
    pub summary: String,

    /// Generated or fallback
    pub source: CapsuleSource,

    /// Most recent artwork of the day's most played artist
    #[serde(default)]
    pub representative_image_url: Option<String>,

    /// Presentation theme
    pub theme: ThemeTag,

    /// When the capsule was created
    pub created_at: DateTime<Utc>,
}

impl DailyCapsule {
    /// Create a capsule with a fresh ULID and the current timestamp.
    pub fn new(
        user_id: impl Into<String>,
        target_date: NaiveDate,
        summary: CapsuleSummary,
        representative_image_url: Option<String>,
        theme: ThemeTag,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            user_id: user_id.into(),
            target_date,
            summary: summary.text,
            source: summary.source,
            representative_image_url,
            theme,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_default_is_aura() {
        assert_eq!(ThemeTag::default(), ThemeTag::Aura);
    }

    #[test]
    fn test_theme_serializes_lowercase() {
        let json = serde_json::to_string(&ThemeTag::Y2k).unwrap();
        assert_eq!(json, "\"y2k\"");
        let decoded: ThemeTag = serde_json::from_str("\"midnight\"").unwrap();
        assert_eq!(decoded, ThemeTag::Midnight);
    }

    #[test]
    fn test_daily_capsule_from_summary() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let capsule = DailyCapsule::new(
            "user-1",
            date,
            CapsuleSummary::fallback("A quiet day."),
            None,
            ThemeTag::Aura,
        );

        assert_eq!(capsule.summary, "A quiet day.");
        assert_eq!(capsule.source, CapsuleSource::Fallback);
        assert_eq!(capsule.id.len(), 26);
    }
}
