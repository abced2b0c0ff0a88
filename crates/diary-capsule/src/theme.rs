//! Visual theme scoring from genre tags.

use diary_types::ThemeTag;

use crate::aggregate::GenresByArtist;

/// Keywords that push a capsule toward the `y2k` theme.
pub const Y2K_KEYWORDS: &[&str] = &["upbeat", "electronic", "pop"];

/// Keywords that push a capsule toward the `midnight` theme.
pub const MIDNIGHT_KEYWORDS: &[&str] = &["r&b", "soul", "jazz", "ambient", "lo-fi", "chill"];

/// Keywords that push a capsule toward the `editorial` theme.
pub const EDITORIAL_KEYWORDS: &[&str] = &["acoustic", "folk", "classical", "soundtrack"];

/// Per-theme keyword hit counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThemeScores {
    pub y2k: u32,
    pub midnight: u32,
    pub editorial: u32,
}

impl ThemeScores {
    /// Winning theme. Ties go to y2k, then midnight, then editorial.
    pub fn winner(&self) -> ThemeTag {
        let ranked = [
            (self.y2k, ThemeTag::Y2k),
            (self.midnight, ThemeTag::Midnight),
            (self.editorial, ThemeTag::Editorial),
        ];

        let mut best = (0, ThemeTag::Aura);
        for (score, theme) in ranked {
            if score > best.0 {
                best = (score, theme);
            }
        }
        best.1
    }
}

/// Count keyword hits over every genre of every artist.
///
/// A genre is matched by lowercase substring, so one genre can count toward
/// several themes ("chill pop" hits both midnight and y2k).
pub fn theme_scores(genres_by_artist: &GenresByArtist) -> ThemeScores {
    let mut scores = ThemeScores::default();

    for genre in genres_by_artist.all_genres() {
        let genre = genre.to_lowercase();
        if matches_any(&genre, Y2K_KEYWORDS) {
            scores.y2k += 1;
        }
        if matches_any(&genre, MIDNIGHT_KEYWORDS) {
            scores.midnight += 1;
        }
        if matches_any(&genre, EDITORIAL_KEYWORDS) {
            scores.editorial += 1;
        }
    }

    scores
}

/// Pick the theme for a day's genres. Empty or unmatched input gives `aura`.
pub fn score_theme(genres_by_artist: &GenresByArtist) -> ThemeTag {
    theme_scores(genres_by_artist).winner()
}

fn matches_any(genre: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| genre.contains(k))
}
