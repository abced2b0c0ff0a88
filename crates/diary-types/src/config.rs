//! Configuration loading for the auditory diary.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/musitory/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::DiaryError;

/// Hard ceiling on backend attempts per capsule.
pub const MAX_ATTEMPTS: u32 = 3;

/// Hard ceiling on track descriptors embedded in a prompt.
pub const MAX_PROMPT_TRACKS: usize = 15;

/// Hard ceiling on artists sent to genre enrichment.
pub const MAX_GENRE_ARTISTS: usize = 10;

/// Generative backend flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini `generateContent` REST API
    #[default]
    Gemini,
    /// Any OpenAI-compatible chat completions endpoint
    OpenAi,
}

/// Capsule generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleSettings {
    /// Backend flavour
    pub provider: Provider,

    /// Model identifier (e.g. "gemini-1.5-flash", "gpt-4o-mini")
    pub model: String,

    /// API key. Absent means the capsule feature is unavailable.
    pub api_key: Option<String>,

    /// API base URL override (for proxies and tests)
    pub api_base_url: Option<String>,

    /// Request timeout for a single backend call
    pub timeout_secs: u64,

    /// Backend attempts per capsule, 1 to 3
    pub max_attempts: u32,

    /// Length of one backoff unit. Retry `n` waits `5 * n` units.
    pub backoff_unit_ms: u64,

    /// Track descriptors embedded in a prompt, 1 to 15
    pub max_prompt_tracks: usize,

    /// Artists sent to genre enrichment, 0 to 10
    pub max_genre_artists: usize,

    /// Allow the model to name tracks and artists directly.
    /// When false the prompt asks for mood and energy only.
    pub name_tracks: bool,
}

impl Default for CapsuleSettings {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            model: default_capsule_model(),
            api_key: None,
            api_base_url: None,
            timeout_secs: 30,
            max_attempts: MAX_ATTEMPTS,
            backoff_unit_ms: 1000,
            max_prompt_tracks: MAX_PROMPT_TRACKS,
            max_genre_artists: MAX_GENRE_ARTISTS,
            name_tracks: false,
        }
    }
}

fn default_capsule_model() -> String {
    "gemini-1.5-flash".to_string()
}

/// Genre enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenreSettings {
    /// Artist search API base URL
    pub api_base_url: String,

    /// Bearer token for the search API. Absent disables enrichment.
    pub access_token: Option<String>,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for GenreSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.spotify.com/v1".to_string(),
            access_token: None,
            timeout_secs: 10,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// IANA timezone that defines the diary's calendar day
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Capsule generation
    #[serde(default)]
    pub capsule: CapsuleSettings,

    /// Genre enrichment
    #[serde(default)]
    pub genres: GenreSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            timezone: default_timezone(),
            capsule: CapsuleSettings::default(),
            genres: GenreSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/musitory/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (DIARY_*, `__` between nested keys)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, DiaryError> {
        let config_dir = ProjectDirs::from("", "", "musitory")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| DiaryError::Config(e.to_string()))?
            .set_default("timezone", default_timezone())
            .map_err(|e| DiaryError::Config(e.to_string()))?
            .set_default("capsule.model", default_capsule_model())
            .map_err(|e| DiaryError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // DIARY_TIMEZONE, DIARY_CAPSULE__API_KEY, DIARY_GENRES__ACCESS_TOKEN, ...
        builder = builder.add_source(
            Environment::with_prefix("DIARY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| DiaryError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| DiaryError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate values that serde cannot check.
    pub fn validate(&self) -> Result<(), DiaryError> {
        self.parse_timezone()?;
        if !(1..=MAX_ATTEMPTS).contains(&self.capsule.max_attempts) {
            return Err(DiaryError::Config(format!(
                "capsule.max_attempts must be between 1 and {}",
                MAX_ATTEMPTS
            )));
        }
        if !(1..=MAX_PROMPT_TRACKS).contains(&self.capsule.max_prompt_tracks) {
            return Err(DiaryError::Config(format!(
                "capsule.max_prompt_tracks must be between 1 and {}",
                MAX_PROMPT_TRACKS
            )));
        }
        if self.capsule.max_genre_artists > MAX_GENRE_ARTISTS {
            return Err(DiaryError::Config(format!(
                "capsule.max_genre_artists must be at most {}",
                MAX_GENRE_ARTISTS
            )));
        }
        Ok(())
    }

    /// Parse the configured timezone string into a chrono_tz::Tz.
    pub fn parse_timezone(&self) -> Result<chrono_tz::Tz, DiaryError> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| DiaryError::Config(format!("Invalid timezone: {}", self.timezone)))
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.capsule.api_key.is_some() {
            copy.capsule.api_key = Some("***".to_string());
        }
        if copy.genres.access_token.is_some() {
            copy.genres.access_token = Some("***".to_string());
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.timezone, "Asia/Seoul");
        assert_eq!(settings.capsule.provider, Provider::Gemini);
        assert_eq!(settings.capsule.max_attempts, 3);
        assert_eq!(settings.capsule.max_prompt_tracks, 15);
        assert_eq!(settings.capsule.max_genre_artists, 10);
        assert!(settings.capsule.api_key.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
timezone = "UTC"

[capsule]
provider = "openai"
model = "gpt-4o-mini"
backoff_unit_ms = 10
"#
        )
        .unwrap();

        let settings = Settings::load(Some(&file.path().to_string_lossy())).unwrap();
        assert_eq!(settings.timezone, "UTC");
        assert_eq!(settings.capsule.provider, Provider::OpenAi);
        assert_eq!(settings.capsule.model, "gpt-4o-mini");
        assert_eq!(settings.capsule.backoff_unit_ms, 10);
        // Untouched fields keep their defaults
        assert_eq!(settings.capsule.max_attempts, 3);
    }

    #[test]
    fn test_load_missing_cli_file_fails() {
        let result = Settings::load(Some("/nonexistent/musitory.toml"));
        assert!(matches!(result, Err(DiaryError::Config(_))));
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let settings = Settings {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_attempt_ceiling_enforced() {
        let mut settings = Settings::default();
        settings.capsule.max_attempts = 6;
        assert!(matches!(settings.validate(), Err(DiaryError::Config(_))));

        settings.capsule.max_attempts = 0;
        assert!(settings.validate().is_err());

        settings.capsule.max_attempts = MAX_ATTEMPTS;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_prompt_track_ceiling_enforced() {
        let mut settings = Settings::default();
        settings.capsule.max_prompt_tracks = 40;
        assert!(matches!(settings.validate(), Err(DiaryError::Config(_))));

        settings.capsule.max_prompt_tracks = MAX_PROMPT_TRACKS;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_genre_artist_ceiling_enforced() {
        let mut settings = Settings::default();
        settings.capsule.max_genre_artists = 11;
        assert!(settings.validate().is_err());

        settings.capsule.max_genre_artists = 0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut settings = Settings::default();
        settings.capsule.api_key = Some("secret-key".to_string());
        let redacted = settings.redacted();
        assert_eq!(redacted.capsule.api_key.as_deref(), Some("***"));
        assert!(redacted.genres.access_token.is_none());
    }
}
