//! Command implementations for `musitory`.
//!
//! Handles:
//! - capsule generate: load records, create the day's capsule, print it
//! - capsule preview: show what would be sent to the backend
//! - config: print effective settings

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use diary_capsule::{CapsulePipeline, CapsuleService, InMemoryDiaryStore};
use diary_types::{ListeningRecord, Settings};

use crate::cli::CapsuleCommands;

/// Load settings and apply CLI overrides.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. Logs go to stderr so stdout
/// stays machine-readable.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Dispatch a capsule subcommand.
pub async fn handle_capsule(settings: &Settings, command: CapsuleCommands) -> Result<()> {
    match command {
        CapsuleCommands::Generate {
            records,
            date,
            user,
            out,
        } => generate_capsule(settings, &records, date.as_deref(), &user, out.as_deref()).await,
        CapsuleCommands::Preview { records } => preview_capsule(settings, &records).await,
    }
}

/// Create the capsule for one day of records.
pub async fn generate_capsule(
    settings: &Settings,
    records_path: &Path,
    date: Option<&str>,
    user_id: &str,
    out: Option<&Path>,
) -> Result<()> {
    let timezone = settings.parse_timezone()?;
    let records = read_records(records_path)?;
    let target_date = match date {
        Some(d) => parse_date(d)?,
        None => default_date(&records, timezone),
    };

    info!(
        records = records.len(),
        date = %target_date,
        timezone = %timezone,
        "Generating daily capsule"
    );

    let store = Arc::new(InMemoryDiaryStore::new());
    store.add_records(user_id, records).await;

    let pipeline = CapsulePipeline::from_settings(settings)
        .context("Failed to initialize capsule pipeline")?;
    let service = CapsuleService::new(pipeline, store.clone(), store, timezone);

    let cancel = CancellationToken::new();
    let watcher = spawn_ctrl_c_watcher(cancel.clone());

    let result = service
        .create_daily_capsule(user_id, target_date, &cancel)
        .await;
    watcher.abort();

    let capsule = result.context("Failed to create daily capsule")?;
    let json = serde_json::to_string_pretty(&capsule)?;

    match out {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Capsule written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Print the aggregate, prompt and theme for a set of records.
pub async fn preview_capsule(settings: &Settings, records_path: &Path) -> Result<()> {
    let records = read_records(records_path)?;
    let pipeline = CapsulePipeline::from_settings(settings)
        .context("Failed to initialize capsule pipeline")?;

    let cancel = CancellationToken::new();
    let watcher = spawn_ctrl_c_watcher(cancel.clone());
    let preview = pipeline.preview(&records, &cancel).await;
    watcher.abort();

    println!("{}", serde_json::to_string_pretty(&preview.aggregate)?);
    println!();
    println!("Theme: {}", preview.theme);
    if let Some(artwork) = &preview.representative_artwork {
        println!("Artwork: {}", artwork);
    }
    println!();
    println!("{}", preview.prompt);
    Ok(())
}

/// Print the effective settings with secrets masked.
pub fn show_config(settings: &Settings) -> Result<()> {
    let rendered =
        toml::to_string_pretty(&settings.redacted()).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

/// Read a JSON array of listening records.
pub fn read_records(path: &Path) -> Result<Vec<ListeningRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;
    let records: Vec<ListeningRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid records file {}", path.display()))?;
    Ok(records)
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", value))
}

/// Local day of the most recent record, or today when there are none.
fn default_date(records: &[ListeningRecord], timezone: Tz) -> NaiveDate {
    records
        .iter()
        .map(|r| r.listened_at)
        .max()
        .unwrap_or_else(Utc::now)
        .with_timezone(&timezone)
        .date_naive()
}

fn spawn_ctrl_c_watcher(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, cancelling capsule generation...");
                cancel.cancel();
            }
            Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn test_read_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"track_title":"Song","primary_artist":"Artist A","listened_at":"2024-03-01T00:00:00Z","weather_tag":"Rain"}}]"#
        )
        .unwrap();

        let records = read_records(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].weather_tag.as_deref(), Some("Rain"));
    }

    #[test]
    fn test_read_records_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(read_records(file.path()).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(parse_date("03/01/2024").is_err());
    }

    #[test]
    fn test_default_date_uses_latest_record_in_timezone() {
        let records = vec![
            ListeningRecord::new(
                "Early",
                "A",
                Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap(),
            ),
            // 00:30 on 2024-03-02 in Seoul
            ListeningRecord::new(
                "Late",
                "A",
                Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap(),
            ),
        ];
        assert_eq!(
            default_date(&records, chrono_tz::Asia::Seoul),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
    }

    #[tokio::test]
    async fn test_generate_writes_fallback_capsule_without_key() {
        let dir = tempfile::tempdir().unwrap();
        let records_path = dir.path().join("day.json");
        let out_path = dir.path().join("capsule.json");
        fs::write(
            &records_path,
            r#"[{"track_title":"Song","primary_artist":"Artist A","listened_at":"2024-03-01T00:00:00Z"}]"#,
        )
        .unwrap();

        let settings = Settings::default();
        generate_capsule(
            &settings,
            &records_path,
            Some("2024-03-01"),
            "u1",
            Some(&out_path),
        )
        .await
        .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(written["source"], "fallback");
        assert_eq!(written["user_id"], "u1");
        assert_eq!(written["theme"], "aura");
    }

    #[tokio::test]
    async fn test_generate_fails_for_empty_day() {
        let dir = tempfile::tempdir().unwrap();
        let records_path = dir.path().join("day.json");
        fs::write(&records_path, "[]").unwrap();

        let result = generate_capsule(
            &Settings::default(),
            &records_path,
            Some("2024-03-01"),
            "u1",
            None,
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_show_config() {
        assert!(show_config(&Settings::default()).is_ok());
    }
}
