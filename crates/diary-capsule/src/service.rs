//! Daily capsule service.
//!
//! Request-level logic around the pipeline: one capsule per user and day,
//! records loaded through the diary timezone's day window, persisted once.

use chrono::NaiveDate;
use chrono_tz::Tz;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use diary_types::{DailyCapsule, DayWindow, DiaryError};

use crate::error::CapsuleError;
use crate::pipeline::CapsulePipeline;
use crate::store::{CapsuleStore, ListeningStore};

/// Creates and reads daily capsules.
pub struct CapsuleService {
    pipeline: CapsulePipeline,
    listening: Arc<dyn ListeningStore>,
    capsules: Arc<dyn CapsuleStore>,
    timezone: Tz,
}

impl CapsuleService {
    pub fn new(
        pipeline: CapsulePipeline,
        listening: Arc<dyn ListeningStore>,
        capsules: Arc<dyn CapsuleStore>,
        timezone: Tz,
    ) -> Self {
        Self {
            pipeline,
            listening,
            capsules,
            timezone,
        }
    }

    /// Create the capsule for `user_id` on `target_date`.
    ///
    /// Fails with `AlreadyExists` if one was already created and with
    /// `NoListening` if the day has no records. Backend trouble never fails
    /// the request; it only changes the capsule's source to fallback.
    #[instrument(skip(self, cancel))]
    pub async fn create_daily_capsule(
        &self,
        user_id: &str,
        target_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<DailyCapsule, CapsuleError> {
        if self
            .capsules
            .find_capsule(user_id, target_date)
            .await?
            .is_some()
        {
            return Err(already_exists(user_id, target_date));
        }

        let window = DayWindow::for_date(target_date, self.timezone)?;
        let mut records = self.listening.records_between(user_id, &window).await?;
        if records.is_empty() {
            return Err(CapsuleError::NoListening {
                user_id: user_id.to_string(),
                date: target_date.to_string(),
            });
        }
        records.sort_by_key(|r| r.listened_at);

        let outcome = self.pipeline.run(&records, cancel).await;
        let capsule = DailyCapsule::new(
            user_id,
            target_date,
            outcome.summary,
            outcome.representative_artwork,
            outcome.theme,
        );

        match self.capsules.insert_capsule(capsule.clone()).await {
            Ok(()) => {}
            Err(DiaryError::Conflict(_)) => return Err(already_exists(user_id, target_date)),
            Err(e) => return Err(e.into()),
        }

        info!(
            capsule_id = %capsule.id,
            source = %capsule.source,
            theme = %capsule.theme,
            "Daily capsule created"
        );
        Ok(capsule)
    }

    /// Fetch the capsule for `user_id` on `date`.
    pub async fn get_daily_capsule(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<DailyCapsule, CapsuleError> {
        self.capsules
            .find_capsule(user_id, date)
            .await?
            .ok_or_else(|| CapsuleError::NotFound {
                user_id: user_id.to_string(),
                date: date.to_string(),
            })
    }

    /// Pipeline used by this service.
    pub fn pipeline(&self) -> &CapsulePipeline {
        &self.pipeline
    }
}

fn already_exists(user_id: &str, date: NaiveDate) -> CapsuleError {
    CapsuleError::AlreadyExists {
        user_id: user_id.to_string(),
        date: date.to_string(),
    }
}
