//! Listening and capsule storage.
//!
//! The capsule service only needs two narrow operations from storage: the
//! records inside a day window and create/read of one capsule per user-day.
//! [`InMemoryDiaryStore`] implements both and backs the CLI and tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;

use diary_types::{DailyCapsule, DayWindow, DiaryError, ListeningRecord};

/// Read access to listening history.
#[async_trait]
pub trait ListeningStore: Send + Sync {
    /// Records of `user_id` listened to inside `window`, in any order.
    async fn records_between(
        &self,
        user_id: &str,
        window: &DayWindow,
    ) -> Result<Vec<ListeningRecord>, DiaryError>;
}

/// Persistence of daily capsules, one per user and date.
#[async_trait]
pub trait CapsuleStore: Send + Sync {
    /// Capsule for a user and date, if one exists.
    async fn find_capsule(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyCapsule>, DiaryError>;

    /// Insert a capsule. Fails with [`DiaryError::Conflict`] if the user
    /// already has one for that date.
    async fn insert_capsule(&self, capsule: DailyCapsule) -> Result<(), DiaryError>;
}

/// Process-local store for records and capsules.
#[derive(Debug, Default)]
pub struct InMemoryDiaryStore {
    records: RwLock<HashMap<String, Vec<ListeningRecord>>>,
    capsules: RwLock<HashMap<(String, NaiveDate), DailyCapsule>>,
}

impl InMemoryDiaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append listening records for a user.
    pub async fn add_records(
        &self,
        user_id: &str,
        records: impl IntoIterator<Item = ListeningRecord>,
    ) {
        let mut map = self.records.write().await;
        map.entry(user_id.to_string()).or_default().extend(records);
    }

    /// Number of stored capsules across all users.
    pub async fn capsule_count(&self) -> usize {
        self.capsules.read().await.len()
    }
}

#[async_trait]
impl ListeningStore for InMemoryDiaryStore {
    async fn records_between(
        &self,
        user_id: &str,
        window: &DayWindow,
    ) -> Result<Vec<ListeningRecord>, DiaryError> {
        let map = self.records.read().await;
        let records = map
            .get(user_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| window.contains(r.listened_at))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }
}

#[async_trait]
impl CapsuleStore for InMemoryDiaryStore {
    async fn find_capsule(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyCapsule>, DiaryError> {
        let map = self.capsules.read().await;
        Ok(map.get(&(user_id.to_string(), date)).cloned())
    }

    async fn insert_capsule(&self, capsule: DailyCapsule) -> Result<(), DiaryError> {
        let mut map = self.capsules.write().await;
        let key = (capsule.user_id.clone(), capsule.target_date);
        if map.contains_key(&key) {
            return Err(DiaryError::Conflict(format!(
                "capsule for {} on {} already exists",
                key.0, key.1
            )));
        }
        map.insert(key, capsule);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Asia::Seoul;
    use diary_types::{CapsuleSummary, ThemeTag};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn test_records_between_filters_by_window_and_user() {
        let store = InMemoryDiaryStore::new();
        let inside = Utc.with_ymd_and_hms(2024, 2, 29, 15, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();

        store
            .add_records(
                "u1",
                vec![
                    ListeningRecord::new("In", "A", inside),
                    ListeningRecord::new("Out", "A", outside),
                ],
            )
            .await;
        store
            .add_records("u2", vec![ListeningRecord::new("Other", "B", inside)])
            .await;

        let window = DayWindow::for_date(date(), Seoul).unwrap();
        let records = store.records_between("u1", &window).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].track_title, "In");
        assert!(store
            .records_between("nobody", &window)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_insert_capsule_rejects_duplicates() {
        let store = InMemoryDiaryStore::new();
        let capsule = DailyCapsule::new(
            "u1",
            date(),
            CapsuleSummary::fallback("A quiet day."),
            None,
            ThemeTag::Aura,
        );

        store.insert_capsule(capsule.clone()).await.unwrap();
        let err = store.insert_capsule(capsule).await.unwrap_err();
        assert!(matches!(err, DiaryError::Conflict(_)));

        let found = store.find_capsule("u1", date()).await.unwrap();
        assert_eq!(found.map(|c| c.summary), Some("A quiet day.".to_string()));
        assert_eq!(store.capsule_count().await, 1);
    }
}
