use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMarker {
    pub date: NaiveDate,
    pub object_count: usize,
    pub recorded_at: DateTime<Utc>,
}

impl Store {
    pub fn get_summary_marker(&self, summary: &str) -> Result<Option<SummaryMarker>, StoreError> {
        let key = keys::summary_marker_key(summary);
        match self.markers.get(key.as_bytes())? {
            Some(raw) => match Self::deserialize::<SummaryMarker>(&raw) {
                Ok(marker) => Ok(Some(marker)),
                Err(error) => {
                    tracing::error!(summary, error = %error, "Failed to deserialize summary marker");
                    Err(error)
                }
            },
            None => Ok(None),
        }
    }

    /// Stores the marker unless a later date is already recorded.
    pub fn save_summary_marker(
        &self,
        summary: &str,
        marker: &SummaryMarker,
    ) -> Result<(), StoreError> {
        if let Some(existing) = self.get_summary_marker(summary)? {
            if existing.date > marker.date {
                tracing::warn!(
                    summary,
                    existing = %existing.date,
                    attempted = %marker.date,
                    "Refusing to move summary marker backwards"
                );
                return Ok(());
            }
        }
        let key = keys::summary_marker_key(summary);
        self.markers
            .insert(key.as_bytes(), Self::serialize(marker)?)?;
        self.markers.flush()?;
        Ok(())
    }
}
