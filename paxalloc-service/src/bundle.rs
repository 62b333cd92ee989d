use crate::ServiceResult;
use paxalloc_engine::{
    migrate_legacy_operational_data, AllocationSession, ManifestData, OperationalData, RosterSources,
    TripInfo,
};
use paxalloc_roster::RosterSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything needed to open one trip: header, roster sources and the stored
/// operational data in whatever schema version it was saved with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripBundle {
    pub trip: TripInfo,
    #[serde(flatten)]
    pub sources: RosterSources,
    #[serde(default)]
    pub operational_data: serde_json::Value,
}

impl TripBundle {
    pub async fn read(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Migrate the stored data and open a session over it
    pub fn open_session(self, settings: RosterSettings) -> ServiceResult<(TripInfo, AllocationSession)> {
        let data = if self.operational_data.is_null() {
            OperationalData::empty()
        } else {
            migrate_legacy_operational_data(self.operational_data)?
        };
        tracing::info!(
            trip_id = %self.trip.id,
            vehicles = data.vehicles.len(),
            hotels = data.hotels.len(),
            bookings = self.sources.bookings.len(),
            "Opening allocation session"
        );
        let session = AllocationSession::open(data, self.sources, settings)?;
        Ok((self.trip, session))
    }
}

/// Result of a batch run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutput {
    pub operational_data: OperationalData,
    pub manifest: ManifestData,
}
