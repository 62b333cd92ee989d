use paxalloc_resources::ResourceContainer;
use paxalloc_roster::{ManualPassenger, NameOverrides};
use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

fn current_schema_version() -> u32 { CURRENT_SCHEMA_VERSION }

/// Persisted operational sub-document of a trip: every container with its
/// slot occupancy plus the manual roster inputs. Read once on load, written
/// back by the host after each mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OperationalData {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub vehicles: Vec<ResourceContainer>,
    #[serde(default)]
    pub hotels: Vec<ResourceContainer>,
    #[serde(default)]
    pub manual_passengers: Vec<ManualPassenger>,
    #[serde(default)]
    pub name_overrides: NameOverrides,
}

impl OperationalData {
    pub fn empty() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            ..Default::default()
        }
    }
}
