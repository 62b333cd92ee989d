pub mod store;
pub mod autofill;
pub mod session;
pub mod manifest;
pub mod operational;
pub mod migration;
pub mod sink;

pub use autofill::{plan_auto_fill, AutoFillReport};
pub use manifest::{build_manifest, ManifestData, TripInfo};
pub use migration::{migrate_legacy_operational_data, MigrationError};
pub use operational::OperationalData;
pub use session::{AllocationSession, Interaction, RosterSources, SessionError};
pub use sink::SnapshotSink;
pub use store::{AssignOutcome, AssignmentError, AssignmentStore, InvariantViolation, SlotOccupancy};
