pub mod layout;
pub mod container;

pub use container::{ContainerKind, Occupancy, ResourceContainer, Slot};
pub use layout::{Layout, RoomBatch, RoomType, SlotBatch, VehicleLayout};

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Container name must not be empty")]
    EmptyName,

    #[error("Layout does not match container kind {0:?}")]
    KindMismatch(ContainerKind),

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(String),
}
