pub mod ids;
pub mod models;
pub mod pii;

pub use ids::{AllocationSpace, ContainerId, PassengerId, SlotId, SlotRef};
pub use models::events::AllocationEvent;
pub use pii::Masked;
