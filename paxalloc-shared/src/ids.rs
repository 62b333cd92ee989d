use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable passenger identifier.
///
/// Booking-derived ids are `<bookingId>-<index>` so rebuilding the roster from
/// the same bookings yields the same ids. Manual ids carry a `manual-` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassengerId(pub String);

impl PassengerId {
    pub const MANUAL_PREFIX: &'static str = "manual-";

    pub fn for_booking(booking_id: &str, index: u32) -> Self {
        Self(format!("{}-{}", booking_id, index))
    }

    /// Fresh id for a manually entered passenger
    pub fn new_manual() -> Self {
        Self(format!("{}{}", Self::MANUAL_PREFIX, Uuid::new_v4()))
    }

    pub fn is_manual(&self) -> bool {
        self.0.starts_with(Self::MANUAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PassengerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PassengerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Slot identifier, unique within its container.
/// Seats use their seat number; rooms use a generated id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub String);

impl SlotId {
    pub fn for_seat(number: u32) -> Self {
        Self(number.to_string())
    }

    pub fn generate_room() -> Self {
        Self(format!("room-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Target of an assignment: one slot inside one container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRef {
    pub container_id: ContainerId,
    pub slot_id: SlotId,
}

impl SlotRef {
    pub fn new(container_id: impl Into<ContainerId>, slot_id: impl Into<SlotId>) -> Self {
        Self {
            container_id: container_id.into(),
            slot_id: slot_id.into(),
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container_id, self.slot_id)
    }
}

/// Independent assignment universe. A passenger may hold one seat and one
/// room at the same time, never two of either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationSpace {
    Seats,
    Rooms,
}

impl fmt::Display for AllocationSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationSpace::Seats => f.write_str("seats"),
            AllocationSpace::Rooms => f.write_str("rooms"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_ids_are_deterministic() {
        assert_eq!(PassengerId::for_booking("bk42", 2), PassengerId::for_booking("bk42", 2));
        assert_eq!(PassengerId::for_booking("bk42", 2).as_str(), "bk42-2");
    }

    #[test]
    fn test_manual_ids_are_prefixed_and_unique() {
        let a = PassengerId::new_manual();
        let b = PassengerId::new_manual();
        assert!(a.is_manual());
        assert!(!PassengerId::for_booking("bk1", 0).is_manual());
        assert_ne!(a, b);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let slot = SlotRef::new("bus-1", "12");
        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json, serde_json::json!({ "containerId": "bus-1", "slotId": "12" }));
    }
}
