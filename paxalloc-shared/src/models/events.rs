use crate::ids::{AllocationSpace, ContainerId, PassengerId, SlotRef};

/// Change notifications emitted after every successful mutation.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum AllocationEvent {
    PassengerAssigned {
        passenger_id: PassengerId,
        target: SlotRef,
    },
    PassengerMoved {
        passenger_id: PassengerId,
        from: SlotRef,
        to: SlotRef,
    },
    PassengerUnassigned {
        passenger_id: PassengerId,
        from: SlotRef,
    },
    AutoFillCompleted {
        container_id: ContainerId,
        assigned_count: usize,
    },
    ContainerAdded {
        container_id: ContainerId,
        space: AllocationSpace,
    },
    ContainerUpdated {
        container_id: ContainerId,
    },
    ContainerRemoved {
        container_id: ContainerId,
        released: Vec<PassengerId>,
    },
    RosterRebuilt {
        passenger_count: usize,
        dropped_assignments: usize,
    },
}

impl AllocationEvent {
    /// Short event name, used as a log/topic key
    pub fn name(&self) -> &'static str {
        match self {
            AllocationEvent::PassengerAssigned { .. } => "passenger.assigned",
            AllocationEvent::PassengerMoved { .. } => "passenger.moved",
            AllocationEvent::PassengerUnassigned { .. } => "passenger.unassigned",
            AllocationEvent::AutoFillCompleted { .. } => "autofill.completed",
            AllocationEvent::ContainerAdded { .. } => "container.added",
            AllocationEvent::ContainerUpdated { .. } => "container.updated",
            AllocationEvent::ContainerRemoved { .. } => "container.removed",
            AllocationEvent::RosterRebuilt { .. } => "roster.rebuilt",
        }
    }
}
