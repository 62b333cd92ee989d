use crate::layout::{Layout, RoomBatch, RoomType, SlotBatch, VehicleLayout};
use crate::ResourceError;
use paxalloc_shared::{AllocationSpace, ContainerId, PassengerId, SlotId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerKind {
    Vehicle,
    RoomSet,
}

impl ContainerKind {
    /// Allocation space this kind of container belongs to
    pub fn space(self) -> AllocationSpace {
        match self {
            ContainerKind::Vehicle => AllocationSpace::Seats,
            ContainerKind::RoomSet => AllocationSpace::Rooms,
        }
    }
}

/// One seat or one room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: SlotId,
    /// Display number; numeric adjacency drives auto-fill grouping
    pub number: u32,
    pub capacity: u32,
    #[serde(default)]
    pub room_type: Option<RoomType>,
    #[serde(default)]
    pub occupants: Vec<PassengerId>,
}

impl Slot {
    pub fn seat(number: u32) -> Self {
        Self {
            id: SlotId::for_seat(number),
            number,
            capacity: 1,
            room_type: None,
            occupants: Vec::new(),
        }
    }

    pub fn room(number: u32, room_type: RoomType, capacity: u32) -> Self {
        Self {
            id: SlotId::generate_room(),
            number,
            capacity,
            room_type: Some(room_type),
            occupants: Vec::new(),
        }
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.occupants.len() as u32)
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() as u32 >= self.capacity
    }

    pub fn holds(&self, passenger_id: &PassengerId) -> bool {
        self.occupants.contains(passenger_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    pub occupied: u32,
    pub capacity: u32,
}

impl Occupancy {
    pub fn free(&self) -> u32 {
        self.capacity.saturating_sub(self.occupied)
    }
}

/// A vehicle or a hotel: a named, ordered collection of slots.
///
/// Slot order is the display order (seat or room numbering) and is never
/// rearranged after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContainer {
    pub id: ContainerId,
    pub display_name: String,
    pub kind: ContainerKind,
    /// Seat-map columns, vehicles only
    #[serde(default)]
    pub columns: Option<u32>,
    pub slots: Vec<Slot>,
}

impl ResourceContainer {
    /// Create a container with a generated id
    pub fn create(kind: ContainerKind, name: &str, layout: &Layout) -> Result<Self, ResourceError> {
        Self::create_with_id(ContainerId::generate(), kind, name, layout)
    }

    pub fn create_with_id(
        id: ContainerId,
        kind: ContainerKind,
        name: &str,
        layout: &Layout,
    ) -> Result<Self, ResourceError> {
        let display_name = validate_name(name)?;

        let mut container = Self {
            id,
            display_name,
            kind,
            columns: None,
            slots: Vec::new(),
        };

        match (kind, layout) {
            (ContainerKind::Vehicle, Layout::Vehicle(vehicle)) => {
                vehicle.validate()?;
                container.columns = Some(vehicle.columns);
                container.push_seats(vehicle.total_slots);
            }
            (ContainerKind::RoomSet, Layout::Rooms { batches }) => {
                if batches.is_empty() {
                    return Err(ResourceError::InvalidLayout("no rooms requested".to_string()));
                }
                for batch in batches {
                    container.push_rooms(batch)?;
                }
            }
            _ => return Err(ResourceError::KindMismatch(kind)),
        }

        Ok(container)
    }

    pub fn space(&self) -> AllocationSpace {
        self.kind.space()
    }

    pub fn rename(&mut self, name: &str) -> Result<(), ResourceError> {
        self.display_name = validate_name(name)?;
        Ok(())
    }

    /// Append slots, numbered after the highest number in use
    pub fn add_slots(&mut self, batch: &SlotBatch) -> Result<Vec<SlotId>, ResourceError> {
        let before = self.slots.len();
        match (self.kind, batch) {
            (ContainerKind::Vehicle, SlotBatch::Seats { count }) => {
                VehicleLayout {
                    total_slots: *count,
                    columns: self.columns.unwrap_or(1),
                }
                .validate()?;
                self.push_seats(*count);
            }
            (ContainerKind::RoomSet, SlotBatch::Rooms(rooms)) => {
                self.push_rooms(rooms)?;
            }
            _ => return Err(ResourceError::KindMismatch(self.kind)),
        }
        Ok(self.slots[before..].iter().map(|s| s.id.clone()).collect())
    }

    /// Detach a slot, returning it with whatever occupants it had
    pub fn remove_slot(&mut self, slot_id: &SlotId) -> Result<Slot, ResourceError> {
        let position = self
            .slots
            .iter()
            .position(|s| &s.id == slot_id)
            .ok_or_else(|| ResourceError::SlotNotFound(slot_id.to_string()))?;
        Ok(self.slots.remove(position))
    }

    pub fn slot(&self, slot_id: &SlotId) -> Option<&Slot> {
        self.slots.iter().find(|s| &s.id == slot_id)
    }

    pub fn slot_mut(&mut self, slot_id: &SlotId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| &s.id == slot_id)
    }

    pub fn occupancy(&self) -> Occupancy {
        self.slots.iter().fold(Occupancy::default(), |acc, slot| Occupancy {
            occupied: acc.occupied + slot.occupants.len() as u32,
            capacity: acc.capacity + slot.capacity,
        })
    }

    /// Share of capacity in use, 0.0 for an empty container
    pub fn utilization(&self) -> f64 {
        let occupancy = self.occupancy();
        if occupancy.capacity == 0 {
            0.0
        } else {
            occupancy.occupied as f64 / occupancy.capacity as f64
        }
    }

    fn next_number(&self) -> u32 {
        let highest = self.slots.iter().map(|s| s.number).max().unwrap_or(0);
        highest.max(self.slots.len() as u32) + 1
    }

    fn push_seats(&mut self, count: u32) {
        let first = self.next_number();
        self.slots.extend((first..first + count).map(Slot::seat));
    }

    fn push_rooms(&mut self, batch: &RoomBatch) -> Result<(), ResourceError> {
        let capacity = batch.validate()?;
        let first = self.next_number();
        self.slots.extend(
            (first..first + batch.count).map(|number| Slot::room(number, batch.room_type, capacity)),
        );
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, ResourceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ResourceError::EmptyName);
    }
    Ok(name.to_string())
}
