use paxalloc_resources::{ResourceContainer, ResourceError, SlotBatch};
use paxalloc_shared::{AllocationSpace, ContainerId, PassengerId, SlotId, SlotRef};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Result of a successful `assign`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    Placed { to: SlotRef },
    /// The passenger held another slot in the same space and was relocated
    Moved { from: SlotRef, to: SlotRef },
    /// Already in the requested slot
    Unchanged,
}

/// Occupant info for a non-empty slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotOccupancy<'a> {
    pub occupants: &'a [PassengerId],
    pub capacity: u32,
}

/// Single source of truth for one allocation space (all vehicles, or all
/// hotels). Slot occupant lists and the passenger index are kept in step by
/// every mutation.
#[derive(Debug, Clone)]
pub struct AssignmentStore {
    space: AllocationSpace,
    containers: Vec<ResourceContainer>,
    placements: HashMap<PassengerId, SlotRef>,
}

impl AssignmentStore {
    pub fn new(space: AllocationSpace) -> Self {
        Self {
            space,
            containers: Vec::new(),
            placements: HashMap::new(),
        }
    }

    /// Build a store from persisted containers.
    ///
    /// Occupants beyond a slot's capacity and passengers already placed
    /// elsewhere in the space are dropped with a warning.
    pub fn load(space: AllocationSpace, containers: Vec<ResourceContainer>) -> Result<Self, AssignmentError> {
        let mut store = Self::new(space);
        for container in containers {
            store.absorb(container)?;
        }
        store.debug_verify();
        Ok(store)
    }

    pub fn space(&self) -> AllocationSpace {
        self.space
    }

    pub fn containers(&self) -> &[ResourceContainer] {
        &self.containers
    }

    pub fn into_containers(self) -> Vec<ResourceContainer> {
        self.containers
    }

    pub fn container(&self, container_id: &ContainerId) -> Option<&ResourceContainer> {
        self.containers.iter().find(|c| &c.id == container_id)
    }

    pub fn contains_container(&self, container_id: &ContainerId) -> bool {
        self.container(container_id).is_some()
    }

    pub fn add_container(&mut self, container: ResourceContainer) -> Result<(), AssignmentError> {
        self.absorb(container)?;
        self.debug_verify();
        Ok(())
    }

    pub fn rename_container(&mut self, container_id: &ContainerId, name: &str) -> Result<(), AssignmentError> {
        let index = self.container_index(container_id)?;
        self.containers[index].rename(name)?;
        Ok(())
    }

    /// Remove a container and release everyone it held
    pub fn remove_container(&mut self, container_id: &ContainerId) -> Result<Vec<PassengerId>, AssignmentError> {
        let index = self.container_index(container_id)?;
        let container = self.containers.remove(index);

        let released: Vec<PassengerId> = container
            .slots
            .into_iter()
            .flat_map(|slot| slot.occupants)
            .collect();
        for passenger_id in &released {
            self.placements.remove(passenger_id);
        }

        tracing::info!(
            "Removed container {} ({}), released {} passengers",
            container.id,
            container.display_name,
            released.len()
        );
        self.debug_verify();
        Ok(released)
    }

    pub fn add_slots(&mut self, container_id: &ContainerId, batch: &SlotBatch) -> Result<Vec<SlotId>, AssignmentError> {
        let index = self.container_index(container_id)?;
        let added = self.containers[index].add_slots(batch)?;
        Ok(added)
    }

    /// Remove one slot and release its occupants
    pub fn remove_slot(&mut self, container_id: &ContainerId, slot_id: &SlotId) -> Result<Vec<PassengerId>, AssignmentError> {
        let (container_index, _) = self.locate(container_id, slot_id)?;
        let slot = self.containers[container_index].remove_slot(slot_id)?;
        for passenger_id in &slot.occupants {
            self.placements.remove(passenger_id);
        }
        self.debug_verify();
        Ok(slot.occupants)
    }

    /// Place a passenger in a slot.
    ///
    /// A passenger already holding a slot in this space is moved: the old
    /// placement is released in the same call. A full slot is rejected
    /// without touching any state.
    pub fn assign(
        &mut self,
        passenger_id: &PassengerId,
        container_id: &ContainerId,
        slot_id: &SlotId,
    ) -> Result<AssignOutcome, AssignmentError> {
        let (container_index, slot_index) = self.locate(container_id, slot_id)?;

        let slot = &self.containers[container_index].slots[slot_index];
        if slot.holds(passenger_id) {
            return Ok(AssignOutcome::Unchanged);
        }
        if slot.is_full() {
            return Err(AssignmentError::SlotFull {
                container_id: container_id.to_string(),
                slot_id: slot_id.to_string(),
                capacity: slot.capacity,
            });
        }

        // detaching never removes slots, so the indices stay valid
        let previous = self.detach(passenger_id);
        self.containers[container_index].slots[slot_index]
            .occupants
            .push(passenger_id.clone());

        let target = SlotRef {
            container_id: container_id.clone(),
            slot_id: slot_id.clone(),
        };
        self.placements.insert(passenger_id.clone(), target.clone());
        self.debug_verify();

        Ok(match previous {
            Some(from) => AssignOutcome::Moved { from, to: target },
            None => AssignOutcome::Placed { to: target },
        })
    }

    /// Release whatever slot the passenger holds. No-op when unassigned.
    pub fn unassign(&mut self, passenger_id: &PassengerId) -> Option<SlotRef> {
        let previous = self.detach(passenger_id);
        self.debug_verify();
        previous
    }

    /// Release the passenger only if they sit in this exact slot
    pub fn unassign_from(&mut self, target: &SlotRef, passenger_id: &PassengerId) -> Result<bool, AssignmentError> {
        let (container_index, slot_index) = self.locate(&target.container_id, &target.slot_id)?;
        if !self.containers[container_index].slots[slot_index].holds(passenger_id) {
            return Ok(false);
        }
        self.detach(passenger_id);
        self.debug_verify();
        Ok(true)
    }

    pub fn is_occupied(&self, container_id: &ContainerId, slot_id: &SlotId) -> Option<SlotOccupancy<'_>> {
        let slot = self.container(container_id)?.slot(slot_id)?;
        if slot.occupants.is_empty() {
            return None;
        }
        Some(SlotOccupancy {
            occupants: &slot.occupants,
            capacity: slot.capacity,
        })
    }

    pub fn placement(&self, passenger_id: &PassengerId) -> Option<&SlotRef> {
        self.placements.get(passenger_id)
    }

    pub fn is_assigned(&self, passenger_id: &PassengerId) -> bool {
        self.placements.contains_key(passenger_id)
    }

    pub fn assigned_count(&self) -> usize {
        self.placements.len()
    }

    /// Read-only copy of every placement, ordered by passenger id
    pub fn assignments_snapshot(&self) -> BTreeMap<PassengerId, SlotRef> {
        self.placements
            .iter()
            .map(|(id, slot)| (id.clone(), slot.clone()))
            .collect()
    }

    /// Drop placements for passengers that fail `keep`; returns who was dropped
    pub fn retain_passengers<F>(&mut self, keep: F) -> Vec<PassengerId>
    where
        F: Fn(&PassengerId) -> bool,
    {
        let mut dropped: Vec<PassengerId> = self
            .placements
            .keys()
            .filter(|id| !keep(*id))
            .cloned()
            .collect();
        dropped.sort();

        for passenger_id in &dropped {
            tracing::warn!("Dropping {} assignment of unknown passenger {}", self.space, passenger_id);
            self.detach(passenger_id);
        }
        self.debug_verify();
        dropped
    }

    /// Full consistency check between slots and the passenger index
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen: HashSet<&PassengerId> = HashSet::new();

        for container in &self.containers {
            if container.space() != self.space {
                return Err(InvariantViolation::WrongSpace(container.id.to_string()));
            }
            for slot in &container.slots {
                if slot.occupants.len() as u32 > slot.capacity {
                    return Err(InvariantViolation::OverCapacity {
                        container_id: container.id.to_string(),
                        slot_id: slot.id.to_string(),
                    });
                }
                for passenger_id in &slot.occupants {
                    if !seen.insert(passenger_id) {
                        return Err(InvariantViolation::DuplicatePlacement(passenger_id.to_string()));
                    }
                    match self.placements.get(passenger_id) {
                        Some(placement)
                            if placement.container_id == container.id && placement.slot_id == slot.id => {}
                        _ => return Err(InvariantViolation::IndexMismatch(passenger_id.to_string())),
                    }
                }
            }
        }

        if let Some(dangling) = self.placements.keys().find(|id| !seen.contains(id)) {
            return Err(InvariantViolation::DanglingPlacement(dangling.to_string()));
        }
        Ok(())
    }

    fn debug_verify(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = self.check_invariants() {
                panic!("{} assignment store corrupted: {}", self.space, violation);
            }
        }
    }

    fn container_index(&self, container_id: &ContainerId) -> Result<usize, AssignmentError> {
        self.containers
            .iter()
            .position(|c| &c.id == container_id)
            .ok_or_else(|| AssignmentError::ContainerNotFound(container_id.to_string()))
    }

    fn locate(&self, container_id: &ContainerId, slot_id: &SlotId) -> Result<(usize, usize), AssignmentError> {
        let container_index = self.container_index(container_id)?;
        let slot_index = self.containers[container_index]
            .slots
            .iter()
            .position(|s| &s.id == slot_id)
            .ok_or_else(|| AssignmentError::SlotNotFound {
                container_id: container_id.to_string(),
                slot_id: slot_id.to_string(),
            })?;
        Ok((container_index, slot_index))
    }

    fn detach(&mut self, passenger_id: &PassengerId) -> Option<SlotRef> {
        let previous = self.placements.remove(passenger_id)?;
        if let Some(slot) = self
            .containers
            .iter_mut()
            .find(|c| c.id == previous.container_id)
            .and_then(|c| c.slot_mut(&previous.slot_id))
        {
            slot.occupants.retain(|p| p != passenger_id);
        }
        Some(previous)
    }

    fn absorb(&mut self, mut container: ResourceContainer) -> Result<(), AssignmentError> {
        if container.space() != self.space {
            return Err(AssignmentError::KindMismatch {
                container_id: container.id.to_string(),
                space: self.space,
            });
        }
        if self.contains_container(&container.id) {
            return Err(AssignmentError::DuplicateContainer(container.id.to_string()));
        }

        let mut slot_ids = HashSet::new();
        for slot in &container.slots {
            if !slot_ids.insert(&slot.id) {
                return Err(AssignmentError::DuplicateSlot {
                    container_id: container.id.to_string(),
                    slot_id: slot.id.to_string(),
                });
            }
        }

        for slot in &mut container.slots {
            let mut kept: Vec<PassengerId> = Vec::new();
            for passenger_id in std::mem::take(&mut slot.occupants) {
                if kept.len() as u32 >= slot.capacity {
                    tracing::warn!(
                        "Slot {}/{} over capacity, dropping {}",
                        container.id,
                        slot.id,
                        passenger_id
                    );
                    continue;
                }
                if kept.contains(&passenger_id) || self.placements.contains_key(&passenger_id) {
                    tracing::warn!(
                        "Passenger {} already holds a {} slot, dropping duplicate in {}/{}",
                        passenger_id,
                        self.space,
                        container.id,
                        slot.id
                    );
                    continue;
                }
                kept.push(passenger_id);
            }

            for passenger_id in &kept {
                self.placements.insert(
                    passenger_id.clone(),
                    SlotRef {
                        container_id: container.id.clone(),
                        slot_id: slot.id.clone(),
                    },
                );
            }
            slot.occupants = kept;
        }

        self.containers.push(container);
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Slot {slot_id} not found in container {container_id}")]
    SlotNotFound {
        container_id: String,
        slot_id: String,
    },

    #[error("Slot {slot_id} in container {container_id} is full (capacity {capacity})")]
    SlotFull {
        container_id: String,
        slot_id: String,
        capacity: u32,
    },

    #[error("Container {container_id} does not belong to the {space} space")]
    KindMismatch {
        container_id: String,
        space: AllocationSpace,
    },

    #[error("Container already exists: {0}")]
    DuplicateContainer(String),

    #[error("Slot id {slot_id} appears twice in container {container_id}")]
    DuplicateSlot {
        container_id: String,
        slot_id: String,
    },

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Store corruption; only a bug can produce one of these
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("slot {container_id}/{slot_id} exceeds its capacity")]
    OverCapacity {
        container_id: String,
        slot_id: String,
    },

    #[error("passenger {0} holds more than one slot")]
    DuplicatePlacement(String),

    #[error("index entry for passenger {0} does not match its slot")]
    IndexMismatch(String),

    #[error("index references passenger {0} who is in no slot")]
    DanglingPlacement(String),

    #[error("container {0} belongs to another allocation space")]
    WrongSpace(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use paxalloc_resources::{ContainerKind, Layout, RoomBatch, RoomType, VehicleLayout};

    fn bus(id: &str, seats: u32) -> ResourceContainer {
        ResourceContainer::create_with_id(
            ContainerId::from(id),
            ContainerKind::Vehicle,
            id,
            &Layout::Vehicle(VehicleLayout { total_slots: seats, columns: 4 }),
        )
        .unwrap()
    }

    fn seats_store() -> AssignmentStore {
        AssignmentStore::load(AllocationSpace::Seats, vec![bus("bus-1", 4), bus("bus-2", 4)]).unwrap()
    }

    fn pid(id: &str) -> PassengerId {
        PassengerId::from(id)
    }

    #[test]
    fn test_assign_and_snapshot() {
        let mut store = seats_store();
        let outcome = store.assign(&pid("a"), &ContainerId::from("bus-1"), &SlotId::from("2")).unwrap();
        assert_eq!(outcome, AssignOutcome::Placed { to: SlotRef::new("bus-1", "2") });

        let snapshot = store.assignments_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[&pid("a")], SlotRef::new("bus-1", "2"));
    }

    #[test]
    fn test_full_slot_rejected_without_mutation() {
        let mut store = seats_store();
        store.assign(&pid("a"), &ContainerId::from("bus-1"), &SlotId::from("1")).unwrap();
        store.assign(&pid("b"), &ContainerId::from("bus-1"), &SlotId::from("2")).unwrap();

        let before = store.assignments_snapshot();
        let result = store.assign(&pid("b"), &ContainerId::from("bus-1"), &SlotId::from("1"));
        assert!(matches!(result, Err(AssignmentError::SlotFull { capacity: 1, .. })));
        assert_eq!(store.assignments_snapshot(), before);
    }

    #[test]
    fn test_unknown_ids() {
        let mut store = seats_store();
        assert!(matches!(
            store.assign(&pid("a"), &ContainerId::from("van"), &SlotId::from("1")),
            Err(AssignmentError::ContainerNotFound(_))
        ));
        assert!(matches!(
            store.assign(&pid("a"), &ContainerId::from("bus-1"), &SlotId::from("99")),
            Err(AssignmentError::SlotNotFound { .. })
        ));
        assert_eq!(store.assigned_count(), 0);
    }

    #[test]
    fn test_reassign_moves_across_containers() {
        let mut store = seats_store();
        store.assign(&pid("a"), &ContainerId::from("bus-1"), &SlotId::from("1")).unwrap();

        let outcome = store.assign(&pid("a"), &ContainerId::from("bus-2"), &SlotId::from("3")).unwrap();
        assert_eq!(
            outcome,
            AssignOutcome::Moved {
                from: SlotRef::new("bus-1", "1"),
                to: SlotRef::new("bus-2", "3"),
            }
        );
        assert_eq!(store.assigned_count(), 1);
        assert!(store.is_occupied(&ContainerId::from("bus-1"), &SlotId::from("1")).is_none());
        assert_eq!(
            store.is_occupied(&ContainerId::from("bus-2"), &SlotId::from("3")).unwrap().occupants,
            &[pid("a")]
        );
    }

    #[test]
    fn test_assign_same_slot_is_unchanged() {
        let mut store = seats_store();
        store.assign(&pid("a"), &ContainerId::from("bus-1"), &SlotId::from("1")).unwrap();
        let outcome = store.assign(&pid("a"), &ContainerId::from("bus-1"), &SlotId::from("1")).unwrap();
        assert_eq!(outcome, AssignOutcome::Unchanged);
    }

    #[test]
    fn test_unassign_is_noop_when_unassigned() {
        let mut store = seats_store();
        assert_eq!(store.unassign(&pid("ghost")), None);

        store.assign(&pid("a"), &ContainerId::from("bus-1"), &SlotId::from("1")).unwrap();
        assert_eq!(store.unassign(&pid("a")), Some(SlotRef::new("bus-1", "1")));
        assert!(!store.is_assigned(&pid("a")));
    }

    #[test]
    fn test_unassign_from_other_slot_keeps_placement() {
        let mut store = seats_store();
        store.assign(&pid("a"), &ContainerId::from("bus-1"), &SlotId::from("1")).unwrap();
        let removed = store.unassign_from(&SlotRef::new("bus-1", "2"), &pid("a")).unwrap();
        assert!(!removed);
        assert!(store.is_assigned(&pid("a")));
    }

    #[test]
    fn test_room_capacity() {
        let hotel = ResourceContainer::create_with_id(
            ContainerId::from("hotel"),
            ContainerKind::RoomSet,
            "Hotel",
            &Layout::Rooms { batches: vec![RoomBatch::new(RoomType::Double, 1)] },
        )
        .unwrap();
        let room = hotel.slots[0].id.clone();
        let mut store = AssignmentStore::load(AllocationSpace::Rooms, vec![hotel]).unwrap();
        let hotel_id = ContainerId::from("hotel");

        store.assign(&pid("a"), &hotel_id, &room).unwrap();
        store.assign(&pid("b"), &hotel_id, &room).unwrap();
        assert!(matches!(
            store.assign(&pid("c"), &hotel_id, &room),
            Err(AssignmentError::SlotFull { capacity: 2, .. })
        ));
        assert_eq!(store.is_occupied(&hotel_id, &room).unwrap().occupants.len(), 2);
    }

    #[test]
    fn test_remove_container_cascades() {
        let mut store = seats_store();
        store.assign(&pid("a"), &ContainerId::from("bus-1"), &SlotId::from("1")).unwrap();
        store.assign(&pid("b"), &ContainerId::from("bus-1"), &SlotId::from("2")).unwrap();
        store.assign(&pid("c"), &ContainerId::from("bus-2"), &SlotId::from("1")).unwrap();

        let mut released = store.remove_container(&ContainerId::from("bus-1")).unwrap();
        released.sort();
        assert_eq!(released, vec![pid("a"), pid("b")]);
        assert_eq!(store.assigned_count(), 1);
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_slot_cascades() {
        let mut store = seats_store();
        store.assign(&pid("a"), &ContainerId::from("bus-1"), &SlotId::from("3")).unwrap();
        let released = store.remove_slot(&ContainerId::from("bus-1"), &SlotId::from("3")).unwrap();
        assert_eq!(released, vec![pid("a")]);
        assert!(store.placement(&pid("a")).is_none());
        assert_eq!(store.container(&ContainerId::from("bus-1")).unwrap().slots.len(), 3);
    }

    #[test]
    fn test_load_repairs_corrupt_occupancy() {
        let mut first = bus("bus-1", 2);
        first.slots[0].occupants = vec![pid("a"), pid("b")];
        let mut second = bus("bus-2", 2);
        second.slots[1].occupants = vec![pid("a")];

        let store = AssignmentStore::load(AllocationSpace::Seats, vec![first, second]).unwrap();
        assert_eq!(store.assigned_count(), 1);
        assert_eq!(store.placement(&pid("a")), Some(&SlotRef::new("bus-1", "1")));
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_load_rejects_wrong_space_and_duplicates() {
        assert!(matches!(
            AssignmentStore::load(AllocationSpace::Rooms, vec![bus("bus-1", 2)]),
            Err(AssignmentError::KindMismatch { .. })
        ));
        assert!(matches!(
            AssignmentStore::load(AllocationSpace::Seats, vec![bus("bus-1", 2), bus("bus-1", 2)]),
            Err(AssignmentError::DuplicateContainer(_))
        ));
    }

    #[test]
    fn test_retain_passengers_drops_orphans() {
        let mut store = seats_store();
        store.assign(&pid("keep"), &ContainerId::from("bus-1"), &SlotId::from("1")).unwrap();
        store.assign(&pid("gone"), &ContainerId::from("bus-1"), &SlotId::from("2")).unwrap();

        let dropped = store.retain_passengers(|id| id.as_str() == "keep");
        assert_eq!(dropped, vec![pid("gone")]);
        assert!(store.is_occupied(&ContainerId::from("bus-1"), &SlotId::from("2")).is_none());
    }
}
