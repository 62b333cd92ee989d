use crate::autofill::AutoFillReport;
use crate::manifest::{build_manifest, ManifestData, TripInfo};
use crate::operational::{OperationalData, CURRENT_SCHEMA_VERSION};
use crate::sink::SnapshotSink;
use crate::store::{AssignOutcome, AssignmentError, AssignmentStore, SlotOccupancy};
use paxalloc_resources::{ContainerKind, Layout, ResourceContainer, ResourceError, SlotBatch};
use paxalloc_roster::{
    build_roster, AccountHolders, Booking, ManualPassenger, NameOverrides, Passenger,
    PassengerDetails, Roster, RosterError, RosterInputs, RosterSettings,
};
use paxalloc_shared::{AllocationEvent, AllocationSpace, ContainerId, PassengerId, SlotId, SlotRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Externally fetched roster inputs that are not part of operational data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSources {
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub passenger_details: PassengerDetails,
    #[serde(default)]
    pub account_holders: AccountHolders,
}

/// Pointer state of the editing dashboard. Selection and drag are mutually
/// exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Selected(PassengerId),
    Dragging(PassengerId),
}

/// One trip's editable allocation state.
///
/// Every method runs to completion on `&mut self`; hosts that receive
/// events concurrently must serialize calls (see the service actor).
pub struct AllocationSession {
    settings: RosterSettings,
    sources: RosterSources,
    manual_passengers: Vec<ManualPassenger>,
    name_overrides: NameOverrides,
    roster: Roster,
    seats: AssignmentStore,
    rooms: AssignmentStore,
    interaction: Interaction,
    pending_events: Vec<AllocationEvent>,
    sink: Option<Box<dyn SnapshotSink>>,
}

impl AllocationSession {
    /// Load operational data (already migrated) and derive the roster.
    /// Assignments of passengers missing from the roster are dropped.
    pub fn open(data: OperationalData, sources: RosterSources, settings: RosterSettings) -> Result<Self, SessionError> {
        let seats = AssignmentStore::load(AllocationSpace::Seats, data.vehicles)?;
        let rooms = AssignmentStore::load(AllocationSpace::Rooms, data.hotels)?;

        if let Some(clash) = seats
            .containers()
            .iter()
            .find(|c| rooms.contains_container(&c.id))
        {
            return Err(SessionError::ContainerIdClash(clash.id.to_string()));
        }

        let mut session = Self {
            settings,
            sources,
            manual_passengers: data.manual_passengers,
            name_overrides: data.name_overrides,
            roster: Roster::default(),
            seats,
            rooms,
            interaction: Interaction::Idle,
            pending_events: Vec::new(),
            sink: None,
        };
        session.refresh_roster();
        Ok(session)
    }

    /// Install the persistence callback invoked after each mutation
    pub fn with_sink<S>(mut self, sink: S) -> Self
    where
        S: SnapshotSink + 'static,
    {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn sources(&self) -> &RosterSources {
        &self.sources
    }

    pub fn store(&self, space: AllocationSpace) -> &AssignmentStore {
        match space {
            AllocationSpace::Seats => &self.seats,
            AllocationSpace::Rooms => &self.rooms,
        }
    }

    pub fn containers(&self, space: AllocationSpace) -> &[ResourceContainer] {
        self.store(space).containers()
    }

    pub fn assignments_snapshot(&self, space: AllocationSpace) -> BTreeMap<PassengerId, SlotRef> {
        self.store(space).assignments_snapshot()
    }

    pub fn is_occupied(&self, target: &SlotRef) -> Option<SlotOccupancy<'_>> {
        self.seats
            .is_occupied(&target.container_id, &target.slot_id)
            .or_else(|| self.rooms.is_occupied(&target.container_id, &target.slot_id))
    }

    /// Roster passengers holding no slot in `space`, in roster order
    pub fn unassigned(&self, space: AllocationSpace) -> Vec<&Passenger> {
        let store = self.store(space);
        self.roster
            .iter()
            .filter(|p| !store.is_assigned(&p.id))
            .collect()
    }

    /// Current state in its persisted shape
    pub fn operational_data(&self) -> OperationalData {
        OperationalData {
            schema_version: CURRENT_SCHEMA_VERSION,
            vehicles: self.seats.containers().to_vec(),
            hotels: self.rooms.containers().to_vec(),
            manual_passengers: self.manual_passengers.clone(),
            name_overrides: self.name_overrides.clone(),
        }
    }

    pub fn manifest(&self, trip: &TripInfo) -> ManifestData {
        build_manifest(
            trip,
            &self.roster,
            &self.seats,
            &self.rooms,
            &self.sources.passenger_details,
            &self.manual_passengers,
        )
    }

    /// Events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<AllocationEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // Selection and drag

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn selected_passenger(&self) -> Option<&PassengerId> {
        match &self.interaction {
            Interaction::Selected(id) => Some(id),
            _ => None,
        }
    }

    pub fn select_passenger(&mut self, passenger_id: &PassengerId) -> Result<(), SessionError> {
        self.roster.require(passenger_id)?;
        self.interaction = Interaction::Selected(passenger_id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if matches!(self.interaction, Interaction::Selected(_)) {
            self.interaction = Interaction::Idle;
        }
    }

    /// Click-to-place: assign the selected passenger. The selection survives
    /// a rejected placement so another slot can be tried.
    pub fn place_selected(&mut self, target: &SlotRef) -> Result<AssignOutcome, SessionError> {
        let passenger_id = self
            .selected_passenger()
            .cloned()
            .ok_or(SessionError::NoSelection)?;
        let outcome = self.attempt_assign(&passenger_id, target)?;
        self.interaction = Interaction::Idle;
        Ok(outcome)
    }

    pub fn begin_drag(&mut self, passenger_id: &PassengerId) -> Result<(), SessionError> {
        self.roster.require(passenger_id)?;
        self.interaction = Interaction::Dragging(passenger_id.clone());
        Ok(())
    }

    /// Finish a drag over a slot. The drag ends whether or not the drop is
    /// accepted.
    pub fn drop_on(&mut self, target: &SlotRef) -> Result<AssignOutcome, SessionError> {
        let passenger_id = match std::mem::take(&mut self.interaction) {
            Interaction::Dragging(id) => id,
            other => {
                self.interaction = other;
                return Err(SessionError::NoDragInProgress);
            }
        };
        self.attempt_assign(&passenger_id, target)
    }

    pub fn cancel_drag(&mut self) {
        if matches!(self.interaction, Interaction::Dragging(_)) {
            self.interaction = Interaction::Idle;
        }
    }

    // Assignment

    /// Assign a roster passenger to a slot in any container. Moving an
    /// already placed passenger relocates them within the same space.
    pub fn attempt_assign(&mut self, passenger_id: &PassengerId, target: &SlotRef) -> Result<AssignOutcome, SessionError> {
        self.roster.require(passenger_id)?;
        let store = self.store_for_mut(&target.container_id)?;

        let outcome = match store.assign(passenger_id, &target.container_id, &target.slot_id) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!("Rejected placing {} in {}: {}", passenger_id, target, err);
                return Err(err.into());
            }
        };

        let event = match &outcome {
            AssignOutcome::Placed { to } => AllocationEvent::PassengerAssigned {
                passenger_id: passenger_id.clone(),
                target: to.clone(),
            },
            AssignOutcome::Moved { from, to } => AllocationEvent::PassengerMoved {
                passenger_id: passenger_id.clone(),
                from: from.clone(),
                to: to.clone(),
            },
            AssignOutcome::Unchanged => return Ok(AssignOutcome::Unchanged),
        };
        self.emit(event);
        self.persist();
        Ok(outcome)
    }

    /// Free a specific slot held by a passenger. Returns false if the
    /// passenger was not in that slot.
    pub fn remove_from_slot(
        &mut self,
        container_id: &ContainerId,
        slot_id: &SlotId,
        passenger_id: &PassengerId,
    ) -> Result<bool, SessionError> {
        let target = SlotRef {
            container_id: container_id.clone(),
            slot_id: slot_id.clone(),
        };
        let removed = self
            .store_for_mut(container_id)?
            .unassign_from(&target, passenger_id)?;

        if removed {
            self.emit(AllocationEvent::PassengerUnassigned {
                passenger_id: passenger_id.clone(),
                from: target,
            });
            self.persist();
        }
        Ok(removed)
    }

    /// Release the passenger's slot in `space`, if any
    pub fn unassign(&mut self, space: AllocationSpace, passenger_id: &PassengerId) -> Option<SlotRef> {
        let store = match space {
            AllocationSpace::Seats => &mut self.seats,
            AllocationSpace::Rooms => &mut self.rooms,
        };
        let previous = store.unassign(passenger_id)?;
        self.emit(AllocationEvent::PassengerUnassigned {
            passenger_id: passenger_id.clone(),
            from: previous.clone(),
        });
        self.persist();
        Some(previous)
    }

    pub fn auto_fill(&mut self, container_id: &ContainerId) -> Result<AutoFillReport, SessionError> {
        let store = if self.seats.contains_container(container_id) {
            &mut self.seats
        } else if self.rooms.contains_container(container_id) {
            &mut self.rooms
        } else {
            return Err(AssignmentError::ContainerNotFound(container_id.to_string()).into());
        };

        let report = store.auto_fill(container_id, &self.roster)?;
        self.emit(AllocationEvent::AutoFillCompleted {
            container_id: container_id.clone(),
            assigned_count: report.assigned_count,
        });
        if report.assigned_count > 0 {
            self.persist();
        }
        Ok(report)
    }

    // Containers

    pub fn add_container(&mut self, kind: ContainerKind, name: &str, layout: &Layout) -> Result<ContainerId, SessionError> {
        let container = ResourceContainer::create(kind, name, layout)?;
        self.insert_container(container)
    }

    /// Add a container built elsewhere (e.g. imported), keeping its id
    pub fn insert_container(&mut self, container: ResourceContainer) -> Result<ContainerId, SessionError> {
        let id = container.id.clone();
        let space = container.space();
        if self.seats.contains_container(&id) || self.rooms.contains_container(&id) {
            return Err(AssignmentError::DuplicateContainer(id.to_string()).into());
        }

        match space {
            AllocationSpace::Seats => self.seats.add_container(container)?,
            AllocationSpace::Rooms => self.rooms.add_container(container)?,
        }
        // an imported container may carry occupants outside the roster
        let roster = &self.roster;
        match space {
            AllocationSpace::Seats => self.seats.retain_passengers(|p| roster.contains(p)),
            AllocationSpace::Rooms => self.rooms.retain_passengers(|p| roster.contains(p)),
        };

        self.emit(AllocationEvent::ContainerAdded {
            container_id: id.clone(),
            space,
        });
        self.persist();
        Ok(id)
    }

    pub fn rename_container(&mut self, container_id: &ContainerId, name: &str) -> Result<(), SessionError> {
        self.store_for_mut(container_id)?
            .rename_container(container_id, name)?;
        self.emit(AllocationEvent::ContainerUpdated {
            container_id: container_id.clone(),
        });
        self.persist();
        Ok(())
    }

    /// Remove a container; everyone it held becomes unassigned
    pub fn remove_container(&mut self, container_id: &ContainerId) -> Result<Vec<PassengerId>, SessionError> {
        let released = self
            .store_for_mut(container_id)?
            .remove_container(container_id)?;
        self.emit(AllocationEvent::ContainerRemoved {
            container_id: container_id.clone(),
            released: released.clone(),
        });
        self.persist();
        Ok(released)
    }

    pub fn add_slots(&mut self, container_id: &ContainerId, batch: &SlotBatch) -> Result<Vec<SlotId>, SessionError> {
        let added = self
            .store_for_mut(container_id)?
            .add_slots(container_id, batch)?;
        self.emit(AllocationEvent::ContainerUpdated {
            container_id: container_id.clone(),
        });
        self.persist();
        Ok(added)
    }

    pub fn remove_slot(&mut self, container_id: &ContainerId, slot_id: &SlotId) -> Result<Vec<PassengerId>, SessionError> {
        let released = self
            .store_for_mut(container_id)?
            .remove_slot(container_id, slot_id)?;
        for passenger_id in &released {
            self.emit(AllocationEvent::PassengerUnassigned {
                passenger_id: passenger_id.clone(),
                from: SlotRef {
                    container_id: container_id.clone(),
                    slot_id: slot_id.clone(),
                },
            });
        }
        self.emit(AllocationEvent::ContainerUpdated {
            container_id: container_id.clone(),
        });
        self.persist();
        Ok(released)
    }

    // Roster inputs

    pub fn add_manual_passenger(&mut self, name: &str, document: Option<String>) -> PassengerId {
        let manual = ManualPassenger::new(name.trim(), document);
        let id = manual.id.clone();
        self.manual_passengers.push(manual);
        self.refresh_roster();
        self.persist();
        id
    }

    /// Delete a manual passenger along with their seat and room
    pub fn remove_manual_passenger(&mut self, passenger_id: &PassengerId) -> bool {
        let before = self.manual_passengers.len();
        self.manual_passengers.retain(|m| &m.id != passenger_id);
        if self.manual_passengers.len() == before {
            return false;
        }
        self.refresh_roster();
        self.persist();
        true
    }

    /// Set or clear (with `None` or a blank name) a display-name override
    pub fn set_name_override(&mut self, passenger_id: &PassengerId, name: Option<&str>) -> Result<(), SessionError> {
        self.roster.require(passenger_id)?;
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => {
                self.name_overrides.insert(passenger_id.clone(), name.to_string());
            }
            None => {
                self.name_overrides.remove(passenger_id);
            }
        }
        self.refresh_roster();
        self.persist();
        Ok(())
    }

    /// Swap in freshly fetched bookings/details and rebuild the roster
    pub fn replace_sources(&mut self, sources: RosterSources) {
        self.sources = sources;
        self.refresh_roster();
        self.persist();
    }

    fn refresh_roster(&mut self) {
        let roster = build_roster(
            RosterInputs {
                bookings: &self.sources.bookings,
                manual_passengers: &self.manual_passengers,
                overrides: &self.name_overrides,
                details: &self.sources.passenger_details,
                account_holders: &self.sources.account_holders,
            },
            &self.settings,
        );

        let dropped = self.seats.retain_passengers(|id| roster.contains(id)).len()
            + self.rooms.retain_passengers(|id| roster.contains(id)).len();

        let stale = match &self.interaction {
            Interaction::Selected(id) | Interaction::Dragging(id) => !roster.contains(id),
            Interaction::Idle => false,
        };
        if stale {
            self.interaction = Interaction::Idle;
        }

        self.emit(AllocationEvent::RosterRebuilt {
            passenger_count: roster.len(),
            dropped_assignments: dropped,
        });
        self.roster = roster;
    }

    fn store_for_mut(&mut self, container_id: &ContainerId) -> Result<&mut AssignmentStore, SessionError> {
        if self.seats.contains_container(container_id) {
            Ok(&mut self.seats)
        } else if self.rooms.contains_container(container_id) {
            Ok(&mut self.rooms)
        } else {
            Err(AssignmentError::ContainerNotFound(container_id.to_string()).into())
        }
    }

    fn emit(&mut self, event: AllocationEvent) {
        tracing::debug!("Allocation event {}", event.name());
        self.pending_events.push(event);
    }

    fn persist(&mut self) {
        if self.sink.is_none() {
            return;
        }
        let snapshot = self.operational_data();
        if let Some(sink) = self.sink.as_mut() {
            sink.save(&snapshot);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("No passenger selected")]
    NoSelection,

    #[error("No drag in progress")]
    NoDragInProgress,

    #[error("Container id used by both vehicles and hotels: {0}")]
    ContainerIdClash(String),
}

impl SessionError {
    /// True for rejections the dashboard shows as a transient warning
    pub fn is_user_warning(&self) -> bool {
        matches!(
            self,
            SessionError::Assignment(
                AssignmentError::SlotFull { .. }
                    | AssignmentError::SlotNotFound { .. }
                    | AssignmentError::ContainerNotFound(_)
            ) | SessionError::NoSelection
                | SessionError::NoDragInProgress
        )
    }
}
