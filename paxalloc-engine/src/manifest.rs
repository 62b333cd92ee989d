use crate::store::AssignmentStore;
use chrono::NaiveDate;
use paxalloc_resources::ContainerKind;
use paxalloc_roster::{ManualPassenger, PassengerDetails, PassengerSource, Roster};
use paxalloc_shared::{ContainerId, PassengerId, SlotId, SlotRef};
use serde::{Deserialize, Serialize};

/// Trip header carried into the manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TripInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub departure_date: Option<NaiveDate>,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
}

/// Resolved placement of one passenger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSlot {
    pub container_id: ContainerId,
    pub container_name: String,
    pub slot_id: SlotId,
    pub slot_number: u32,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPassenger {
    pub id: PassengerId,
    pub display_name: String,
    pub is_primary: bool,
    pub source: PassengerSource,
    pub group_id: String,
    pub booking_id: Option<String>,
    pub document: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub seat: Option<ResolvedSlot>,
    pub room: Option<ResolvedSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    pub id: ContainerId,
    pub name: String,
    pub kind: ContainerKind,
    pub slot_count: usize,
    pub occupied: u32,
    pub capacity: u32,
    pub free: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestTotals {
    pub total_passengers: usize,
    pub assigned_seats: u32,
    pub free_seats: u32,
    pub assigned_beds: u32,
    pub free_beds: u32,
    pub passengers_without_seat: usize,
    pub passengers_without_room: usize,
}

/// Export-ready view of a trip. Carries data only; page layout belongs to
/// whatever renders it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestData {
    pub trip: TripInfo,
    pub passengers: Vec<ManifestPassenger>,
    pub containers: Vec<ContainerSummary>,
    pub totals: ManifestTotals,
}

pub fn build_manifest(
    trip: &TripInfo,
    roster: &Roster,
    seats: &AssignmentStore,
    rooms: &AssignmentStore,
    details: &PassengerDetails,
    manual_passengers: &[ManualPassenger],
) -> ManifestData {
    let mut totals = ManifestTotals {
        total_passengers: roster.len(),
        ..Default::default()
    };

    let passengers: Vec<ManifestPassenger> = roster
        .iter()
        .map(|passenger| {
            let detail = details.get(&passenger.id);
            let manual_document = manual_passengers
                .iter()
                .find(|m| m.id == passenger.id)
                .and_then(|m| m.document.as_ref());

            let seat = seats
                .placement(&passenger.id)
                .and_then(|at| resolve(seats, at, |name, _, slot_id| format!("{} — seat {}", name, slot_id)));
            let room = rooms
                .placement(&passenger.id)
                .and_then(|at| resolve(rooms, at, |name, number, _| format!("{} — room {}", name, number)));

            if seat.is_none() {
                totals.passengers_without_seat += 1;
            }
            if room.is_none() {
                totals.passengers_without_room += 1;
            }

            ManifestPassenger {
                id: passenger.id.clone(),
                display_name: passenger.display_name.clone(),
                is_primary: passenger.is_primary,
                source: passenger.source,
                group_id: passenger.group_id.clone(),
                booking_id: passenger.booking_id.clone(),
                document: detail
                    .and_then(|d| d.document.as_ref())
                    .or(manual_document)
                    .map(|doc| doc.expose().clone()),
                phone: detail
                    .and_then(|d| d.phone.as_ref())
                    .map(|phone| phone.expose().clone()),
                birth_date: detail.and_then(|d| d.birth_date),
                seat,
                room,
            }
        })
        .collect();

    let mut containers = Vec::new();
    for container in seats.containers().iter().chain(rooms.containers()) {
        let occupancy = container.occupancy();
        match container.kind {
            ContainerKind::Vehicle => {
                totals.assigned_seats += occupancy.occupied;
                totals.free_seats += occupancy.free();
            }
            ContainerKind::RoomSet => {
                totals.assigned_beds += occupancy.occupied;
                totals.free_beds += occupancy.free();
            }
        }
        containers.push(ContainerSummary {
            id: container.id.clone(),
            name: container.display_name.clone(),
            kind: container.kind,
            slot_count: container.slots.len(),
            occupied: occupancy.occupied,
            capacity: occupancy.capacity,
            free: occupancy.free(),
        });
    }

    ManifestData {
        trip: trip.clone(),
        passengers,
        containers,
        totals,
    }
}

fn resolve<F>(store: &AssignmentStore, at: &SlotRef, label: F) -> Option<ResolvedSlot>
where
    F: Fn(&str, u32, &SlotId) -> String,
{
    let container = store.container(&at.container_id)?;
    let slot = container.slot(&at.slot_id)?;
    Some(ResolvedSlot {
        container_id: container.id.clone(),
        container_name: container.display_name.clone(),
        slot_id: slot.id.clone(),
        slot_number: slot.number,
        label: label(&container.display_name, slot.number, &slot.id),
    })
}
