use crate::operational::{OperationalData, CURRENT_SCHEMA_VERSION};
use paxalloc_resources::{ContainerKind, Layout, ResourceContainer, ResourceError, RoomBatch, RoomType, VehicleLayout};
use paxalloc_roster::{ManualPassenger, NameOverrides};
use paxalloc_shared::{ContainerId, PassengerId, SlotId};
use serde::Deserialize;
use std::collections::BTreeMap;

pub const LEGACY_VEHICLE_ID: &str = "legacy-vehicle";
pub const LEGACY_HOTEL_ID: &str = "legacy-hotel";

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Operational data must be a JSON object")]
    NotAnObject,

    #[error("Unsupported schema version: {0}")]
    UnsupportedVersion(u64),

    #[error("Malformed operational data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Legacy layout rejected: {0}")]
    Resource(#[from] ResourceError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyOperationalData {
    #[serde(default)]
    vehicle: Option<LegacyVehicle>,
    #[serde(default)]
    rooms: Vec<LegacyRoom>,
    #[serde(default)]
    hotel_name: Option<String>,
    #[serde(default)]
    manual_passengers: Vec<ManualPassenger>,
    #[serde(default)]
    name_overrides: NameOverrides,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyVehicle {
    #[serde(default = "default_vehicle_name")]
    name: String,
    total_seats: u32,
    #[serde(default = "default_columns")]
    columns: u32,
    /// seat number -> passenger id
    #[serde(default)]
    seats: BTreeMap<String, PassengerId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRoom {
    #[serde(rename = "type")]
    room_type: RoomType,
    #[serde(default)]
    capacity: Option<u32>,
    #[serde(default)]
    occupants: Vec<PassengerId>,
}

fn default_vehicle_name() -> String { "Vehicle".to_string() }
fn default_columns() -> u32 { 4 }

/// Bring any stored operational document up to the current schema.
///
/// Documents at the current version pass through unchanged. Older documents
/// (a single `vehicle` plus a flat `rooms` list) become one vehicle container
/// and one room-set container with stable ids.
pub fn migrate_legacy_operational_data(raw: serde_json::Value) -> Result<OperationalData, MigrationError> {
    let object = raw.as_object().ok_or(MigrationError::NotAnObject)?;

    match object.get("schemaVersion").and_then(|v| v.as_u64()) {
        Some(version) if version > CURRENT_SCHEMA_VERSION as u64 => {
            Err(MigrationError::UnsupportedVersion(version))
        }
        Some(version) if version == CURRENT_SCHEMA_VERSION as u64 => {
            Ok(serde_json::from_value(raw)?)
        }
        _ => {
            let legacy: LegacyOperationalData = serde_json::from_value(raw)?;
            Ok(upgrade(legacy))
        }
    }
}

/// Invalid legacy containers are skipped with a warning; the rest of the
/// document still migrates.
fn upgrade(legacy: LegacyOperationalData) -> OperationalData {
    let mut data = OperationalData::empty();
    data.manual_passengers = legacy.manual_passengers;
    data.name_overrides = legacy.name_overrides;

    if let Some(vehicle) = legacy.vehicle {
        match upgrade_vehicle(vehicle) {
            Ok(container) => data.vehicles.push(container),
            Err(e) => tracing::warn!("Dropping legacy vehicle: {}", e),
        }
    }

    let rooms: Vec<LegacyRoom> = legacy
        .rooms
        .into_iter()
        .filter(|room| match room_batch(room).bed_capacity() {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Dropping legacy {:?} room: {}", room.room_type, e);
                false
            }
        })
        .collect();
    if !rooms.is_empty() {
        let name = legacy
            .hotel_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Hotel");
        match upgrade_rooms(name, rooms) {
            Ok(container) => data.hotels.push(container),
            Err(e) => tracing::warn!("Dropping legacy rooms: {}", e),
        }
    }

    tracing::info!(
        "Migrated legacy operational data: {} vehicles, {} hotels",
        data.vehicles.len(),
        data.hotels.len()
    );
    data
}

fn room_batch(room: &LegacyRoom) -> RoomBatch {
    RoomBatch {
        room_type: room.room_type,
        count: 1,
        capacity: room.capacity,
    }
}

fn upgrade_vehicle(vehicle: LegacyVehicle) -> Result<ResourceContainer, MigrationError> {
    let mut container = ResourceContainer::create_with_id(
        ContainerId::from(LEGACY_VEHICLE_ID),
        ContainerKind::Vehicle,
        &vehicle.name,
        &Layout::Vehicle(VehicleLayout {
            total_slots: vehicle.total_seats,
            columns: vehicle.columns,
        }),
    )?;

    for (seat, passenger_id) in vehicle.seats {
        match container.slot_mut(&SlotId::from(seat.trim())) {
            Some(slot) if slot.occupants.is_empty() => slot.occupants.push(passenger_id),
            Some(_) => tracing::warn!("Legacy seat {} listed twice, dropping {}", seat, passenger_id),
            None => tracing::warn!("Legacy seat {} does not exist, dropping {}", seat, passenger_id),
        }
    }
    Ok(container)
}

fn upgrade_rooms(name: &str, rooms: Vec<LegacyRoom>) -> Result<ResourceContainer, MigrationError> {
    let batches: Vec<RoomBatch> = rooms.iter().map(room_batch).collect();

    let mut container = ResourceContainer::create_with_id(
        ContainerId::from(LEGACY_HOTEL_ID),
        ContainerKind::RoomSet,
        name,
        &Layout::Rooms { batches },
    )?;

    for (slot, room) in container.slots.iter_mut().zip(rooms) {
        slot.id = SlotId(format!("legacy-room-{}", slot.number));
        let mut occupants = room.occupants;
        if occupants.len() as u32 > slot.capacity {
            tracing::warn!(
                "Legacy room {} holds {} passengers over capacity {}, trimming",
                slot.number,
                occupants.len(),
                slot.capacity
            );
            occupants.truncate(slot.capacity as usize);
        }
        slot.occupants = occupants;
    }
    Ok(container)
}
