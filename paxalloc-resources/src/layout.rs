use crate::ResourceError;
use serde::{Deserialize, Serialize};

/// Room categories and their bed count
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomType {
    Double,
    Triple,
    Quad,
    /// Dormitory-style room, capacity given explicitly
    Collective,
}

impl RoomType {
    /// Fixed capacity, `None` for collective rooms
    pub fn default_capacity(self) -> Option<u32> {
        match self {
            RoomType::Double => Some(2),
            RoomType::Triple => Some(3),
            RoomType::Quad => Some(4),
            RoomType::Collective => None,
        }
    }
}

/// Seat grid of one vehicle. `columns` only matters to the seat-map renderer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLayout {
    pub total_slots: u32,
    pub columns: u32,
}

impl VehicleLayout {
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.total_slots == 0 {
            return Err(ResourceError::InvalidLayout("vehicle needs at least one seat".to_string()));
        }
        if self.columns == 0 {
            return Err(ResourceError::InvalidLayout("vehicle needs at least one column".to_string()));
        }
        Ok(())
    }
}

/// `count` rooms of the same type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomBatch {
    pub room_type: RoomType,
    pub count: u32,
    /// Required for collective rooms, ignored otherwise
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl RoomBatch {
    pub fn new(room_type: RoomType, count: u32) -> Self {
        Self { room_type, count, capacity: None }
    }

    pub fn collective(count: u32, capacity: u32) -> Self {
        Self {
            room_type: RoomType::Collective,
            count,
            capacity: Some(capacity),
        }
    }

    /// Beds per room in this batch
    pub fn bed_capacity(&self) -> Result<u32, ResourceError> {
        match self.room_type.default_capacity() {
            Some(capacity) => Ok(capacity),
            None => match self.capacity {
                Some(capacity) if capacity >= 2 => Ok(capacity),
                Some(capacity) => Err(ResourceError::InvalidLayout(format!(
                    "collective room capacity must be at least 2, got {}",
                    capacity
                ))),
                None => Err(ResourceError::InvalidLayout(
                    "collective room requires a capacity".to_string(),
                )),
            },
        }
    }

    pub fn validate(&self) -> Result<u32, ResourceError> {
        if self.count == 0 {
            return Err(ResourceError::InvalidLayout("room batch is empty".to_string()));
        }
        self.bed_capacity()
    }
}

/// Initial shape of a new container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Layout {
    Vehicle(VehicleLayout),
    Rooms { batches: Vec<RoomBatch> },
}

/// Slots appended to an existing container
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotBatch {
    Seats { count: u32 },
    Rooms(RoomBatch),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_capacities() {
        assert_eq!(RoomBatch::new(RoomType::Double, 1).bed_capacity().unwrap(), 2);
        assert_eq!(RoomBatch::new(RoomType::Triple, 1).bed_capacity().unwrap(), 3);
        assert_eq!(RoomBatch::new(RoomType::Quad, 1).bed_capacity().unwrap(), 4);
        assert_eq!(RoomBatch::collective(1, 8).bed_capacity().unwrap(), 8);
    }

    #[test]
    fn test_collective_capacity_is_required() {
        assert!(RoomBatch::new(RoomType::Collective, 1).bed_capacity().is_err());
        assert!(RoomBatch::collective(1, 1).bed_capacity().is_err());
    }

    #[test]
    fn test_layout_wire_shape() {
        let layout: Layout = serde_json::from_value(serde_json::json!({
            "kind": "ROOMS",
            "batches": [
                { "roomType": "TRIPLE", "count": 2 },
                { "roomType": "COLLECTIVE", "count": 1, "capacity": 6 }
            ]
        }))
        .unwrap();
        assert_eq!(
            layout,
            Layout::Rooms {
                batches: vec![RoomBatch::new(RoomType::Triple, 2), RoomBatch::collective(1, 6)],
            }
        );

        let batch: SlotBatch = serde_json::from_value(serde_json::json!({ "kind": "SEATS", "count": 4 })).unwrap();
        assert_eq!(batch, SlotBatch::Seats { count: 4 });
    }

    #[test]
    fn test_empty_layouts_rejected() {
        assert!(VehicleLayout { total_slots: 0, columns: 4 }.validate().is_err());
        assert!(VehicleLayout { total_slots: 10, columns: 0 }.validate().is_err());
        assert!(RoomBatch::new(RoomType::Double, 0).validate().is_err());
    }
}
