use chrono::NaiveDate;
use paxalloc_shared::{Masked, PassengerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Booking lifecycle as seen by the allocation engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// A paid booking covering one or more travelers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub trip_id: String,
    pub status: BookingStatus,
    /// Number of travelers; index 0 is the account holder
    pub passengers: i32,
    pub client_id: String,
}

impl Booking {
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// Persisted per-passenger record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerDetail {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub document: Option<Masked<String>>,
    #[serde(default)]
    pub phone: Option<Masked<String>>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl PassengerDetail {
    /// Stored name, ignoring blank entries
    pub fn name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Passenger entered by hand on the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualPassenger {
    pub id: PassengerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub document: Option<Masked<String>>,
}

impl ManualPassenger {
    pub fn new(name: impl Into<String>, document: Option<String>) -> Self {
        Self {
            id: PassengerId::new_manual(),
            name: name.into(),
            document: document.map(Masked::new),
        }
    }
}

pub type NameOverrides = BTreeMap<PassengerId, String>;
pub type PassengerDetails = HashMap<PassengerId, PassengerDetail>;
/// clientId -> account holder name
pub type AccountHolders = HashMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detail_name_is_ignored() {
        let detail = PassengerDetail {
            full_name: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(detail.name(), None);

        let detail = PassengerDetail {
            full_name: Some(" Maria Lopes ".to_string()),
            ..Default::default()
        };
        assert_eq!(detail.name(), Some("Maria Lopes"));
    }

    #[test]
    fn test_manual_passenger_without_name_deserializes() {
        let manual: ManualPassenger = serde_json::from_str(r#"{"id":"manual-7"}"#).unwrap();
        assert_eq!(manual.id.as_str(), "manual-7");
        assert!(manual.name.is_empty());
        assert!(manual.document.is_none());
    }

    #[test]
    fn test_booking_wire_shape() {
        let booking: Booking = serde_json::from_value(serde_json::json!({
            "id": "bk1",
            "tripId": "trip-9",
            "status": "CONFIRMED",
            "passengers": 3,
            "clientId": "c1"
        }))
        .unwrap();
        assert!(booking.is_confirmed());
        assert_eq!(booking.passengers, 3);
    }
}
