use crate::booking::{AccountHolders, Booking, ManualPassenger, NameOverrides, PassengerDetails};
use crate::passenger::{NameSources, Passenger, RosterEntry};
use crate::RosterError;
use paxalloc_shared::PassengerId;
use serde::Deserialize;
use std::collections::HashMap;

/// Placeholder names used when nothing better is known
#[derive(Debug, Clone, Deserialize)]
pub struct RosterSettings {
    #[serde(default = "default_companion_prefix")]
    pub companion_prefix: String,
    #[serde(default = "default_unnamed_placeholder")]
    pub unnamed_placeholder: String,
}

fn default_companion_prefix() -> String { "Companion".to_string() }
fn default_unnamed_placeholder() -> String { "Unnamed passenger".to_string() }

impl Default for RosterSettings {
    fn default() -> Self {
        Self {
            companion_prefix: default_companion_prefix(),
            unnamed_placeholder: default_unnamed_placeholder(),
        }
    }
}

/// Everything the roster is derived from. All lookups are passed in so
/// `build_roster` stays a pure function of its inputs.
#[derive(Debug, Clone, Copy)]
pub struct RosterInputs<'a> {
    pub bookings: &'a [Booking],
    pub manual_passengers: &'a [ManualPassenger],
    pub overrides: &'a NameOverrides,
    pub details: &'a PassengerDetails,
    pub account_holders: &'a AccountHolders,
}

/// Flat, de-duplicated passenger list for one trip
#[derive(Debug, Clone, Default)]
pub struct Roster {
    passengers: Vec<Passenger>,
    index: HashMap<PassengerId, usize>,
}

impl Roster {
    pub fn passengers(&self) -> &[Passenger] {
        &self.passengers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Passenger> {
        self.passengers.iter()
    }

    pub fn get(&self, id: &PassengerId) -> Option<&Passenger> {
        self.index.get(id).map(|&i| &self.passengers[i])
    }

    /// Lookup that fails with a typed error for unknown ids
    pub fn require(&self, id: &PassengerId) -> Result<&Passenger, RosterError> {
        self.get(id)
            .ok_or_else(|| RosterError::UnknownPassenger(id.to_string()))
    }

    pub fn contains(&self, id: &PassengerId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.passengers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }

    fn push(&mut self, passenger: Passenger) -> bool {
        if self.index.contains_key(&passenger.id) {
            return false;
        }
        self.index.insert(passenger.id.clone(), self.passengers.len());
        self.passengers.push(passenger);
        true
    }
}

/// Merge confirmed bookings and manual entries into one roster.
///
/// Booking passengers come first, ordered by booking id then passenger
/// index, followed by manual entries in their stored order. Duplicate ids
/// keep the first occurrence.
pub fn build_roster(inputs: RosterInputs<'_>, settings: &RosterSettings) -> Roster {
    let sources = NameSources {
        overrides: inputs.overrides,
        details: inputs.details,
        account_holders: inputs.account_holders,
        settings,
    };

    let mut bookings: Vec<&Booking> = inputs
        .bookings
        .iter()
        .filter(|b| b.is_confirmed())
        .collect();
    bookings.sort_by(|a, b| a.id.cmp(&b.id));

    let mut entries = Vec::new();
    for booking in bookings {
        if booking.passengers <= 0 {
            tracing::warn!(
                "Skipping booking {} with {} passengers",
                booking.id,
                booking.passengers
            );
            continue;
        }
        for index in 0..booking.passengers as u32 {
            entries.push(RosterEntry::Booked { booking, index });
        }
    }
    entries.extend(inputs.manual_passengers.iter().map(RosterEntry::Manual));

    let mut roster = Roster::default();
    for entry in entries {
        let passenger = entry.normalize(&sources);
        let id = passenger.id.clone();
        if !roster.push(passenger) {
            tracing::warn!("Duplicate passenger id {} ignored", id);
        }
    }

    tracing::debug!("Built roster with {} passengers", roster.len());
    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{BookingStatus, PassengerDetail};
    use crate::passenger::PassengerSource;

    fn booking(id: &str, passengers: i32, status: BookingStatus) -> Booking {
        Booking {
            id: id.to_string(),
            trip_id: "trip-1".to_string(),
            status,
            passengers,
            client_id: format!("client-{}", id),
        }
    }

    struct Fixture {
        bookings: Vec<Booking>,
        manual: Vec<ManualPassenger>,
        overrides: NameOverrides,
        details: PassengerDetails,
        holders: AccountHolders,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                bookings: Vec::new(),
                manual: Vec::new(),
                overrides: NameOverrides::new(),
                details: PassengerDetails::new(),
                holders: AccountHolders::new(),
            }
        }

        fn build(&self) -> Roster {
            build_roster(
                RosterInputs {
                    bookings: &self.bookings,
                    manual_passengers: &self.manual,
                    overrides: &self.overrides,
                    details: &self.details,
                    account_holders: &self.holders,
                },
                &RosterSettings::default(),
            )
        }
    }

    #[test]
    fn test_booking_expands_to_travelers() {
        let mut fx = Fixture::new();
        fx.bookings.push(booking("bk1", 3, BookingStatus::Confirmed));
        fx.holders.insert("client-bk1".to_string(), "Ana Silva".to_string());

        let roster = fx.build();
        assert_eq!(roster.len(), 3);

        let ids: Vec<&str> = roster.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["bk1-0", "bk1-1", "bk1-2"]);

        let primary = &roster.passengers()[0];
        assert!(primary.is_primary);
        assert_eq!(primary.display_name, "Ana Silva");
        assert_eq!(primary.group_id, "bk1");
        assert_eq!(roster.passengers()[1].display_name, "Companion 1");
        assert!(roster.passengers()[1].name_is_placeholder);
    }

    #[test]
    fn test_only_confirmed_bookings_contribute() {
        let mut fx = Fixture::new();
        fx.bookings.push(booking("bk1", 2, BookingStatus::Pending));
        fx.bookings.push(booking("bk2", 1, BookingStatus::Cancelled));
        fx.bookings.push(booking("bk3", 1, BookingStatus::Confirmed));

        let roster = fx.build();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.passengers()[0].id.as_str(), "bk3-0");
    }

    #[test]
    fn test_name_resolution_order() {
        let mut fx = Fixture::new();
        fx.bookings.push(booking("bk1", 2, BookingStatus::Confirmed));
        fx.holders.insert("client-bk1".to_string(), "Holder".to_string());
        fx.overrides.insert(PassengerId::from("bk1-0"), "Override Zero".to_string());
        fx.overrides.insert(PassengerId::from("bk1-1"), "Override One".to_string());
        fx.details.insert(
            PassengerId::from("bk1-0"),
            PassengerDetail {
                full_name: Some("Detail Zero".to_string()),
                ..Default::default()
            },
        );

        let roster = fx.build();
        // stored detail beats override, override beats holder
        assert_eq!(roster.passengers()[0].display_name, "Detail Zero");
        assert_eq!(roster.passengers()[1].display_name, "Override One");
        assert!(!roster.passengers()[1].name_is_placeholder);
    }

    #[test]
    fn test_primary_without_holder_gets_placeholder() {
        let mut fx = Fixture::new();
        fx.bookings.push(booking("bk1", 1, BookingStatus::Confirmed));

        let roster = fx.build();
        assert_eq!(roster.passengers()[0].display_name, "Unnamed passenger");
        assert!(roster.passengers()[0].name_is_placeholder);
    }

    #[test]
    fn test_invalid_passenger_count_is_skipped() {
        let mut fx = Fixture::new();
        fx.bookings.push(booking("bk1", 0, BookingStatus::Confirmed));
        fx.bookings.push(booking("bk2", -2, BookingStatus::Confirmed));
        fx.bookings.push(booking("bk3", 1, BookingStatus::Confirmed));

        let roster = fx.build();
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_manual_passengers_follow_bookings_as_singletons() {
        let mut fx = Fixture::new();
        fx.manual.push(ManualPassenger {
            id: PassengerId::from("manual-b"),
            name: "Bruno".to_string(),
            document: None,
        });
        fx.manual.push(ManualPassenger {
            id: PassengerId::from("manual-a"),
            name: "".to_string(),
            document: None,
        });
        fx.bookings.push(booking("bk9", 1, BookingStatus::Confirmed));

        let roster = fx.build();
        let ids: Vec<&str> = roster.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["bk9-0", "manual-b", "manual-a"]);

        let unnamed = roster.get(&PassengerId::from("manual-a")).unwrap();
        assert_eq!(unnamed.source, PassengerSource::Manual);
        assert_eq!(unnamed.display_name, "Unnamed passenger");
        assert!(unnamed.name_is_placeholder);
        assert_eq!(unnamed.group_id, "manual-a");
        assert!(!unnamed.is_primary);
    }

    #[test]
    fn test_override_names_manual_passenger() {
        let mut fx = Fixture::new();
        fx.manual.push(ManualPassenger {
            id: PassengerId::from("manual-a"),
            name: "".to_string(),
            document: None,
        });
        fx.manual.push(ManualPassenger {
            id: PassengerId::from("manual-b"),
            name: "Bruno".to_string(),
            document: None,
        });
        fx.overrides.insert(PassengerId::from("manual-a"), "Carlos".to_string());
        fx.overrides.insert(PassengerId::from("manual-b"), "  ".to_string());

        let roster = fx.build();
        let carlos = roster.get(&PassengerId::from("manual-a")).unwrap();
        assert_eq!(carlos.display_name, "Carlos");
        assert!(!carlos.name_is_placeholder);
        // blank override falls back to the entry's own name
        assert_eq!(roster.get(&PassengerId::from("manual-b")).unwrap().display_name, "Bruno");
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let mut fx = Fixture::new();
        fx.bookings.push(booking("bk2", 2, BookingStatus::Confirmed));
        fx.bookings.push(booking("bk1", 2, BookingStatus::Confirmed));
        fx.manual.push(ManualPassenger::new("Carla", None));

        let first = fx.build();
        let second = fx.build();
        assert_eq!(first.passengers(), second.passengers());
        assert_eq!(first.passengers()[0].id.as_str(), "bk1-0");
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut fx = Fixture::new();
        fx.bookings.push(booking("bk1", 1, BookingStatus::Confirmed));
        fx.manual.push(ManualPassenger {
            id: PassengerId::from("bk1-0"),
            name: "Clash".to_string(),
            document: None,
        });

        let roster = fx.build();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.passengers()[0].source, PassengerSource::Booking);
    }

    #[test]
    fn test_require_unknown_passenger() {
        let roster = Fixture::new().build();
        assert!(roster.require(&PassengerId::from("ghost")).is_err());
    }
}
