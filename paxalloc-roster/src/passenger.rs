use crate::booking::{AccountHolders, Booking, ManualPassenger, NameOverrides, PassengerDetails};
use crate::builder::RosterSettings;
use paxalloc_shared::PassengerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassengerSource {
    Booking,
    Manual,
}

/// Canonical roster record. Never mutated in place; a rebuild replaces it
/// with a new value carrying the same id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub id: PassengerId,
    /// Travel party key used by auto-fill
    pub group_id: String,
    pub display_name: String,
    pub is_primary: bool,
    pub source: PassengerSource,
    pub booking_id: Option<String>,
    /// Set when no real name could be resolved
    pub name_is_placeholder: bool,
}

/// A roster source before normalization
#[derive(Debug, Clone, Copy)]
pub enum RosterEntry<'a> {
    Booked { booking: &'a Booking, index: u32 },
    Manual(&'a ManualPassenger),
}

/// Lookup tables consulted while resolving names
pub(crate) struct NameSources<'a> {
    pub overrides: &'a NameOverrides,
    pub details: &'a PassengerDetails,
    pub account_holders: &'a AccountHolders,
    pub settings: &'a RosterSettings,
}

impl<'a> RosterEntry<'a> {
    pub fn passenger_id(&self) -> PassengerId {
        match self {
            RosterEntry::Booked { booking, index } => PassengerId::for_booking(&booking.id, *index),
            RosterEntry::Manual(manual) => manual.id.clone(),
        }
    }

    pub(crate) fn normalize(&self, sources: &NameSources<'_>) -> Passenger {
        let id = self.passenger_id();
        match self {
            RosterEntry::Booked { booking, index } => {
                let is_primary = *index == 0;
                let resolved = sources
                    .details
                    .get(&id)
                    .and_then(|d| d.name())
                    .map(str::to_string)
                    .or_else(|| non_blank(sources.overrides.get(&id)))
                    .or_else(|| {
                        if is_primary {
                            non_blank(sources.account_holders.get(&booking.client_id))
                        } else {
                            None
                        }
                    });

                let name_is_placeholder = resolved.is_none();
                let display_name = resolved.unwrap_or_else(|| {
                    if is_primary {
                        sources.settings.unnamed_placeholder.clone()
                    } else {
                        format!("{} {}", sources.settings.companion_prefix, index)
                    }
                });

                Passenger {
                    id,
                    group_id: booking.id.clone(),
                    display_name,
                    is_primary,
                    source: PassengerSource::Booking,
                    booking_id: Some(booking.id.clone()),
                    name_is_placeholder,
                }
            }
            RosterEntry::Manual(manual) => {
                let resolved = non_blank(sources.overrides.get(&id))
                    .or_else(|| non_blank(Some(&manual.name)));
                let name_is_placeholder = resolved.is_none();
                if name_is_placeholder {
                    tracing::warn!("Manual passenger {} has no name, keeping with placeholder", id);
                }

                Passenger {
                    group_id: id.to_string(),
                    display_name: resolved
                        .unwrap_or_else(|| sources.settings.unnamed_placeholder.clone()),
                    id,
                    is_primary: false,
                    source: PassengerSource::Manual,
                    booking_id: None,
                    name_is_placeholder,
                }
            }
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
