pub mod booking;
pub mod passenger;
pub mod builder;

pub use booking::{
    AccountHolders, Booking, BookingStatus, ManualPassenger, NameOverrides, PassengerDetail,
    PassengerDetails,
};
pub use builder::{build_roster, Roster, RosterInputs, RosterSettings};
pub use passenger::{Passenger, PassengerSource, RosterEntry};

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("Passenger not in roster: {0}")]
    UnknownPassenger(String),
}
