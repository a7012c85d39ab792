//! Ground-transport filtering
//!
//! Bus and train services to and from the airport share the flight-number
//! namespace with real flights, occupying the 9000-9999 block. They are
//! excluded from passenger listings after fetch and before caching.

use crate::data::FlightRecord;

/// First flight number of the ground-transport block (inclusive)
pub const GROUND_TRANSPORT_MIN: u32 = 9000;

/// Last flight number of the ground-transport block (inclusive)
pub const GROUND_TRANSPORT_MAX: u32 = 9999;

/// Returns true iff the flight number falls in the ground-transport block
///
/// Numbers of 10000 and above are ordinary flights again.
pub fn is_ground_transport(flight_number: u32) -> bool {
    (GROUND_TRANSPORT_MIN..=GROUND_TRANSPORT_MAX).contains(&flight_number)
}

/// Drops ground-transport services from a listing
///
/// All other records pass through unchanged, preserving order.
pub fn exclude_ground_transport(records: Vec<FlightRecord>) -> Vec<FlightRecord> {
    records
        .into_iter()
        .filter(|record| !is_ground_transport(record.flight_number))
        .collect()
}
