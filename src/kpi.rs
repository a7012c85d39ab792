//! Simple KPIs over flight listings
//!
//! Pure helpers the dashboard computes over gateway results. State codes
//! follow the upstream public flight states ("SCH" scheduled, "GCH" gate
//! change, "DEL" delayed, and so on).

use crate::data::FlightRecord;

/// Upstream state code for a gate change
pub const GATE_CHANGE_STATE: &str = "GCH";

/// Counts records whose state list contains `code`
pub fn count_in_state(records: &[FlightRecord], code: &str) -> usize {
    records
        .iter()
        .filter(|record| record.flight_states.iter().any(|state| state == code))
        .count()
}

/// Counts flights currently flagged with a gate change
pub fn gate_change_count(records: &[FlightRecord]) -> usize {
    count_in_state(records, GATE_CHANGE_STATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(flight_number: u32, states: &[&str]) -> FlightRecord {
        FlightRecord {
            flight_number,
            flight_name: format!("KL{:04}", flight_number),
            schedule_date_time: Utc::now(),
            estimated_date_time: None,
            gate: None,
            pier: None,
            destinations: vec![],
            flight_states: states.iter().map(|s| s.to_string()).collect(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_gate_change_count() {
        let records = vec![
            record(1001, &["SCH"]),
            record(1002, &["SCH", "GCH"]),
            record(1003, &["GCH"]),
            record(1004, &[]),
        ];

        assert_eq!(gate_change_count(&records), 2);
    }

    #[test]
    fn test_count_in_state_matches_whole_codes_only() {
        let records = vec![record(1001, &["GCH"]), record(1002, &["GC"])];
        assert_eq!(count_in_state(&records, "GCH"), 1);
    }

    #[test]
    fn test_counts_on_empty_listing() {
        assert_eq!(gate_change_count(&[]), 0);
        assert_eq!(count_in_state(&[], "DEL"), 0);
    }
}
