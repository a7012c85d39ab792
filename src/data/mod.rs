//! Core data models for flight information
//!
//! This module contains the data types used throughout the gateway for
//! representing flight listings, queries, and fetch outcomes.

pub mod flights;

pub use flights::{FlightsError, SchipholClient};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Direction of travel relative to the airport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightDirection {
    /// Flights leaving the airport
    Departure,
    /// Flights arriving at the airport
    Arrival,
}

impl FlightDirection {
    /// Single-letter code used by the upstream API (`D` / `A`)
    pub fn as_code(&self) -> &'static str {
        match self {
            FlightDirection::Departure => "D",
            FlightDirection::Arrival => "A",
        }
    }
}

/// Identifies one logical flight listing
///
/// All fields are optional; the upstream API treats a missing parameter as
/// "no restriction". Two queries with the same fields share one cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightQuery {
    /// Restrict to departures or arrivals
    pub direction: Option<FlightDirection>,
    /// Restrict to a single airline (IATA code, e.g. "KL")
    pub airline: Option<String>,
    /// Restrict to a single schedule date
    pub schedule_date: Option<NaiveDate>,
}

impl FlightQuery {
    /// Query for all departures
    pub fn departures() -> Self {
        Self {
            direction: Some(FlightDirection::Departure),
            ..Default::default()
        }
    }

    /// Query for all arrivals
    pub fn arrivals() -> Self {
        Self {
            direction: Some(FlightDirection::Arrival),
            ..Default::default()
        }
    }

    /// Restricts the query to one airline
    pub fn with_airline(mut self, airline: impl Into<String>) -> Self {
        self.airline = Some(airline.into());
        self
    }

    /// Restricts the query to one schedule date
    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.schedule_date = Some(date);
        self
    }

    /// Stable cache key identifying this logical query
    ///
    /// Distinct queries must map to distinct keys; the key doubles as the
    /// identifier reported by `stats()` and `refresh_status()`.
    pub fn cache_key(&self) -> String {
        format!(
            "flights_{}_{}_{}",
            self.direction.map(|d| d.as_code()).unwrap_or("all"),
            self.airline.as_deref().unwrap_or("all"),
            self.schedule_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "any".to_string()),
        )
    }
}

/// A single flight as served by the upstream API
///
/// Immutable once fetched; a refresh replaces the whole listing rather than
/// mutating records in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Numeric flight number (shared namespace with ground transport)
    pub flight_number: u32,
    /// Full flight name, e.g. "KL1001"
    pub flight_name: String,
    /// Scheduled time of the flight
    pub schedule_date_time: DateTime<Utc>,
    /// Estimated time, when the upstream has published one
    pub estimated_date_time: Option<DateTime<Utc>>,
    /// Assigned gate, if any
    pub gate: Option<String>,
    /// Assigned pier, if any
    pub pier: Option<String>,
    /// Destination airports (IATA codes), in routing order
    pub destinations: Vec<String>,
    /// Upstream state codes, e.g. "SCH", "GCH", "DEL"
    pub flight_states: Vec<String>,
    /// When this record was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of one (possibly multi-page) upstream fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FlightBatch {
    /// Accumulated flight records across all fetched pages
    pub records: Vec<FlightRecord>,
    /// True when pagination aborted mid-way and the records are incomplete
    pub partial: bool,
    /// Number of page requests issued, including the terminal empty page
    pub pages_fetched: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(flight_number: u32) -> FlightRecord {
        FlightRecord {
            flight_number,
            flight_name: format!("KL{:04}", flight_number),
            schedule_date_time: Utc::now(),
            estimated_date_time: None,
            gate: Some("D07".to_string()),
            pier: Some("D".to_string()),
            destinations: vec!["LHR".to_string()],
            flight_states: vec!["SCH".to_string()],
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_direction_codes() {
        assert_eq!(FlightDirection::Departure.as_code(), "D");
        assert_eq!(FlightDirection::Arrival.as_code(), "A");
    }

    #[test]
    fn test_cache_key_distinguishes_queries() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();

        let departures = FlightQuery::departures().on_date(date);
        let arrivals = FlightQuery::arrivals().on_date(date);
        let kl_departures = FlightQuery::departures().on_date(date).with_airline("KL");
        let undated = FlightQuery::departures();

        assert_ne!(departures.cache_key(), arrivals.cache_key());
        assert_ne!(departures.cache_key(), kl_departures.cache_key());
        assert_ne!(departures.cache_key(), undated.cache_key());
    }

    #[test]
    fn test_cache_key_is_stable() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let query = FlightQuery::departures().on_date(date).with_airline("KL");

        assert_eq!(query.cache_key(), query.clone().cache_key());
        assert_eq!(query.cache_key(), "flights_D_KL_2026-08-05");
    }

    #[test]
    fn test_cache_key_unrestricted_query() {
        let query = FlightQuery::default();
        assert_eq!(query.cache_key(), "flights_all_all_any");
    }

    #[test]
    fn test_flight_record_serialization_roundtrip() {
        let record = sample_record(1001);

        let json = serde_json::to_string(&record).expect("Failed to serialize FlightRecord");
        let deserialized: FlightRecord =
            serde_json::from_str(&json).expect("Failed to deserialize FlightRecord");

        assert_eq!(deserialized, record);
    }

    #[test]
    fn test_query_builders() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let query = FlightQuery::arrivals().with_airline("HV").on_date(date);

        assert_eq!(query.direction, Some(FlightDirection::Arrival));
        assert_eq!(query.airline.as_deref(), Some("HV"));
        assert_eq!(query.schedule_date, Some(date));
    }
}
