//! Schiphol public flight API client
//!
//! This module provides functionality to fetch paginated flight listings from
//! the Schiphol public flight API and parse them into our FlightRecord data
//! structures. The API authenticates with two static credential headers and
//! pages through results with a `page` query parameter; total page count is
//! unknown upfront, so pagination runs until a page comes back empty.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::{FlightBatch, FlightQuery, FlightRecord};
use crate::config::ApiCredentials;

/// Base URL for the Schiphol public flight API
const SCHIPHOL_BASE_URL: &str = "https://api.schiphol.nl/public-flights";

/// API resource version header value
const RESOURCE_VERSION: &str = "v4";

/// Default timeout applied to each page request
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur when fetching flight data
#[derive(Debug, Error)]
pub enum FlightsError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with a non-200 status
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Failed to parse JSON response
    #[error("failed to parse flight response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Client for fetching flight listings from the Schiphol public flight API
#[derive(Debug, Clone)]
pub struct SchipholClient {
    http_client: Client,
    credentials: ApiCredentials,
    base_url: String,
}

impl SchipholClient {
    /// Creates a new SchipholClient with the default request timeout
    pub fn new(credentials: ApiCredentials) -> Self {
        Self::with_timeout(credentials, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a new SchipholClient with a custom per-request timeout
    ///
    /// A timed-out page request surfaces as a per-page failure, exactly like
    /// any other transport error.
    pub fn with_timeout(credentials: ApiCredentials, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to build Schiphol HTTP client");

        Self {
            http_client,
            credentials,
            base_url: SCHIPHOL_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (testing or proxying)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches a single page of the listing identified by `query`
    ///
    /// # Returns
    /// * `Ok(Vec<FlightRecord>)` - the page's records; empty means end of data
    /// * `Err(FlightsError)` - if the request, status, or parsing fails
    pub async fn fetch_page(
        &self,
        query: &FlightQuery,
        page: u32,
    ) -> Result<Vec<FlightRecord>, FlightsError> {
        let url = format!("{}/flights", self.base_url);

        debug!(%url, page, "fetching flight page");

        let response = self
            .http_client
            .get(&url)
            .header("app_id", &self.credentials.app_id)
            .header("app_key", &self.credentials.app_key)
            .header("ResourceVersion", RESOURCE_VERSION)
            .header("Accept", "application/json")
            .query(&page_params(query, page))
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(FlightsError::Status { status, body });
        }

        let text = response.text().await?;
        let page_response: FlightsResponse = serde_json::from_str(&text)?;

        let fetched_at = Utc::now();
        Ok(page_response
            .flights
            .into_iter()
            .map(|flight| flight.into_record(fetched_at))
            .collect())
    }

    /// Fetches the full listing for `query`, page by page
    ///
    /// Issues sequential page requests until a page returns zero records. A
    /// failure after at least one successful page aborts pagination and
    /// returns the accumulated records marked partial; a failure before any
    /// records were accumulated is an error.
    pub async fn fetch_all(&self, query: &FlightQuery) -> Result<FlightBatch, FlightsError> {
        fetch_pages(|page| self.fetch_page(query, page)).await
    }
}

/// Builds the query parameters for one page request
///
/// Omitted query fields are omitted from the request; the upstream treats a
/// missing parameter as "no restriction". The page parameter is always sent.
fn page_params(query: &FlightQuery, page: u32) -> Vec<(&'static str, String)> {
    let mut params = Vec::with_capacity(4);
    if let Some(direction) = query.direction {
        params.push(("flightDirection", direction.as_code().to_string()));
    }
    if let Some(ref airline) = query.airline {
        params.push(("airline", airline.clone()));
    }
    if let Some(date) = query.schedule_date {
        params.push(("scheduleDate", date.to_string()));
    }
    params.push(("page", page.to_string()));
    params
}

/// Drives sequential page requests until the upstream reports an empty page
///
/// `pages_fetched` counts every request issued, including the terminal empty
/// page and a failed mid-pagination request.
async fn fetch_pages<F, Fut>(mut fetch_page: F) -> Result<FlightBatch, FlightsError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<FlightRecord>, FlightsError>>,
{
    let mut records: Vec<FlightRecord> = Vec::new();
    let mut pages_fetched = 0u32;
    let mut partial = false;

    loop {
        let result = fetch_page(pages_fetched).await;
        pages_fetched += 1;

        match result {
            Ok(page) if page.is_empty() => break,
            Ok(page) => records.extend(page),
            Err(err) if records.is_empty() => return Err(err),
            Err(err) => {
                warn!(page = pages_fetched - 1, error = %err, "page fetch failed; returning partial listing");
                partial = true;
                break;
            }
        }
    }

    Ok(FlightBatch {
        records,
        partial,
        pages_fetched,
    })
}

/// Schiphol API response structure for one page
#[derive(Debug, Deserialize)]
struct FlightsResponse {
    /// Missing on the page past the end of data
    #[serde(default)]
    flights: Vec<ApiFlight>,
}

/// A single flight as returned by the API
#[derive(Debug, Deserialize)]
struct ApiFlight {
    #[serde(rename = "flightNumber")]
    flight_number: u32,
    #[serde(rename = "flightName")]
    flight_name: String,
    #[serde(rename = "scheduleDateTime")]
    schedule_date_time: DateTime<Utc>,
    #[serde(rename = "estimatedLandingTime", default)]
    estimated_landing_time: Option<DateTime<Utc>>,
    #[serde(default)]
    gate: Option<String>,
    #[serde(default)]
    pier: Option<String>,
    #[serde(default)]
    route: Option<ApiRoute>,
    #[serde(rename = "publicFlightState", default)]
    public_flight_state: Option<ApiFlightState>,
}

/// Route information nested in a flight
#[derive(Debug, Deserialize)]
struct ApiRoute {
    #[serde(default)]
    destinations: Vec<String>,
}

/// Flight state list nested in a flight
#[derive(Debug, Deserialize)]
struct ApiFlightState {
    #[serde(rename = "flightStates", default)]
    flight_states: Vec<String>,
}

impl ApiFlight {
    /// Converts the API representation into our domain record
    fn into_record(self, fetched_at: DateTime<Utc>) -> FlightRecord {
        FlightRecord {
            flight_number: self.flight_number,
            flight_name: self.flight_name,
            schedule_date_time: self.schedule_date_time,
            estimated_date_time: self.estimated_landing_time,
            gate: self.gate,
            pier: self.pier,
            destinations: self.route.map(|r| r.destinations).unwrap_or_default(),
            flight_states: self
                .public_flight_state
                .map(|s| s.flight_states)
                .unwrap_or_default(),
            fetched_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    /// Sample page response in the upstream v4 shape
    const VALID_PAGE: &str = r#"{
        "flights": [
            {
                "lastUpdatedAt": "2026-08-05T11:58:04.000+02:00",
                "actualLandingTime": null,
                "estimatedLandingTime": "2026-08-05T14:41:00.000+02:00",
                "flightDirection": "A",
                "flightName": "KL1002",
                "flightNumber": 1002,
                "gate": "D07",
                "pier": "D",
                "publicFlightState": {
                    "flightStates": ["SCH", "GCH"]
                },
                "route": {
                    "destinations": ["LHR"],
                    "eu": "N"
                },
                "scheduleDateTime": "2026-08-05T14:25:00.000+02:00"
            },
            {
                "flightDirection": "A",
                "flightName": "KL9301",
                "flightNumber": 9301,
                "publicFlightState": {
                    "flightStates": ["SCH"]
                },
                "route": {
                    "destinations": ["BRU"]
                },
                "scheduleDateTime": "2026-08-05T15:00:00.000+02:00"
            }
        ]
    }"#;

    fn record(flight_number: u32) -> FlightRecord {
        FlightRecord {
            flight_number,
            flight_name: format!("KL{:04}", flight_number),
            schedule_date_time: Utc::now(),
            estimated_date_time: None,
            gate: None,
            pier: None,
            destinations: vec![],
            flight_states: vec!["SCH".to_string()],
            fetched_at: Utc::now(),
        }
    }

    fn page_of(count: u32) -> Vec<FlightRecord> {
        (0..count).map(|i| record(1000 + i)).collect()
    }

    #[test]
    fn test_parse_valid_page() {
        let response: FlightsResponse =
            serde_json::from_str(VALID_PAGE).expect("Failed to parse valid page");

        assert_eq!(response.flights.len(), 2);

        let fetched_at = Utc::now();
        let first = response
            .flights
            .into_iter()
            .next()
            .unwrap()
            .into_record(fetched_at);

        assert_eq!(first.flight_number, 1002);
        assert_eq!(first.flight_name, "KL1002");
        assert_eq!(first.gate.as_deref(), Some("D07"));
        assert_eq!(first.pier.as_deref(), Some("D"));
        assert_eq!(first.destinations, vec!["LHR".to_string()]);
        assert_eq!(
            first.flight_states,
            vec!["SCH".to_string(), "GCH".to_string()]
        );
        assert_eq!(first.fetched_at, fetched_at);

        // Upstream local time (+02:00) converts to UTC
        let expected = Utc.with_ymd_and_hms(2026, 8, 5, 12, 25, 0).unwrap();
        assert_eq!(first.schedule_date_time, expected);
        let expected_estimate = Utc.with_ymd_and_hms(2026, 8, 5, 12, 41, 0).unwrap();
        assert_eq!(first.estimated_date_time, Some(expected_estimate));
    }

    #[test]
    fn test_parse_flight_without_optional_fields() {
        let response: FlightsResponse =
            serde_json::from_str(VALID_PAGE).expect("Failed to parse valid page");

        let bus = response
            .flights
            .into_iter()
            .nth(1)
            .unwrap()
            .into_record(Utc::now());

        assert_eq!(bus.flight_number, 9301);
        assert!(bus.gate.is_none());
        assert!(bus.pier.is_none());
        assert!(bus.estimated_date_time.is_none());
        assert_eq!(bus.destinations, vec!["BRU".to_string()]);
    }

    #[test]
    fn test_parse_page_without_flights_key() {
        // The page past the end of data has no flights array at all
        let response: FlightsResponse =
            serde_json::from_str("{}").expect("Failed to parse empty page");
        assert!(response.flights.is_empty());
    }

    #[test]
    fn test_parse_malformed_json() {
        let result: Result<FlightsResponse, _> = serde_json::from_str("{ invalid json }");
        assert!(result.is_err());
    }

    #[test]
    fn test_page_params_full_query() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let query = FlightQuery::departures().with_airline("KL").on_date(date);

        let params = page_params(&query, 2);

        assert_eq!(
            params,
            vec![
                ("flightDirection", "D".to_string()),
                ("airline", "KL".to_string()),
                ("scheduleDate", "2026-08-05".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_page_params_unrestricted_query() {
        let params = page_params(&FlightQuery::default(), 0);
        assert_eq!(params, vec![("page", "0".to_string())]);
    }

    #[tokio::test]
    async fn test_fetch_pages_stops_at_first_empty_page() {
        let batch = fetch_pages(|page| {
            let result = match page {
                0 => Ok(page_of(3)),
                1 => Ok(page_of(2)),
                _ => Ok(vec![]),
            };
            async move { result }
        })
        .await
        .expect("pagination should succeed");

        assert_eq!(batch.records.len(), 5);
        assert_eq!(batch.pages_fetched, 3);
        assert!(!batch.partial);
    }

    #[tokio::test]
    async fn test_fetch_pages_immediately_empty() {
        let batch = fetch_pages(|_page| async { Ok(vec![]) })
            .await
            .expect("pagination should succeed");

        assert!(batch.records.is_empty());
        assert_eq!(batch.pages_fetched, 1);
        assert!(!batch.partial);
    }

    #[tokio::test]
    async fn test_fetch_pages_mid_failure_returns_partial() {
        let batch = fetch_pages(|page| {
            let result = match page {
                0 => Ok(page_of(3)),
                _ => Err(FlightsError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
            };
            async move { result }
        })
        .await
        .expect("partial results are not an error");

        assert_eq!(batch.records.len(), 3);
        assert_eq!(batch.pages_fetched, 2);
        assert!(batch.partial);
    }

    #[tokio::test]
    async fn test_fetch_pages_first_page_failure_is_an_error() {
        let result = fetch_pages(|_page| async {
            Err(FlightsError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        })
        .await;

        match result {
            Err(FlightsError::Status { status, .. }) => assert_eq!(status, 500),
            _ => panic!("Expected Status error"),
        }
    }

    #[test]
    fn test_client_base_url_override() {
        let client = SchipholClient::new(ApiCredentials::new("id", "key"))
            .with_base_url("http://localhost:9999");
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
