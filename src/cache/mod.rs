//! In-memory cache for flight listings
//!
//! This module provides a cache store that keeps one entry per logical query
//! key with configurable TTL (time-to-live) values. It supports graceful
//! degradation by returning expired entries with an `is_expired` flag,
//! allowing the gateway to serve stale data when the upstream API is
//! unavailable.

mod store;

pub use store::{CacheStats, CacheStore, CachedFlights, ClearOutcome, KeyAge};
