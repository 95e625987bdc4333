//! `/health` endpoint.

use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Rooms with at least one member.
    pub rooms: usize,
    /// Current WebSocket connection count.
    pub connections: usize,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// RFC 3339 time the response was produced.
    pub timestamp: String,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, rooms: usize, connections: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        rooms,
        connections,
        uptime_secs: start_time.elapsed().as_secs(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}
