//! Google Calendar API client.
//!
//! This module provides a low-level HTTP client for the Calendar API v3,
//! handling request building, response parsing, and status-code → error
//! classification. One client is bound to one access token; the scheduler
//! constructs a fresh client per resolved user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client bound to one access token.
#[derive(Debug)]
pub struct CalendarApiClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl CalendarApiClient {
    /// Creates a new client with the given access token.
    pub fn new(access_token: impl Into<String>, timeout: std::time::Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            access_token: access_token.into(),
        }
    }

    /// Lists the user's calendars.
    pub async fn list_calendars(&self) -> EngineResult<Vec<ApiCalendarEntry>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_error)?;

        let list: CalendarListResponse = read_json(response).await?;
        Ok(list.items)
    }

    /// Lists events overlapping `[time_min, time_max]`, with recurring
    /// events expanded and results sorted by start time.
    ///
    /// The sort order is requested from the remote; downstream interval
    /// sweeps depend on it being honored. One-day windows are assumed to
    /// fit in a single page.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> EngineResult<Vec<ApiEvent>> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let list: EventListResponse = read_json(response).await?;
        debug!("fetched {} events from calendar {}", list.items.len(), calendar_id);
        Ok(list.items)
    }

    /// Inserts an event on the given calendar.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventWrite,
    ) -> EngineResult<ApiEvent> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(event)
            .send()
            .await
            .map_err(request_error)?;

        read_json(response).await
    }

    /// Applies a partial update to an existing event.
    pub async fn patch_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        patch: &EventWrite,
    ) -> EngineResult<ApiEvent> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http_client
            .patch(&url)
            .bearer_auth(&self.access_token)
            .json(patch)
            .send()
            .await
            .map_err(request_error)?;

        read_json(response).await
    }

    /// Deletes an event by id.
    ///
    /// Behavior for already-absent ids is whatever the remote reports;
    /// the engine does not paper over it.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> EngineResult<()> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(error_for_status(status, response).await)
    }
}

/// Maps a transport-level reqwest failure.
fn request_error(e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::network("request timeout")
    } else if e.is_connect() {
        EngineError::network(format!("connection failed: {}", e))
    } else {
        EngineError::network(format!("request failed: {}", e))
    }
}

/// Classifies a non-success response by status code.
async fn error_for_status(status: reqwest::StatusCode, response: reqwest::Response) -> EngineError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return EngineError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        ));
    }

    let body = response.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return EngineError::authentication("access token expired or invalid")
            .with_status(status.as_u16());
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        return EngineError::authorization("access denied to calendar")
            .with_status(status.as_u16());
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return EngineError::not_found(format!("resource not found: {}", body))
            .with_status(status.as_u16());
    }
    if status.is_client_error() {
        return EngineError::bad_request(format!("API rejected request ({}): {}", status, body))
            .with_status(status.as_u16());
    }

    EngineError::server(format!("API error ({}): {}", status, body)).with_status(status.as_u16())
}

/// Reads a success response as JSON, or classifies the failure.
async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> EngineResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_for_status(status, response).await);
    }

    let body = response
        .text()
        .await
        .map_err(|e| EngineError::network(format!("failed to read response: {}", e)))?;

    serde_json::from_str(&body)
        .map_err(|e| EngineError::invalid_response(format!("failed to parse response: {}", e)))
}

// --- Write payloads ---

/// An event body for insert and patch calls.
///
/// For a patch, only the populated fields are sent; the engine's reschedule
/// path sends start/end alone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventTimeWrite,
    pub end: EventTimeWrite,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<AttendeeWrite>>,
}

/// A zoned event boundary for write calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTimeWrite {
    pub date_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// An attendee for write calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeWrite {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

// --- Read payloads ---

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

/// A single event from the Calendar API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub html_link: Option<String>,
    pub status: Option<String>,
    pub start: Option<ApiEventTime>,
    pub end: Option<ApiEventTime>,
}

/// Event boundary from the API: either a concrete datetime or an all-day
/// date.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    pub date: Option<String>,
    pub date_time: Option<String>,
    pub time_zone: Option<String>,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<ApiCalendarEntry>,
}

/// A calendar from the calendar list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCalendarEntry {
    /// The calendar ID.
    #[serde(default)]
    pub id: String,
    /// The calendar summary (name).
    #[serde(default)]
    pub summary: String,
    /// Whether this is the primary calendar.
    #[serde(default)]
    pub primary: bool,
    /// The calendar timezone as reported by the remote (possibly a legacy
    /// name - normalized downstream).
    pub time_zone: Option<String>,
}
