//! Per-user calendar operations.
//!
//! [`Scheduler`] is the engine facade: it resolves an authorized API client
//! per user (process-wide override first, then the encrypted store), runs
//! every remote call through the backoff wrapper, and keeps all interval
//! arithmetic zone-correct. Validation failures never reach the remote
//! mutation endpoints.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use meetslot_core::{
    Attendee, CalendarSummary, EventDescriptor, FreeSlot, WorkingHours, local_instant,
    normalize_zone, parse_date, parse_time_of_day, sweep_free_slots,
};

use crate::config::EngineConfig;
use crate::crypto::SecretCipher;
use crate::error::{EngineError, EngineResult};
use crate::google::client::{AttendeeWrite, CalendarApiClient, EventTimeWrite, EventWrite};
use crate::google::oauth::{AuthorizationState, OAuthClient};
use crate::retry::{RetryPolicy, with_backoff};
use crate::store::{CredentialStore, PreferenceStore};

/// Working-hours window applied when a user has no stored preference.
pub const DEFAULT_DAY_START: &str = "09:00";
pub const DEFAULT_DAY_END: &str = "17:00";

/// Input for [`Scheduler::create_event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    /// Event title.
    pub summary: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:mm`.
    pub start: String,
    /// `HH:mm`.
    pub end: String,
    /// IANA zone; defaults to the primary calendar's zone, then UTC.
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attendees: Option<Vec<Attendee>>,
}

/// Input for [`Scheduler::reschedule_event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleEventRequest {
    /// Id of the event to move.
    pub event_id: String,
    /// `YYYY-MM-DD`.
    pub new_date: String,
    /// `HH:mm`.
    pub new_start: String,
    /// `HH:mm`.
    pub new_end: String,
    /// IANA zone; defaults as in creation.
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Input for [`Scheduler::find_free_slots`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeSlotQuery {
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Requested slot length in minutes.
    pub duration_mins: i64,
    /// IANA zone; defaults as in creation.
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// The scheduling engine facade.
pub struct Scheduler {
    scopes: Vec<String>,
    refresh_token_override: Option<String>,
    timeout: std::time::Duration,
    retry: RetryPolicy,
    oauth: OAuthClient,
    credentials: CredentialStore,
    preferences: PreferenceStore,
}

impl Scheduler {
    /// Creates a scheduler from a validated configuration.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let cipher = SecretCipher::new(&config.encryption_key)?;
        let oauth = OAuthClient::new(config.credentials.clone(), config.timeout);

        Ok(Self {
            scopes: config.scopes.clone(),
            refresh_token_override: config.refresh_token_override.clone(),
            timeout: config.timeout,
            retry: config.retry.clone(),
            oauth,
            credentials: CredentialStore::new(config.credential_path(), cipher),
            preferences: PreferenceStore::new(config.preference_path()),
        })
    }

    // --- Authorization ---

    /// Starts an authorization attempt bound to the caller-supplied `state`.
    ///
    /// The returned [`AuthorizationState`] is single-use: hold it until the
    /// callback arrives, then pass it to
    /// [`complete_authorization`](Self::complete_authorization).
    pub fn authorization_request(&self, state: impl Into<String>) -> AuthorizationState {
        self.oauth.authorization_request(&self.scopes, state)
    }

    /// Handles the OAuth callback for a pending authorization.
    ///
    /// Requires the echoed `state` to match the pending attempt exactly,
    /// exchanges the code for a refresh token (failing if none is issued),
    /// and persists the token encrypted.
    pub async fn complete_authorization(
        &self,
        user_id: &str,
        pending: &AuthorizationState,
        code: &str,
        state: &str,
    ) -> EngineResult<()> {
        if state != pending.state {
            return Err(EngineError::authorization(
                "callback state does not match the pending authorization",
            ));
        }

        let refresh_token = self.oauth.exchange_code(code, &pending.code_verifier).await?;
        self.credentials.save(user_id, &refresh_token)?;
        info!(user_id, "refresh credential stored");
        Ok(())
    }

    /// Resolves an authorized API client for the user.
    ///
    /// Resolution order: the process-wide override token from configuration,
    /// else the credential store. Access-token renewal is handled here by
    /// trading the refresh token at the token endpoint; callers never see
    /// either token.
    async fn api_for(&self, user_id: &str) -> EngineResult<CalendarApiClient> {
        let refresh_token = self
            .refresh_token_override
            .clone()
            .or_else(|| self.credentials.get(user_id))
            .ok_or_else(|| {
                EngineError::not_authorized(format!(
                    "user {user_id} has not authorized calendar access"
                ))
            })?;

        let (access_token, _expires_in) = self.oauth.refresh_access_token(&refresh_token).await?;
        Ok(CalendarApiClient::new(access_token, self.timeout))
    }

    // --- Calendars ---

    /// Lists the user's calendars with normalized timezones.
    pub async fn list_calendars(&self, user_id: &str) -> EngineResult<Vec<CalendarSummary>> {
        let api = self.api_for(user_id).await?;
        self.list_calendars_with(&api).await
    }

    async fn list_calendars_with(
        &self,
        api: &CalendarApiClient,
    ) -> EngineResult<Vec<CalendarSummary>> {
        let entries = with_backoff(&self.retry, || api.list_calendars()).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| !entry.id.is_empty())
            .map(|entry| CalendarSummary {
                time_zone: entry
                    .time_zone
                    .as_deref()
                    .and_then(normalize_zone)
                    .map(|tz| tz.name().to_string()),
                id: entry.id,
                summary: entry.summary,
                primary: entry.primary,
            })
            .collect())
    }

    /// Returns the user's primary calendar: the entry flagged primary,
    /// falling back to the entry with id `"primary"`; `None` if neither
    /// exists.
    pub async fn primary_calendar(&self, user_id: &str) -> EngineResult<Option<CalendarSummary>> {
        let api = self.api_for(user_id).await?;
        self.primary_calendar_with(&api).await
    }

    async fn primary_calendar_with(
        &self,
        api: &CalendarApiClient,
    ) -> EngineResult<Option<CalendarSummary>> {
        let calendars = self.list_calendars_with(api).await?;
        Ok(calendars
            .iter()
            .find(|cal| cal.primary)
            .or_else(|| calendars.iter().find(|cal| cal.id == "primary"))
            .cloned())
    }

    async fn require_primary(&self, api: &CalendarApiClient) -> EngineResult<CalendarSummary> {
        self.primary_calendar_with(api)
            .await?
            .ok_or_else(|| EngineError::not_found("primary calendar not found"))
    }

    // --- Preferences ---

    /// Stores the user's working hours, overwriting any existing record.
    ///
    /// The zone is normalized (an unresolvable zone is dropped); everything
    /// else is stored verbatim, unvalidated.
    pub fn set_working_hours(&self, user_id: &str, hours: WorkingHours) -> EngineResult<()> {
        let time_zone = hours
            .time_zone
            .as_deref()
            .and_then(normalize_zone)
            .map(|tz| tz.name().to_string());
        self.preferences.set(
            user_id,
            WorkingHours { time_zone, ..hours },
        )
    }

    /// Returns the user's stored working hours, if any.
    pub fn working_hours(&self, user_id: &str) -> Option<WorkingHours> {
        self.preferences.get(user_id)
    }

    // --- Events ---

    /// Creates an event on the user's primary calendar.
    pub async fn create_event(
        &self,
        user_id: &str,
        request: CreateEventRequest,
    ) -> EngineResult<EventDescriptor> {
        let api = self.api_for(user_id).await?;
        let primary = self.require_primary(&api).await?;
        let tz = resolve_zone(request.time_zone.as_deref(), primary.time_zone.as_deref());

        let (start, end) = event_window(&request.date, &request.start, &request.end, tz)?;

        let body = EventWrite {
            summary: Some(request.summary),
            description: request.description,
            start: EventTimeWrite {
                date_time: start.to_rfc3339(),
                time_zone: Some(tz.name().to_string()),
            },
            end: EventTimeWrite {
                date_time: end.to_rfc3339(),
                time_zone: Some(tz.name().to_string()),
            },
            attendees: request.attendees.map(|attendees| {
                attendees
                    .into_iter()
                    .map(|attendee| AttendeeWrite {
                        email: attendee.email,
                        display_name: attendee.display_name,
                    })
                    .collect()
            }),
        };

        let created = with_backoff(&self.retry, || api.insert_event(&primary.id, &body)).await?;
        let descriptor = describe_event(created, tz)?;
        info!(user_id, event_id = %descriptor.id, "event created");
        Ok(descriptor)
    }

    /// Cancels an event by id on the user's primary calendar.
    ///
    /// Semantics for already-absent ids follow the remote API's own
    /// behavior.
    pub async fn cancel_event(&self, user_id: &str, event_id: &str) -> EngineResult<()> {
        let api = self.api_for(user_id).await?;
        let primary = self.require_primary(&api).await?;

        with_backoff(&self.retry, || api.delete_event(&primary.id, event_id)).await?;
        info!(user_id, event_id, "event cancelled");
        Ok(())
    }

    /// Moves an existing event to a new window; only start/end change.
    pub async fn reschedule_event(
        &self,
        user_id: &str,
        request: RescheduleEventRequest,
    ) -> EngineResult<EventDescriptor> {
        let api = self.api_for(user_id).await?;
        let primary = self.require_primary(&api).await?;
        let tz = resolve_zone(request.time_zone.as_deref(), primary.time_zone.as_deref());

        let (start, end) =
            event_window(&request.new_date, &request.new_start, &request.new_end, tz)?;

        let patch = EventWrite {
            summary: None,
            description: None,
            start: EventTimeWrite {
                date_time: start.to_rfc3339(),
                time_zone: Some(tz.name().to_string()),
            },
            end: EventTimeWrite {
                date_time: end.to_rfc3339(),
                time_zone: Some(tz.name().to_string()),
            },
            attendees: None,
        };

        let updated = with_backoff(&self.retry, || {
            api.patch_event(&primary.id, &request.event_id, &patch)
        })
        .await?;
        let descriptor = describe_event(updated, tz)?;
        info!(user_id, event_id = %descriptor.id, "event rescheduled");
        Ok(descriptor)
    }

    /// Computes free slots on a date within the user's working hours.
    ///
    /// Window resolution: the stored preference's start/end, defaulting to
    /// 09:00-17:00. Events without concrete start/end instants (all-day or
    /// open-ended) are ignored. The remote listing is requested sorted by
    /// start time, which the sweep relies on.
    pub async fn find_free_slots(
        &self,
        user_id: &str,
        query: FreeSlotQuery,
    ) -> EngineResult<Vec<FreeSlot>> {
        if query.duration_mins <= 0 {
            return Err(EngineError::validation("duration must be a positive number of minutes"));
        }

        let api = self.api_for(user_id).await?;
        let primary = self.require_primary(&api).await?;
        let tz = resolve_zone(query.time_zone.as_deref(), primary.time_zone.as_deref());

        let hours = self.preferences.get(user_id);
        let start_of_day = hours
            .as_ref()
            .map(|h| h.start.as_str())
            .unwrap_or(DEFAULT_DAY_START);
        let end_of_day = hours
            .as_ref()
            .map(|h| h.end.as_str())
            .unwrap_or(DEFAULT_DAY_END);

        let (day_start, day_end) = event_window_unordered(&query.date, start_of_day, end_of_day, tz)?;

        let events = with_backoff(&self.retry, || {
            api.list_events(
                &primary.id,
                day_start.with_timezone(&Utc),
                day_end.with_timezone(&Utc),
            )
        })
        .await?;

        let mut busy: Vec<(DateTime<Tz>, DateTime<Tz>)> = Vec::new();
        for event in events {
            let Some((start_raw, end_raw)) = concrete_window(&event) else {
                continue;
            };
            match (
                DateTime::parse_from_rfc3339(start_raw),
                DateTime::parse_from_rfc3339(end_raw),
            ) {
                (Ok(start), Ok(end)) => {
                    busy.push((start.with_timezone(&tz), end.with_timezone(&tz)));
                }
                _ => {
                    warn!(
                        event_id = event.id.as_deref().unwrap_or("<none>"),
                        "skipping event with unparseable instants"
                    );
                }
            }
        }
        debug!(
            user_id,
            busy = busy.len(),
            "sweeping {} - {} for {}-minute slots",
            day_start,
            day_end,
            query.duration_mins
        );

        let slots = sweep_free_slots(
            day_start,
            day_end,
            &busy,
            Duration::minutes(query.duration_mins),
        );

        Ok(slots
            .into_iter()
            .map(|(start, end)| FreeSlot {
                start: start.fixed_offset(),
                end: end.fixed_offset(),
                time_zone: tz.name().to_string(),
            })
            .collect())
    }
}

/// Effective-zone resolution: explicit > primary calendar's zone > UTC.
fn resolve_zone(explicit: Option<&str>, primary: Option<&str>) -> Tz {
    explicit
        .and_then(normalize_zone)
        .or_else(|| primary.and_then(normalize_zone))
        .unwrap_or(chrono_tz::UTC)
}

/// Builds the zoned `(start, end)` instants for a date and two times of
/// day, requiring `end > start` strictly.
fn event_window(
    date: &str,
    start: &str,
    end: &str,
    tz: Tz,
) -> EngineResult<(DateTime<Tz>, DateTime<Tz>)> {
    let (start_instant, end_instant) = event_window_unordered(date, start, end, tz)?;
    if end_instant <= start_instant {
        return Err(EngineError::validation(
            "event end must be strictly after its start",
        ));
    }
    Ok((start_instant, end_instant))
}

/// As [`event_window`], without the ordering requirement (working-hours
/// windows are stored unvalidated; an inverted window simply sweeps empty).
fn event_window_unordered(
    date: &str,
    start: &str,
    end: &str,
    tz: Tz,
) -> EngineResult<(DateTime<Tz>, DateTime<Tz>)> {
    let day = parse_date(date)
        .ok_or_else(|| EngineError::validation(format!("invalid date: {date:?}")))?;
    let start_tod = parse_time_of_day(start)
        .ok_or_else(|| EngineError::validation(format!("invalid start time: {start:?}")))?;
    let end_tod = parse_time_of_day(end)
        .ok_or_else(|| EngineError::validation(format!("invalid end time: {end:?}")))?;

    let start_instant = local_instant(day, start_tod, tz).ok_or_else(|| {
        EngineError::validation(format!("{date}T{start} does not exist in {}", tz.name()))
    })?;
    let end_instant = local_instant(day, end_tod, tz).ok_or_else(|| {
        EngineError::validation(format!("{date}T{end} does not exist in {}", tz.name()))
    })?;

    Ok((start_instant, end_instant))
}

/// The concrete start/end datetimes of a listed event, or `None` for
/// all-day and open-ended events.
fn concrete_window(event: &crate::google::client::ApiEvent) -> Option<(&str, &str)> {
    let start = event.start.as_ref()?.date_time.as_deref()?;
    let end = event.end.as_ref()?.date_time.as_deref()?;
    Some((start, end))
}

/// Validates a created/patched event response and renders it in the
/// resolved zone.
///
/// The echoed zone takes precedence over the request's when it normalizes;
/// missing `id` or concrete instants are an invalid response, never a
/// partially-built descriptor.
fn describe_event(
    event: crate::google::client::ApiEvent,
    fallback_tz: Tz,
) -> EngineResult<EventDescriptor> {
    let id = event
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| EngineError::invalid_response("event response is missing an id"))?;

    let (start_raw, end_raw) = match (
        event.start.as_ref().and_then(|t| t.date_time.as_deref()),
        event.end.as_ref().and_then(|t| t.date_time.as_deref()),
    ) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(EngineError::invalid_response(
                "event response is missing concrete start/end instants",
            ));
        }
    };

    let tz = event
        .start
        .as_ref()
        .and_then(|t| t.time_zone.as_deref())
        .and_then(normalize_zone)
        .unwrap_or(fallback_tz);

    let start = DateTime::parse_from_rfc3339(start_raw)
        .map_err(|e| EngineError::invalid_response(format!("unparseable event start: {}", e)))?
        .with_timezone(&tz);
    let end = DateTime::parse_from_rfc3339(end_raw)
        .map_err(|e| EngineError::invalid_response(format!("unparseable event end: {}", e)))?
        .with_timezone(&tz);

    Ok(EventDescriptor {
        id,
        html_link: event.html_link,
        start: start.fixed_offset(),
        end: end.fixed_offset(),
        time_zone: Some(tz.name().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineErrorCode;
    use crate::google::client::ApiEvent;

    fn api_event(json: &str) -> ApiEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn resolve_zone_prefers_explicit() {
        let tz = resolve_zone(Some("Europe/Paris"), Some("America/New_York"));
        assert_eq!(tz, chrono_tz::Europe::Paris);
    }

    #[test]
    fn resolve_zone_falls_back_to_primary_then_utc() {
        assert_eq!(
            resolve_zone(None, Some("America/New_York")),
            chrono_tz::America::New_York
        );
        assert_eq!(resolve_zone(Some("Bad/Zone"), None), chrono_tz::UTC);
        assert_eq!(resolve_zone(None, None), chrono_tz::UTC);
    }

    #[test]
    fn event_window_accepts_ordered_times() {
        let (start, end) =
            event_window("2025-06-02", "10:00", "11:30", chrono_tz::Europe::London).unwrap();
        assert!(end > start);
        assert_eq!((end - start).num_minutes(), 90);
    }

    #[test]
    fn event_window_rejects_end_not_after_start() {
        for (start, end) in [("11:00", "10:00"), ("10:00", "10:00")] {
            let err =
                event_window("2025-06-02", start, end, chrono_tz::UTC).unwrap_err();
            assert_eq!(err.code(), EngineErrorCode::Validation);
        }
    }

    #[test]
    fn event_window_rejects_unparseable_inputs() {
        let cases = [
            ("junk", "10:00", "11:00"),
            ("2025-06-02", "10am", "11:00"),
            ("2025-06-02", "10:00", "eleven"),
        ];
        for (date, start, end) in cases {
            let err = event_window(date, start, end, chrono_tz::UTC).unwrap_err();
            assert_eq!(err.code(), EngineErrorCode::Validation);
        }
    }

    #[test]
    fn event_window_rejects_nonexistent_local_time() {
        // Spring-forward gap in Europe/London.
        let err = event_window("2025-03-30", "01:30", "03:00", chrono_tz::Europe::London)
            .unwrap_err();
        assert_eq!(err.code(), EngineErrorCode::Validation);
    }

    #[test]
    fn describe_event_renders_in_echoed_zone() {
        let event = api_event(
            r#"{
                "id": "ev1",
                "htmlLink": "https://calendar.google.com/event?eid=ev1",
                "start": { "dateTime": "2025-06-02T09:00:00Z", "timeZone": "Europe/London" },
                "end": { "dateTime": "2025-06-02T10:00:00Z", "timeZone": "Europe/London" }
            }"#,
        );

        let descriptor = describe_event(event, chrono_tz::UTC).unwrap();
        assert_eq!(descriptor.id, "ev1");
        assert_eq!(descriptor.time_zone.as_deref(), Some("Europe/London"));
        // 09:00Z renders as 10:00 London (BST).
        assert_eq!(descriptor.start.to_rfc3339(), "2025-06-02T10:00:00+01:00");
        assert!(descriptor.html_link.is_some());
    }

    #[test]
    fn describe_event_falls_back_to_request_zone() {
        let event = api_event(
            r#"{
                "id": "ev2",
                "start": { "dateTime": "2025-06-02T09:00:00Z", "timeZone": "Legacy/Nonsense" },
                "end": { "dateTime": "2025-06-02T10:00:00Z" }
            }"#,
        );

        let descriptor = describe_event(event, chrono_tz::America::New_York).unwrap();
        assert_eq!(descriptor.time_zone.as_deref(), Some("America/New_York"));
    }

    #[test]
    fn describe_event_requires_id_and_instants() {
        let missing_id = api_event(
            r#"{
                "start": { "dateTime": "2025-06-02T09:00:00Z" },
                "end": { "dateTime": "2025-06-02T10:00:00Z" }
            }"#,
        );
        assert_eq!(
            describe_event(missing_id, chrono_tz::UTC).unwrap_err().code(),
            EngineErrorCode::InvalidResponse
        );

        let all_day = api_event(
            r#"{
                "id": "ev3",
                "start": { "date": "2025-06-02" },
                "end": { "date": "2025-06-03" }
            }"#,
        );
        assert_eq!(
            describe_event(all_day, chrono_tz::UTC).unwrap_err().code(),
            EngineErrorCode::InvalidResponse
        );
    }

    #[test]
    fn concrete_window_ignores_all_day_events() {
        let timed = api_event(
            r#"{
                "id": "ev",
                "start": { "dateTime": "2025-06-02T09:00:00Z" },
                "end": { "dateTime": "2025-06-02T10:00:00Z" }
            }"#,
        );
        assert!(concrete_window(&timed).is_some());

        let all_day = api_event(
            r#"{ "id": "ev", "start": { "date": "2025-06-02" }, "end": { "date": "2025-06-03" } }"#,
        );
        assert!(concrete_window(&all_day).is_none());

        let open_ended = api_event(
            r#"{ "id": "ev", "start": { "dateTime": "2025-06-02T09:00:00Z" } }"#,
        );
        assert!(concrete_window(&open_ended).is_none());
    }
}
