//! Google Calendar integration.
//!
//! Two layers:
//!
//! - [`oauth`] - the OAuth 2.0 authorization-code flow with PKCE: consent
//!   URL construction, code exchange (which must yield a refresh token),
//!   and refresh-token → access-token grants.
//! - [`client`] - a typed HTTP client for the Calendar API v3: calendar
//!   listing, event listing over a time window, and event insert/patch/
//!   delete.
//!
//! # Authentication flow
//!
//! 1. The engine builds a consent URL embedding a PKCE challenge and an
//!    opaque anti-forgery state
//! 2. The user grants access in a browser; the authorization server
//!    redirects to the configured callback with a code and the state
//! 3. The callback handler checks the state and exchanges the code (with
//!    the held verifier) for tokens; consent is always forced so a refresh
//!    token is issued even on re-authorization
//! 4. The refresh token is persisted encrypted; operational calls trade it
//!    for short-lived access tokens as needed

pub mod client;
pub mod oauth;

pub use client::{ApiCalendarEntry, ApiEvent, CalendarApiClient, EventTimeWrite, EventWrite};
pub use oauth::{AuthorizationState, OAuthClient};
