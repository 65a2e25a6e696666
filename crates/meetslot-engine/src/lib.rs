//! The meetslot scheduling engine.
//!
//! This crate authorizes a user against Google Calendar with the OAuth 2.0
//! authorization-code flow (PKCE), persists the resulting refresh credential
//! encrypted at rest, and exposes timezone-correct per-user calendar
//! operations with bounded backoff around the rate-limited remote API.
//!
//! # Architecture
//!
//! ```text
//!                  ┌───────────────────┐
//!                  │     Scheduler     │  per-user operations
//!                  └──┬─────┬──────┬───┘
//!        resolve      │     │      │ validate, sweep
//!   ┌─────────────────▼┐ ┌──▼───────────────┐
//!   │ CredentialStore  │ │ CalendarApiClient │──► Google Calendar v3
//!   │  (SecretCipher)  │ │  (with_backoff)   │
//!   └──────────────────┘ └──────────────────┘
//!                  ▲
//!                  │ exchange_code / refresh
//!           ┌──────┴──────┐
//!           │ OAuthClient │──► Google OAuth endpoints
//!           └─────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use meetslot_engine::{EngineConfig, FreeSlotQuery, Scheduler};
//!
//! let config = EngineConfig::from_env()?;
//! let scheduler = Scheduler::new(&config)?;
//!
//! let slots = scheduler
//!     .find_free_slots("demo-user", FreeSlotQuery {
//!         date: "2025-06-02".into(),
//!         duration_mins: 30,
//!         time_zone: Some("Europe/London".into()),
//!     })
//!     .await?;
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod google;
pub mod retry;
pub mod scheduler;
pub mod store;

// Re-export main types at crate root
pub use config::{EngineConfig, OAuthCredentials};
pub use crypto::SecretCipher;
pub use error::{EngineError, EngineErrorCode, EngineResult};
pub use google::oauth::{AuthorizationState, OAuthClient, pkce};
pub use retry::{RetryPolicy, with_backoff};
pub use scheduler::{CreateEventRequest, FreeSlotQuery, RescheduleEventRequest, Scheduler};
pub use store::{CredentialStore, PreferenceStore};
