//! File-backed per-user record stores.
//!
//! Both stores follow the same discipline: a single JSON record file the
//! store owns exclusively, rewritten in full (read, patch in memory, write
//! via temp-file rename) on every mutation. This is intentionally simple
//! and is only safe for single-process, low-concurrency operator use;
//! concurrent writers can lose updates (last-write-wins on the whole file).

pub mod credentials;
pub mod prefs;

pub use credentials::CredentialStore;
pub use prefs::PreferenceStore;
