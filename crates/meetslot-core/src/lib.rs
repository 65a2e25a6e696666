//! Core types: events, working hours, zone-aware time, free-slot sweep

pub mod event;
pub mod slots;
pub mod time;
pub mod tracing;

pub use event::{Attendee, CalendarSummary, EventDescriptor, FreeSlot, WorkingHours};
pub use slots::sweep_free_slots;
pub use time::{local_instant, normalize_zone, parse_date, parse_time_of_day};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
