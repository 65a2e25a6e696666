//! Calendar operation commands.

use meetslot_core::{Attendee, EventDescriptor, FreeSlot, WorkingHours};
use meetslot_engine::{CreateEventRequest, FreeSlotQuery, RescheduleEventRequest, Scheduler};

use crate::error::CliResult;

/// Lists the user's calendars.
pub async fn calendars(scheduler: &Scheduler, user_id: &str) -> CliResult<()> {
    let calendars = scheduler.list_calendars(user_id).await?;
    if calendars.is_empty() {
        println!("No calendars found.");
        return Ok(());
    }

    println!("Your calendars:");
    for calendar in calendars {
        let mut parts = vec![if calendar.summary.is_empty() {
            calendar.id.clone()
        } else {
            calendar.summary.clone()
        }];
        if calendar.primary {
            parts.push("(primary)".to_string());
        }
        if let Some(ref tz) = calendar.time_zone {
            parts.push(format!("[{tz}]"));
        }
        println!("- {}", parts.join(" "));
    }
    Ok(())
}

/// Shows the primary calendar.
pub async fn primary(scheduler: &Scheduler, user_id: &str) -> CliResult<()> {
    match scheduler.primary_calendar(user_id).await? {
        Some(calendar) => {
            let tz = calendar
                .time_zone
                .map(|tz| format!(" [{tz}]"))
                .unwrap_or_default();
            println!("Primary calendar: {} ({}){}", calendar.summary, calendar.id, tz);
        }
        None => println!("Primary calendar not found."),
    }
    Ok(())
}

/// Stores working hours for the user.
pub fn working_hours(
    scheduler: &Scheduler,
    user_id: &str,
    days: Vec<String>,
    start: String,
    end: String,
    time_zone: Option<String>,
) -> CliResult<()> {
    let hours = WorkingHours {
        days,
        start,
        end,
        time_zone,
    };
    scheduler.set_working_hours(user_id, hours.clone())?;

    let tz = hours.time_zone.map(|tz| format!(" {tz}")).unwrap_or_default();
    println!(
        "Saved working hours: days={:?} {}-{}{}",
        hours.days, hours.start, hours.end, tz
    );
    Ok(())
}

/// Creates an event on the primary calendar.
#[allow(clippy::too_many_arguments)]
pub async fn create(
    scheduler: &Scheduler,
    user_id: &str,
    summary: String,
    date: String,
    start: String,
    end: String,
    time_zone: Option<String>,
    description: Option<String>,
    attendees: Vec<String>,
) -> CliResult<()> {
    let attendees = if attendees.is_empty() {
        None
    } else {
        Some(
            attendees
                .into_iter()
                .map(|email| Attendee {
                    email,
                    display_name: None,
                })
                .collect(),
        )
    };

    let event = scheduler
        .create_event(
            user_id,
            CreateEventRequest {
                summary,
                date,
                start,
                end,
                time_zone,
                description,
                attendees,
            },
        )
        .await?;

    print_event("Created", &event);
    Ok(())
}

/// Cancels an event by id.
pub async fn cancel(scheduler: &Scheduler, user_id: &str, event_id: String) -> CliResult<()> {
    scheduler.cancel_event(user_id, &event_id).await?;
    println!("Cancelled event {event_id}");
    Ok(())
}

/// Moves an event to a new window.
pub async fn reschedule(
    scheduler: &Scheduler,
    user_id: &str,
    event_id: String,
    date: String,
    start: String,
    end: String,
    time_zone: Option<String>,
) -> CliResult<()> {
    let event = scheduler
        .reschedule_event(
            user_id,
            RescheduleEventRequest {
                event_id,
                new_date: date,
                new_start: start,
                new_end: end,
                time_zone,
            },
        )
        .await?;

    print_event("Rescheduled", &event);
    Ok(())
}

/// Finds free slots on a date within working hours.
pub async fn slots(
    scheduler: &Scheduler,
    user_id: &str,
    date: String,
    duration_mins: i64,
    time_zone: Option<String>,
) -> CliResult<()> {
    let slots = scheduler
        .find_free_slots(
            user_id,
            FreeSlotQuery {
                date,
                duration_mins,
                time_zone,
            },
        )
        .await?;

    if slots.is_empty() {
        println!("No free slots found in your working hours.");
        return Ok(());
    }

    println!("Free slots:");
    for FreeSlot {
        start,
        end,
        time_zone,
    } in slots
    {
        println!("- {} to {} ({})", start.to_rfc3339(), end.to_rfc3339(), time_zone);
    }
    Ok(())
}

fn print_event(verb: &str, event: &EventDescriptor) {
    let tz = event
        .time_zone
        .as_ref()
        .map(|tz| format!(" ({tz})"))
        .unwrap_or_default();
    println!(
        "{verb} event {} from {} to {}{}",
        event.id,
        event.start.to_rfc3339(),
        event.end.to_rfc3339(),
        tz
    );
    if let Some(ref link) = event.html_link {
        println!("  {link}");
    }
}
