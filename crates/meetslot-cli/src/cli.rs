//! Command-line interface definition.

use clap::{Parser, Subcommand};

/// meetslot - calendar scheduling from the terminal
#[derive(Debug, Parser)]
#[command(name = "meetslot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// User the operation applies to
    #[arg(long, short, env = "MEETSLOT_USER", default_value = "demo-user")]
    pub user: String,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the OAuth authorization flow and store the refresh credential
    Auth,

    /// List the user's calendars
    Calendars,

    /// Show the primary calendar
    Primary,

    /// Store working hours for the user
    WorkingHours {
        /// Day of week: "0".."6" (Sun..Sat) or a name (can be repeated)
        #[arg(long = "day", action = clap::ArgAction::Append)]
        days: Vec<String>,

        /// Start of the working day, HH:mm
        #[arg(long)]
        start: String,

        /// End of the working day, HH:mm
        #[arg(long)]
        end: String,

        /// IANA time zone, e.g. Europe/London
        #[arg(long)]
        time_zone: Option<String>,
    },

    /// Create an event on the primary calendar
    Create {
        /// Event title
        #[arg(long)]
        summary: String,

        /// Event date, YYYY-MM-DD
        #[arg(long)]
        date: String,

        /// Start time, HH:mm
        #[arg(long)]
        start: String,

        /// End time, HH:mm
        #[arg(long)]
        end: String,

        /// IANA time zone (defaults to the primary calendar's zone)
        #[arg(long)]
        time_zone: Option<String>,

        /// Event description
        #[arg(long)]
        description: Option<String>,

        /// Attendee email (can be repeated)
        #[arg(long = "attendee", action = clap::ArgAction::Append)]
        attendees: Vec<String>,
    },

    /// Cancel an event by id
    Cancel {
        /// Id of the event to cancel
        event_id: String,
    },

    /// Move an event to a new window
    Reschedule {
        /// Id of the event to move
        event_id: String,

        /// New date, YYYY-MM-DD
        #[arg(long)]
        date: String,

        /// New start time, HH:mm
        #[arg(long)]
        start: String,

        /// New end time, HH:mm
        #[arg(long)]
        end: String,

        /// IANA time zone (defaults to the primary calendar's zone)
        #[arg(long)]
        time_zone: Option<String>,
    },

    /// Find free slots on a date within working hours
    Slots {
        /// Date to search, YYYY-MM-DD
        #[arg(long)]
        date: String,

        /// Requested slot length in minutes
        #[arg(long, default_value_t = 30)]
        duration_mins: i64,

        /// IANA time zone (defaults to the primary calendar's zone)
        #[arg(long)]
        time_zone: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn slots_defaults_duration() {
        let cli = Cli::parse_from(["meetslot", "slots", "--date", "2025-06-02"]);
        match cli.command {
            Command::Slots { duration_mins, .. } => assert_eq!(duration_mins, 30),
            _ => panic!("expected slots command"),
        }
    }

    #[test]
    fn user_defaults_to_demo_user() {
        let cli = Cli::parse_from(["meetslot", "calendars"]);
        assert_eq!(cli.user, "demo-user");
    }
}
