//! meetslot CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use meetslot_cli::cli::{Cli, Command};
use meetslot_cli::commands;
use meetslot_cli::error::CliResult;
use meetslot_core::{TracingConfig, init_tracing};
use meetslot_engine::{EngineConfig, Scheduler};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    // Configuration is read from the environment exactly once, here.
    let config = EngineConfig::from_env()?;
    let scheduler = Scheduler::new(&config)?;
    let user = cli.user.as_str();

    match cli.command {
        Command::Auth => {
            commands::auth::run(&scheduler, &config.credentials.redirect_uri, user).await
        }
        Command::Calendars => commands::calendar::calendars(&scheduler, user).await,
        Command::Primary => commands::calendar::primary(&scheduler, user).await,
        Command::WorkingHours {
            days,
            start,
            end,
            time_zone,
        } => commands::calendar::working_hours(&scheduler, user, days, start, end, time_zone),
        Command::Create {
            summary,
            date,
            start,
            end,
            time_zone,
            description,
            attendees,
        } => {
            commands::calendar::create(
                &scheduler,
                user,
                summary,
                date,
                start,
                end,
                time_zone,
                description,
                attendees,
            )
            .await
        }
        Command::Cancel { event_id } => {
            commands::calendar::cancel(&scheduler, user, event_id).await
        }
        Command::Reschedule {
            event_id,
            date,
            start,
            end,
            time_zone,
        } => {
            commands::calendar::reschedule(&scheduler, user, event_id, date, start, end, time_zone)
                .await
        }
        Command::Slots {
            date,
            duration_mins,
            time_zone,
        } => commands::calendar::slots(&scheduler, user, date, duration_mins, time_zone).await,
    }
}
