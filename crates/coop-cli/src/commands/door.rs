//! Door and schedule commands.

use coop_core::{Command, Controller, ScheduleTime};

use crate::cli::{GlobalOpts, ScheduleArgs, ScheduleCommand};
use crate::config::{self, Resolved};
use crate::error::CliError;

pub async fn open(resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    send(Command::Open, resolved, global, "Door opening").await
}

pub async fn close(resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    send(Command::Close, resolved, global, "Door closing").await
}

pub async fn schedule(
    args: ScheduleArgs,
    resolved: Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Parse before building anything so bad input never reaches the network.
    let (command, label) = match args.command {
        ScheduleCommand::Open { time } => {
            let time = parse_time(&time)?;
            (Command::SetOpenTime(time), format!("Auto-open set to {time}"))
        }
        ScheduleCommand::Close { time } => {
            let time = parse_time(&time)?;
            (Command::SetCloseTime(time), format!("Auto-close set to {time}"))
        }
    };
    send(command, resolved, global, &label).await
}

fn parse_time(input: &str) -> Result<ScheduleTime, CliError> {
    ScheduleTime::parse(input).map_err(|e| CliError::Validation {
        field: "time".into(),
        reason: match e {
            coop_core::CoreError::ValidationFailed { message } => message,
            other => other.to_string(),
        },
    })
}

async fn send(
    command: Command,
    resolved: Resolved,
    global: &GlobalOpts,
    done: &str,
) -> Result<(), CliError> {
    let services = config::services(global, &resolved)?;
    Controller::oneshot(resolved.controller, services, |controller| async move {
        controller.execute(command).await
    })
    .await?;

    if !global.quiet {
        eprintln!("✓ {done}");
    }
    Ok(())
}
