//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod door;
pub mod messages;
pub mod status;
pub mod watch;

use coop_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Resolved};
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    resolved: Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(&build(&resolved, global)?, &args, global).await,
        Command::Watch(args) => watch::handle(&build(&resolved, global)?, &args, global).await,
        Command::Open => door::open(resolved, global).await,
        Command::Close => door::close(resolved, global).await,
        Command::Schedule(args) => door::schedule(args, resolved, global).await,
        Command::Messages(args) => {
            messages::handle(&build(&resolved, global)?, args, global).await
        }
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Config {
            message: "command does not need a controller".into(),
        }),
    }
}

fn build(resolved: &Resolved, global: &GlobalOpts) -> Result<Controller, CliError> {
    let services = config::services(global, resolved)?;
    Ok(Controller::new(resolved.controller.clone(), services))
}
