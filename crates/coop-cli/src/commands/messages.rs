//! `coop messages`: page through the controller's message log.

use chrono::Local;
use tabled::Tabled;

use coop_core::{Controller, LoadOutcome, LogEntry};

use crate::cli::{GlobalOpts, MessagesArgs, MessagesCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct MessageRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn row(e: &LogEntry) -> MessageRow {
    MessageRow {
        time: e
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        message: e.message.clone(),
    }
}

pub async fn handle(
    controller: &Controller,
    args: MessagesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        MessagesCommand::List { earlier } => {
            let log = controller.message_log();
            log.load_initial().await?;
            for page in 0..earlier {
                if log.load_earlier().await? == LoadOutcome::NothingMore {
                    tracing::debug!(page, "reached the start of the log");
                    break;
                }
            }

            let window = log.window();
            let out = output::render_list(
                global.output,
                &window.entries,
                row,
                |e| format!("{}\t{}", e.timestamp.to_rfc3339(), e.message),
            );
            output::print_output(&out, global.quiet);
            controller.shutdown().await;
            Ok(())
        }
    }
}
