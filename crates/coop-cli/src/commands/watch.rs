//! `coop watch`: print every snapshot change until interrupted.

use futures_util::StreamExt;
use owo_colors::OwoColorize;

use coop_core::{Controller, Snapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::commands::status::{self, StatusView};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    controller: &Controller,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    // Snapshots without data (before the first update) are skipped.
    let mut snapshots = controller
        .subscribe_snapshot()
        .into_stream()
        .filter(|snap| std::future::ready(snap.has_data()));
    controller.connect().await;

    let mut printed = 0usize;
    while args.count.is_none_or(|limit| printed < limit) {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break;
            }
            next = snapshots.next() => {
                let Some(snap) = next else { break };
                let connection = *controller.connection_state().borrow();
                let view = StatusView::new(&snap, connection);
                output::print_output(&line(global.output, &snap, &view, color), global.quiet);
                printed += 1;
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}

/// One update: a single row for tables, one document otherwise.
fn line(format: OutputFormat, snap: &Snapshot, view: &StatusView, color: bool) -> String {
    match format {
        OutputFormat::Table => {
            let lamps: String = snap
                .state
                .indicators
                .labeled()
                .map(|(_, on)| output::lamp(on, color))
                .collect();
            let source = if color {
                snap.provenance.dimmed().to_string()
            } else {
                snap.provenance.to_string()
            };
            format!(
                "{:>5}  {}  {:<7} {lamps}  {source}",
                snap.seq,
                snap.state.current_time,
                output::door_label(snap.state.door_status, color),
            )
        }
        OutputFormat::Json | OutputFormat::JsonCompact => {
            output::render_single(OutputFormat::JsonCompact, view, |_| String::new(), status::plain)
        }
        other => output::render_single(other, view, |_| String::new(), status::plain),
    }
}
