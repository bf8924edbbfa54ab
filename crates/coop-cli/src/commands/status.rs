//! `coop status`: one-shot device readout.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use coop_core::{ConnectionState, Controller, Provenance, Snapshot};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
pub struct IndicatorView {
    pub name: &'static str,
    pub on: bool,
}

/// Flattened view of a snapshot plus the connection it was observed on.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub door: String,
    pub current_time: String,
    pub indicators: Vec<IndicatorView>,
    pub source: Provenance,
    pub connection: ConnectionState,
    pub seq: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatusView {
    pub fn new(snap: &Snapshot, connection: ConnectionState) -> Self {
        Self {
            door: snap.state.door_status.to_string(),
            current_time: snap.state.current_time.clone(),
            indicators: snap
                .state
                .indicators
                .labeled()
                .map(|(name, on)| IndicatorView { name, on })
                .collect(),
            source: snap.provenance,
            connection,
            seq: snap.seq,
            updated_at: snap.updated_at,
        }
    }
}

pub fn detail(snap: &Snapshot, connection: ConnectionState, color: bool) -> String {
    let state = &snap.state;
    let mut out = String::new();
    let _ = writeln!(out, "Door:        {}", output::door_label(state.door_status, color));
    let _ = writeln!(out, "Time:        {}", state.current_time);
    for (name, on) in state.indicators.labeled() {
        let _ = writeln!(out, "  {} {name}", output::lamp(on, color));
    }
    let _ = write!(out, "Source:      {} (via {connection})", snap.provenance);
    out
}

pub fn plain(view: &StatusView) -> String {
    let lamps: String = view
        .indicators
        .iter()
        .map(|i| if i.on { '1' } else { '0' })
        .collect();
    format!("{}\t{}\t{lamps}\t{}", view.door, view.current_time, view.source)
}

pub async fn handle(
    controller: &Controller,
    args: &StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    controller.connect().await;
    let first = wait_for_data(controller, Duration::from_secs(args.wait)).await;
    let connection = *controller.connection_state().borrow();
    controller.shutdown().await;

    let snap = first.ok_or(CliError::NoUpdate { seconds: args.wait })?;
    let color = output::should_color(global.color);
    let view = StatusView::new(&snap, connection);
    let out = output::render_single(
        global.output,
        &view,
        |_| detail(&snap, connection, color),
        plain,
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// The first snapshot carrying data, or `None` if `wait` elapses first.
async fn wait_for_data(
    controller: &Controller,
    wait: Duration,
) -> Option<Arc<Snapshot>> {
    let mut stream = controller.subscribe_snapshot();
    let seen = async {
        let now = stream.latest();
        if now.has_data() {
            return Some(now);
        }
        while let Some(snap) = stream.changed().await {
            if snap.has_data() {
                return Some(snap);
            }
        }
        None
    };
    tokio::time::timeout(wait, seen).await.ok().flatten()
}
