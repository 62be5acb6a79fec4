//! `hinotes simulate`: the full hub against headless windows.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::{block_on, layout_store};
use crate::cli::output;
use crate::config::{self, HinotesConfig};
use crate::error::HinotesError;
use crate::modules::board::state::RectOverrides;
use crate::modules::board::store::SaveStatus;
use crate::modules::board::{HubActor, HubOptions};
use crate::modules::bus::MessageBus;
use crate::modules::host::LayoutGateway;
use crate::modules::host::headless::{HeadlessHost, HeadlessOptions, HostCall, MemoryLayout};
use crate::modules::note_window::SessionOptions;

/// Arguments for `simulate`.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Extra notes to create on top of the layout.
    #[arg(long, short, default_value_t = 0)]
    pub notes: usize,

    /// How long to let the protocol run, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    pub duration_ms: u64,

    /// Windows never report ready, exercising the handshake retry.
    #[arg(long)]
    pub silent: bool,

    /// Output the report as JSON.
    #[arg(long, short)]
    pub json: bool,
}

/// What happened during a simulation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub notes: usize,
    pub open: usize,
    pub links: usize,
    pub spawn_calls: usize,
    pub close_calls: usize,
    pub layout_writes: usize,
    pub last_save: Option<SaveStatus>,
    /// Bus traffic by channel.
    pub events: BTreeMap<String, usize>,
}

/// Execute the `simulate` command.
///
/// # Errors
///
/// Returns an error if the runtime cannot start or the hub stops early.
pub fn execute(args: &SimulateArgs) -> Result<(), HinotesError> {
    let config = config::get_config();
    let report = block_on(async {
        // A missing or unreadable layout is not fatal; the hub seeds the sample.
        let document = match layout_store() {
            Ok(store) => store.load().await.unwrap_or_else(|err| {
                tracing::warn!(error = %err, "simulate: layout not readable");
                None
            }),
            Err(_) => None,
        };
        run_simulation(args, config, document).await
    })??;

    if args.json {
        output::print_highlighted_json(&serde_json::to_value(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Run the hub with headless windows for `args.duration_ms`.
///
/// Halfway through, the front-most open window is moved and its content
/// edited as a user would.
///
/// # Errors
///
/// Returns an error if communication with the hub fails.
pub async fn run_simulation(
    args: &SimulateArgs,
    config: &HinotesConfig,
    document: Option<String>,
) -> Result<SimulationReport, HinotesError> {
    let bus = MessageBus::default();
    let mut observer = bus.subscribe();

    let session = SessionOptions { respond_ready: !args.silent, ..SessionOptions::from_config(&config.sync) };
    let host = Arc::new(HeadlessHost::new(bus.clone(), HeadlessOptions { fail_spawn: false, session }));
    let layout = Arc::new(document.map_or_else(MemoryLayout::default, MemoryLayout::with_document));
    let options = HubOptions { open_on_start: true, ..HubOptions::from_config(config) };
    let hub = HubActor::spawn(options, host.clone(), layout.clone(), bus);

    for _ in 0..args.notes {
        hub.create_note(RectOverrides::default()).await?;
    }

    let half = Duration::from_millis(args.duration_ms / 2);
    tokio::time::sleep(half).await;

    let board = hub.board().await?;
    if let Some(note) = board.notes.values().filter(|n| n.is_open).max_by_key(|n| n.z) {
        tracing::info!(id = %note.id, "simulate: moving and editing the front note");
        let mut rect = note.rect;
        rect.x += 40.0;
        host.user_move(&note.id, rect);
        if let Some(session) = host.session(&note.id) {
            session.edit_content(format!("{}\n\nEdited during simulation.", note.content));
        }
    }

    tokio::time::sleep(half).await;
    let last_save = hub.flush().await?;
    let board = hub.board().await?;
    hub.shutdown().await?;

    let calls = host.calls();
    let mut events: BTreeMap<String, usize> = BTreeMap::new();
    for event in observer.drain() {
        *events.entry(event.channel().to_string()).or_default() += 1;
    }

    Ok(SimulationReport {
        notes: board.notes.len(),
        open: board.open_count(),
        links: board.links.len(),
        spawn_calls: calls.iter().filter(|c| matches!(c, HostCall::Spawn { .. })).count(),
        close_calls: calls.iter().filter(|c| matches!(c, HostCall::Close { .. })).count(),
        layout_writes: layout.writes(),
        last_save: Some(last_save),
        events,
    })
}

fn print_report(report: &SimulationReport) {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Metric")]
        metric: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let save = match &report.last_save {
        Some(SaveStatus::Saved { revision }) => format!("saved (revision {revision})").green().to_string(),
        Some(SaveStatus::Failed { error, .. }) => format!("failed: {error}").red().to_string(),
        None => "none".to_string(),
    };
    let summary = [
        ("Notes", report.notes.to_string()),
        ("Open windows", format!("{}/{}", report.open, report.notes)),
        ("Links", report.links.to_string()),
        ("Spawn calls", report.spawn_calls.to_string()),
        ("Close calls", report.close_calls.to_string()),
        ("Layout writes", report.layout_writes.to_string()),
        ("Last save", save),
    ]
    .into_iter()
    .map(|(metric, value)| Row { metric: metric.to_string(), value });

    let traffic = report
        .events
        .iter()
        .map(|(channel, count)| Row { metric: channel.clone(), value: count.to_string() });

    println!("{}", "Simulation".bold());
    println!("{}", Table::new(summary).with(Style::rounded()));
    println!("{}", "Bus traffic".bold());
    println!(
        "{}",
        Table::new(traffic)
            .with(Style::rounded())
            .with(Modify::new(Columns::last()).with(Alignment::right()))
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;

    fn args(notes: usize, duration_ms: u64, silent: bool) -> SimulateArgs {
        SimulateArgs { notes, duration_ms, silent, json: false }
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_opens_every_note() {
        let report = run_simulation(&args(1, 2000, false), &HinotesConfig::default(), None).await.unwrap();

        assert_eq!(report.notes, 7);
        assert_eq!(report.open, 7);
        assert_eq!(report.spawn_calls, 7);
        assert!(report.events.get(events::note::MOVED).is_some_and(|n| *n >= 1));
        assert_eq!(report.events.get(events::note::CONTENT_CHANGED), Some(&1));
        assert!(matches!(report.last_save, Some(SaveStatus::Saved { .. })));
        assert!(report.layout_writes >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_windows_are_retried_once() {
        let report = run_simulation(&args(0, 5000, true), &HinotesConfig::default(), None).await.unwrap();

        assert_eq!(report.notes, 6);
        assert_eq!(report.open, 0);
        assert_eq!(report.spawn_calls, 12);
        assert_eq!(report.close_calls, 6);
    }
}
