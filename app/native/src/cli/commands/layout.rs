//! Layout CLI commands.

use clap::Subcommand;
use colored::Colorize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::{block_on, layout_store};
use crate::cli::output;
use crate::error::HinotesError;
use crate::modules::board::overlay::connector_paths;
use crate::modules::board::persistence::{self, JsonFileLayout, sample_board};
use crate::modules::board::state::{BoardState, ConnectStyle, Note};
use crate::modules::host::LayoutGateway;

/// Layout management commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum LayoutCommands {
    /// Show the notes and links of the saved layout.
    ///
    /// Falls back to the sample board when nothing has been saved yet.
    Show {
        /// Output the normalized document as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Show the path of the layout file.
    Path,

    /// Replace the saved layout with the sample board.
    #[command(after_long_help = r"Examples:
  hinotes layout reset            # Only when no layout exists yet
  hinotes layout reset --force    # Overwrite the saved layout")]
    Reset {
        /// Overwrite an existing layout.
        #[arg(long, short)]
        force: bool,
    },
}

/// Execute layout subcommands.
///
/// # Errors
///
/// Returns an error if the layout cannot be read or written.
pub fn execute(cmd: &LayoutCommands) -> Result<(), HinotesError> {
    let store = layout_store()?;
    match cmd {
        LayoutCommands::Show { json } => {
            let (board, saved) = load_board(&store)?;
            if *json {
                output::print_highlighted_json(&serde_json::to_value(&board)?);
            } else {
                print_board(&board, saved);
            }
            Ok(())
        }
        LayoutCommands::Path => {
            let path = store.path();
            let marker = if path.exists() { "" } else { " (not saved yet)" };
            println!("{}{marker}", path.display());
            Ok(())
        }
        LayoutCommands::Reset { force } => reset(&store, *force),
    }
}

/// Execute the `connectors` command.
///
/// # Errors
///
/// Returns an error if the layout cannot be read.
pub fn execute_connectors(style: Option<ConnectStyle>, open_only: bool, json: bool) -> Result<(), HinotesError> {
    #[derive(Tabled)]
    struct ConnectorRow {
        #[tabled(rename = "Link")]
        link: String,
        #[tabled(rename = "From")]
        from: String,
        #[tabled(rename = "To")]
        to: String,
        #[tabled(rename = "Anchors")]
        anchors: String,
        #[tabled(rename = "Directed")]
        directed: String,
        #[tabled(rename = "Path")]
        path: String,
    }

    let (board, _) = load_board(&layout_store()?)?;
    let style = style.unwrap_or(board.ui.connect_style);
    let connectors = connector_paths(&board, style, open_only);

    if json {
        output::print_highlighted_json(&serde_json::to_value(&connectors)?);
        return Ok(());
    }

    let title = |id: &str| board.note(id).map_or_else(|| id.to_string(), |n| output::truncate(&n.title, 20));
    let rows: Vec<ConnectorRow> = connectors
        .iter()
        .map(|c| ConnectorRow {
            link: c.link_id.to_string(),
            from: title(c.source.as_str()),
            to: title(c.target.as_str()),
            anchors: format!("{:?} → {:?}", c.anchors.source.anchor, c.anchors.target.anchor).to_lowercase(),
            directed: output::format_bool(c.directed),
            path: output::truncate(&c.path, 48),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..5)).with(Alignment::center()))
        .to_string();

    let style_name = format!("{style:?}").to_lowercase();
    println!("{}", format!("Connectors ({}, {style_name})", connectors.len()).bold());
    println!("{table}");
    Ok(())
}

/// Read and normalize the saved layout. The flag is `false` when the sample
/// board was substituted.
fn load_board(store: &JsonFileLayout) -> Result<(BoardState, bool), HinotesError> {
    match block_on(store.load())?? {
        Some(document) => Ok((persistence::decode(&document)?, true)),
        None => Ok((sample_board(), false)),
    }
}

fn reset(store: &JsonFileLayout, force: bool) -> Result<(), HinotesError> {
    if store.path().exists() && !force {
        return Err(HinotesError::PersistenceError(format!(
            "A layout already exists at: {}\nUse --force to overwrite.",
            store.path().display()
        )));
    }

    let document = persistence::encode(&sample_board())?;
    block_on(store.persist(document))??;
    println!("Sample layout written to: {}", store.path().display());
    Ok(())
}

/// Notes sorted by title in natural order, so "Note 2" precedes "Note 10".
fn sorted_notes(board: &BoardState) -> Vec<&Note> {
    let mut notes: Vec<&Note> = board.notes.values().collect();
    notes.sort_by(|a, b| natord::compare(&a.title, &b.title).then_with(|| a.id.cmp(&b.id)));
    notes
}

fn print_board(board: &BoardState, saved: bool) {
    #[derive(Tabled)]
    struct NoteRow {
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Position")]
        position: String,
        #[tabled(rename = "Size")]
        size: String,
        #[tabled(rename = "Z")]
        z: u32,
        #[tabled(rename = "Links")]
        links: usize,
        #[tabled(rename = "Focused")]
        focused: String,
    }

    let focused = board.ui.focused_note_id.as_ref();
    let rows: Vec<NoteRow> = sorted_notes(board)
        .into_iter()
        .map(|note| NoteRow {
            title: output::truncate(&note.title, 28),
            id: note.id.to_string(),
            position: output::format_position(&note.rect),
            size: output::format_size(&note.rect),
            z: note.z,
            links: board.links.values().filter(|l| l.references(note.id.as_str())).count(),
            focused: output::format_bool(focused == Some(&note.id)),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..6)).with(Alignment::right()))
        .with(Modify::new(Columns::new(6..7)).with(Alignment::center()))
        .to_string();

    if !saved {
        println!("{}", "No saved layout, showing the sample board.".yellow());
    }
    println!("{}", format!("Notes ({})", board.notes.len()).bold());
    println!("{table}");
    println!(
        "{} links · mode {:?} · snap {} · grid {:.0}px",
        board.links.len(),
        board.ui.mode,
        output::format_bool(board.ui.snap_to_grid),
        board.ui.grid_density,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::board::state::{NoteId, Rect};

    #[test]
    fn test_notes_sorted_naturally() {
        let mut board = BoardState::default();
        for (id, title) in [("a", "Note 10"), ("b", "Note 2"), ("c", "Alpha")] {
            board.notes.insert(NoteId::new(id), Note::new(NoteId::new(id), title, Rect::default(), 1));
        }

        let titles: Vec<&str> = sorted_notes(&board).iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Note 2", "Note 10"]);
    }

    #[test]
    fn test_missing_layout_falls_back_to_sample() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLayout::new(dir.path().join("layout.json"));

        let (board, saved) = load_board(&store).unwrap();
        assert!(!saved);
        assert_eq!(board.notes.len(), 6);
    }

    #[test]
    fn test_reset_requires_force_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLayout::new(dir.path().join("layout.json"));

        reset(&store, false).unwrap();
        assert!(reset(&store, false).is_err());
        reset(&store, true).unwrap();

        let (board, saved) = load_board(&store).unwrap();
        assert!(saved);
        assert_eq!(board.links.len(), 7);
    }
}
