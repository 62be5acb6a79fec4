//! Mode, selection and view setters.

use super::BoardStore;
use crate::modules::board::drag::SnapSettings;
use crate::modules::board::state::{ConnectStyle, LinkId, NoteId, UiMode, UiState};

impl BoardStore {
    pub fn set_mode(&mut self, mode: UiMode) -> bool { self.update_ui(|ui| ui.mode = mode) }

    pub fn toggle_snap_to_grid(&mut self) -> bool {
        self.update_ui(|ui| ui.snap_to_grid = !ui.snap_to_grid)
    }

    pub fn set_connect_style(&mut self, style: ConnectStyle) -> bool {
        self.update_ui(|ui| ui.connect_style = style)
    }

    pub fn set_selected_notes(&mut self, ids: Vec<NoteId>) -> bool {
        self.update_ui(|ui| ui.selected_note_ids = ids)
    }

    pub fn set_selected_links(&mut self, ids: Vec<LinkId>) -> bool {
        self.update_ui(|ui| ui.selected_link_ids = ids)
    }

    /// Add a note to the selection, or remove it if already selected.
    pub fn toggle_note_selection(&mut self, id: &NoteId) -> bool {
        if !self.state.notes.contains_key(id) {
            return false;
        }
        self.update_ui(|ui| {
            if let Some(pos) = ui.selected_note_ids.iter().position(|n| n == id) {
                ui.selected_note_ids.remove(pos);
            } else {
                ui.selected_note_ids.push(id.clone());
            }
        })
    }

    pub fn clear_selection(&mut self) -> bool {
        self.update_ui(|ui| {
            ui.selected_note_ids.clear();
            ui.selected_link_ids.clear();
        })
    }

    /// Set the grid spacing. Non-positive values are ignored.
    pub fn set_grid_density(&mut self, density: f64) -> bool {
        if !density.is_finite() || density <= 0.0 {
            return false;
        }
        self.update_ui(|ui| ui.grid_density = density)
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.update_ui(|ui| ui.sidebar_collapsed = Some(!ui.sidebar_collapsed.unwrap_or(false)))
    }

    pub fn set_show_connections(&mut self, show: bool) -> bool {
        self.update_ui(|ui| ui.windows.show_connections = show)
    }

    /// Snapping applied to drag sessions.
    #[must_use]
    pub const fn snap_settings(&self) -> SnapSettings {
        SnapSettings {
            enabled: self.state.ui.snap_to_grid,
            grid: self.state.ui.grid_density,
            threshold: self.settings.snap_threshold,
        }
    }

    fn update_ui(&mut self, f: impl FnOnce(&mut UiState)) -> bool {
        let before = self.state.ui.clone();
        f(&mut self.state.ui);
        if self.state.ui == before {
            return false;
        }
        self.commit();
        true
    }
}
