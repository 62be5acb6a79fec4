//! Foreign OS windows shown on the board as tiles.
//!
//! Tiles are keyed by their own id and matched to OS windows by native
//! handle. A tile whose handle disappears stays on the board unbound until
//! pruned.

use std::collections::BTreeMap;

use super::BoardStore;
use crate::modules::board::effects::BoardEffect;
use crate::modules::board::state::{ExternalId, ExternalWindow, Rect};
use crate::modules::host::ExternalSnapshot;

/// Apply a snapshot to a tile, or unbind it when its window is gone.
fn refresh_tile(tile: &mut ExternalWindow, snapshot: Option<&ExternalSnapshot>) -> bool {
    let before = tile.clone();
    match snapshot {
        Some(snapshot) => {
            tile.title.clone_from(&snapshot.title);
            tile.rect = snapshot.rect;
            tile.exe.clone_from(&snapshot.exe);
            tile.class_name.clone_from(&snapshot.class_name);
            tile.is_bound = true;
        }
        None => tile.is_bound = false,
    }
    *tile != before
}

impl BoardStore {
    pub fn externals(&self) -> impl Iterator<Item = &ExternalWindow> {
        self.state.externals.iter().flat_map(BTreeMap::values)
    }

    /// Refresh tracked tiles from a window enumeration.
    ///
    /// Returns the number of tiles that changed.
    pub fn reconcile_externals(&mut self, snapshots: &[ExternalSnapshot]) -> usize {
        let Some(externals) = self.state.externals.as_mut() else { return 0 };

        let mut changed = 0;
        for tile in externals.values_mut() {
            let snapshot = snapshots.iter().find(|s| s.native_handle == tile.native_handle);
            if refresh_tile(tile, snapshot) {
                changed += 1;
            }
        }

        if changed > 0 {
            tracing::debug!(changed, "externals: reconciled");
            self.commit();
        }
        changed
    }

    /// Start tracking an OS window. A handle already tracked is refreshed.
    pub fn track_external(&mut self, snapshot: ExternalSnapshot) -> ExternalId {
        let existing = self
            .state
            .externals
            .as_mut()
            .and_then(|e| e.values_mut().find(|t| t.native_handle == snapshot.native_handle));
        if let Some(tile) = existing {
            let id = tile.id.clone();
            if refresh_tile(tile, Some(&snapshot)) {
                self.commit();
            }
            return id;
        }

        let z = self.externals().map(|t| t.z).max().unwrap_or(0).max(self.state.max_z()) + 1;
        let id = ExternalId::generate();
        let tile = ExternalWindow {
            id: id.clone(),
            native_handle: snapshot.native_handle,
            title: snapshot.title,
            rect: snapshot.rect,
            z,
            is_bound: true,
            hidden: None,
            exe: snapshot.exe,
            class_name: snapshot.class_name,
        };
        tracing::debug!(%id, handle = %tile.native_handle, "externals: tracking");
        self.state.externals.get_or_insert_with(BTreeMap::new).insert(id.clone(), tile);
        self.commit();
        id
    }

    /// Move a tile; a bound tile's OS window follows.
    pub fn move_external(&mut self, id: &ExternalId, rect: Rect) -> bool {
        let Some(tile) = self.state.externals.as_mut().and_then(|e| e.get_mut(id)) else {
            return false;
        };
        if tile.rect == rect {
            return false;
        }
        tile.rect = rect;
        if tile.is_bound {
            let native_handle = tile.native_handle.clone();
            self.outbox.push(BoardEffect::MoveExternal { id: id.clone(), native_handle, rect });
        }
        self.commit();
        true
    }

    /// Drop every unbound tile. Returns how many were removed.
    pub fn prune_unbound_externals(&mut self) -> usize {
        let Some(externals) = self.state.externals.as_mut() else { return 0 };
        let before = externals.len();
        externals.retain(|_, t| t.is_bound);
        let removed = before - externals.len();
        if removed > 0 {
            self.commit();
        }
        removed
    }

    pub fn set_external_hidden(&mut self, id: &ExternalId, hidden: bool) -> bool {
        let Some(tile) = self.state.externals.as_mut().and_then(|e| e.get_mut(id)) else {
            return false;
        };
        let next = hidden.then_some(true);
        if tile.hidden == next {
            return false;
        }
        tile.hidden = next;
        self.commit();
        true
    }

    pub fn untrack_external(&mut self, id: &ExternalId) -> bool {
        let removed = self.state.externals.as_mut().and_then(|e| e.remove(id)).is_some();
        if removed {
            self.commit();
        }
        removed
    }

    /// Ask the executor for a fresh window enumeration.
    pub fn request_externals_refresh(&mut self) { self.outbox.push(BoardEffect::RefreshExternals); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::board::store::test_support::store_with_notes;

    fn snapshot(handle: &str, x: f64) -> ExternalSnapshot {
        ExternalSnapshot {
            native_handle: handle.into(),
            title: Some(format!("window {handle}")),
            rect: Rect::new(x, 0.0, 640.0, 480.0),
            exe: None,
            class_name: None,
        }
    }

    #[test]
    fn test_track_stacks_above_notes() {
        let mut store = store_with_notes();
        let first = store.track_external(snapshot("0x1", 0.0));
        let second = store.track_external(snapshot("0x2", 0.0));

        let tiles = store.state().externals.as_ref().unwrap();
        assert_eq!(tiles[&first].z, 4);
        assert_eq!(tiles[&second].z, 5);
        assert!(tiles[&first].is_bound);
    }

    #[test]
    fn test_track_same_handle_refreshes() {
        let mut store = store_with_notes();
        let id = store.track_external(snapshot("0x1", 0.0));
        let again = store.track_external(snapshot("0x1", 100.0));
        assert_eq!(id, again);
        assert_eq!(store.externals().count(), 1);
        assert_eq!(store.externals().next().unwrap().rect.x, 100.0);
    }

    #[test]
    fn test_reconcile_unbinds_missing_and_prunes() {
        let mut store = store_with_notes();
        let kept = store.track_external(snapshot("0x1", 0.0));
        let gone = store.track_external(snapshot("0x2", 0.0));

        assert_eq!(store.reconcile_externals(&[snapshot("0x1", 50.0)]), 2);
        let tiles = store.state().externals.as_ref().unwrap();
        assert!(tiles[&kept].is_bound);
        assert_eq!(tiles[&kept].rect.x, 50.0);
        assert!(!tiles[&gone].is_bound);

        assert_eq!(store.reconcile_externals(&[snapshot("0x1", 50.0)]), 0);
        assert_eq!(store.prune_unbound_externals(), 1);
        assert_eq!(store.externals().count(), 1);
    }

    #[test]
    fn test_move_bound_tile_moves_window() {
        let mut store = store_with_notes();
        let id = store.track_external(snapshot("0x1", 0.0));
        store.take_effects();

        let rect = Rect::new(10.0, 10.0, 640.0, 480.0);
        assert!(store.move_external(&id, rect));
        assert!(store.take_effects().contains(&BoardEffect::MoveExternal {
            id: id.clone(),
            native_handle: "0x1".into(),
            rect,
        }));

        store.reconcile_externals(&[]);
        store.take_effects();
        assert!(store.move_external(&id, Rect::new(20.0, 20.0, 640.0, 480.0)));
        assert!(!store.take_effects().iter().any(|e| matches!(e, BoardEffect::MoveExternal { .. })));
    }

    #[test]
    fn test_hide_and_untrack() {
        let mut store = store_with_notes();
        let id = store.track_external(snapshot("0x1", 0.0));
        assert!(store.set_external_hidden(&id, true));
        assert!(!store.set_external_hidden(&id, true));
        assert!(store.untrack_external(&id));
        assert!(!store.untrack_external(&id));
        assert!(!store.move_external(&id, Rect::default()));
    }
}
