//! Link actions and the connect-mode linking draft.

use super::BoardStore;
use crate::modules::board::state::{Link, LinkId, NoteId};

impl BoardStore {
    /// Link two notes with a directed link.
    ///
    /// Returns `None` when either note is missing, the notes are the same,
    /// or a link already connects the pair in either direction.
    pub fn create_link(&mut self, source: &NoteId, target: &NoteId) -> Option<LinkId> {
        if source == target {
            return None;
        }
        if !self.state.notes.contains_key(source) || !self.state.notes.contains_key(target) {
            return None;
        }
        if self.state.links.values().any(|l| l.connects_pair(source.as_str(), target.as_str())) {
            tracing::debug!(%source, %target, "links: pair already linked");
            return None;
        }

        let id = LinkId::generate();
        let link = Link::between_notes(id.clone(), source.clone(), target.clone(), true);
        tracing::debug!(%id, %source, %target, "links: created");
        self.state.links.insert(id.clone(), link);
        self.commit();
        Some(id)
    }

    pub fn delete_link(&mut self, id: &LinkId) -> bool {
        if self.state.links.remove(id).is_none() {
            return false;
        }
        self.state.ui.selected_link_ids.retain(|l| l != id);
        self.commit();
        true
    }

    pub fn set_link_directed(&mut self, id: &LinkId, directed: bool) -> bool {
        self.update_link(id, |link| link.directed = Some(directed))
    }

    /// Swap a link's source and target.
    pub fn reverse_link(&mut self, id: &LinkId) -> bool {
        self.update_link(id, |link| std::mem::swap(&mut link.source, &mut link.target))
    }

    /// Set or clear a link's label. Blank labels clear it.
    pub fn set_link_label(&mut self, id: &LinkId, label: Option<String>) -> bool {
        let label = label.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());
        self.update_link(id, |link| link.label = label)
    }

    // ========================================================================
    // Linking draft
    // ========================================================================

    /// Start a link from `source` in connect mode.
    pub fn begin_link(&mut self, source: &NoteId) -> bool {
        if !self.state.notes.contains_key(source) {
            return false;
        }
        self.linking.source = Some(source.clone());
        true
    }

    /// Finish the pending link at `target`. The draft is consumed either way.
    pub fn complete_link(&mut self, target: &NoteId) -> Option<LinkId> {
        let source = self.linking.source.take()?;
        self.create_link(&source, target)
    }

    pub fn cancel_link(&mut self) { self.linking.source = None; }

    fn update_link(&mut self, id: &LinkId, f: impl FnOnce(&mut Link)) -> bool {
        let Some(link) = self.state.links.get_mut(id) else { return false };
        let before = link.clone();
        f(link);
        if *link == before {
            return false;
        }
        self.commit();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::modules::board::state::{LinkEndpoint, NoteId};

    fn id(s: &str) -> NoteId { NoteId::new(s) }

    #[test]
    fn test_create_link_is_pair_idempotent() {
        let mut store = store_with_notes();
        let link = store.create_link(&id("a"), &id("b"));
        assert!(link.is_some());
        assert!(store.create_link(&id("b"), &id("a")).is_none());
        assert!(store.create_link(&id("a"), &id("b")).is_none());
        assert_eq!(store.state().links.len(), 1);

        let link = &store.state().links[&link.unwrap()];
        assert!(link.is_directed());
        assert_eq!(link.source, LinkEndpoint::note("a"));
    }

    #[test]
    fn test_create_link_rejects_self_and_missing() {
        let mut store = store_with_notes();
        assert!(store.create_link(&id("a"), &id("a")).is_none());
        assert!(store.create_link(&id("a"), &id("ghost")).is_none());
        assert!(store.state().links.is_empty());
    }

    #[test]
    fn test_delete_link_deselects() {
        let mut store = store_with_notes();
        let link = store.create_link(&id("a"), &id("b")).unwrap();
        store.set_selected_links(vec![link.clone()]);

        assert!(store.delete_link(&link));
        assert!(store.state().ui.selected_link_ids.is_empty());
        assert!(!store.delete_link(&link));
    }

    #[test]
    fn test_reverse_and_direction() {
        let mut store = store_with_notes();
        let link = store.create_link(&id("a"), &id("b")).unwrap();

        assert!(store.reverse_link(&link));
        assert_eq!(store.state().links[&link].source, LinkEndpoint::note("b"));

        assert!(store.set_link_directed(&link, false));
        assert!(!store.set_link_directed(&link, false));
        assert!(!store.state().links[&link].is_directed());
    }

    #[test]
    fn test_blank_label_clears() {
        let mut store = store_with_notes();
        let link = store.create_link(&id("a"), &id("b")).unwrap();
        assert!(store.set_link_label(&link, Some("  depends on ".into())));
        assert_eq!(store.state().links[&link].label.as_deref(), Some("depends on"));
        assert!(store.set_link_label(&link, Some("   ".into())));
        assert_eq!(store.state().links[&link].label, None);
    }

    #[test]
    fn test_linking_draft() {
        let mut store = store_with_notes();
        assert!(!store.begin_link(&id("ghost")));
        assert!(store.complete_link(&id("b")).is_none());

        assert!(store.begin_link(&id("a")));
        assert_eq!(store.linking_draft().source, Some(id("a")));
        assert!(store.complete_link(&id("c")).is_some());
        assert_eq!(store.linking_draft().source, None);

        store.begin_link(&id("a"));
        store.cancel_link();
        assert!(store.complete_link(&id("b")).is_none());
        assert_eq!(store.state().links.len(), 1);
    }
}
