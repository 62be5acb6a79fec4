//! Hub actor.
//!
//! The hub actor owns the [`BoardStore`] and processes one input at a time:
//! mailbox messages from [`HubHandle`]s and executor tasks, and note-window
//! events read from the bus. After every input it drains the store's
//! effects. Host work goes to the [`EffectExecutor`], bus emits go out
//! directly, and layout saves go through a debounce deadline polled by the
//! same loop.
//!
//! # Panic Recovery
//!
//! If a handler panics, the panic is caught and logged and the actor keeps
//! processing subsequent inputs. One bad event must not take down the board.

mod handle;
mod messages;

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

pub use handle::{ActorError, HubHandle};
pub use messages::{HubMessage, HubQuery, QueryResult};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, sleep_until};

use super::debounce::Debouncer;
use super::effects::BoardEffect;
use super::executor::EffectExecutor;
use super::overlay::{OverlayState, connector_paths};
use super::persistence::{self, sample_board};
use super::state::NoteId;
use super::store::{BoardStore, FocusOrigin, OpenOutcome, SaveStatus, StoreSettings};
use crate::config::HinotesConfig;
use crate::modules::bus::{BusEvent, BusSubscription, ContentChanged, Empty, MessageBus, NoteRect, NoteRef, PersistFailure};
use crate::modules::host::{HostError, LayoutGateway, WindowHost};

/// Channel buffer size for the hub mailbox.
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Hub behaviour derived from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HubOptions {
    pub store: StoreSettings,
    pub persist_debounce: Duration,
    /// Open every note window once the layout is loaded.
    pub open_on_start: bool,
    /// Period of external window enumeration, when enabled.
    pub externals_refresh: Option<Duration>,
}

impl Default for HubOptions {
    fn default() -> Self { Self::from_config(&HinotesConfig::default()) }
}

impl HubOptions {
    #[must_use]
    pub fn from_config(config: &HinotesConfig) -> Self {
        Self {
            store: StoreSettings::from_config(config),
            persist_debounce: config.persistence.debounce(),
            open_on_start: config.board.open_notes_on_start,
            externals_refresh: config.externals.is_enabled().then(|| config.externals.refresh_interval()),
        }
    }
}

/// The actor that owns the board.
pub struct HubActor<H, G> {
    store: BoardStore,
    options: HubOptions,

    receiver: mpsc::Receiver<HubMessage>,
    mailbox: mpsc::WeakSender<HubMessage>,
    bus: MessageBus,
    events: BusSubscription,

    executor: EffectExecutor<H>,
    gateway: Arc<G>,

    persist: Debouncer<()>,
    persisting: bool,
    /// Another save was requested while one was in flight.
    persist_again: bool,
    /// Waiting for the next save to start.
    flush_waiters: Vec<oneshot::Sender<SaveStatus>>,
    /// Waiting for the save in flight.
    saving_waiters: Vec<oneshot::Sender<SaveStatus>>,

    open_waiters: HashMap<NoteId, Vec<oneshot::Sender<OpenOutcome>>>,

    stopping: bool,
    shutdown_waiters: Vec<oneshot::Sender<()>>,
}

impl<H: WindowHost, G: LayoutGateway> HubActor<H, G> {
    /// Spawn the hub on the current runtime and return a handle to it.
    ///
    /// The hub subscribes to the bus before returning, so no window event
    /// emitted after this call is missed.
    #[must_use]
    pub fn spawn(options: HubOptions, host: Arc<H>, gateway: Arc<G>, bus: MessageBus) -> HubHandle {
        tracing::debug!("hub: spawning actor");
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let actor = Self {
            store: BoardStore::new(options.store.clone()),
            persist: Debouncer::new(options.persist_debounce),
            options,
            receiver,
            mailbox: sender.downgrade(),
            events: bus.subscribe(),
            bus,
            executor: EffectExecutor::new(host, sender.downgrade()),
            gateway,
            persisting: false,
            persist_again: false,
            flush_waiters: Vec::new(),
            saving_waiters: Vec::new(),
            open_waiters: HashMap::new(),
            stopping: false,
            shutdown_waiters: Vec::new(),
        };
        tokio::spawn(actor.run());

        HubHandle::new(sender)
    }

    /// Run the actor's loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        self.load_layout().await;
        if self.options.open_on_start {
            let opened = self.store.open_all_notes(Instant::now());
            tracing::debug!(opened, "hub: opening notes on start");
        }
        self.drain_effects();
        self.broadcast_overlay();

        let mut revisions = self.store.subscribe_revision();
        let mut externals_tick = self.options.externals_refresh.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        tracing::trace!("hub: loop starting");
        while !self.is_done() {
            let persist_due = self.persist.deadline();

            tokio::select! {
                msg = self.receiver.recv() => {
                    let Some(msg) = msg else { break };
                    let name = msg.name();
                    self.guarded(name, |hub| hub.handle_message(msg));
                }
                event = self.events.recv() => match event {
                    Some(event) if event.is_from_window() => {
                        self.guarded(event.channel(), |hub| hub.handle_event(event));
                    }
                    Some(_) => {}
                    None => break,
                },
                () = sleep_until(persist_due.unwrap_or_else(Instant::now)), if persist_due.is_some() => {
                    if self.persist.take_settled(Instant::now()).is_some() {
                        self.start_persist();
                    }
                }
                Some(_) = revisions.next() => self.broadcast_overlay(),
                () = tick(&mut externals_tick) => {
                    self.store.request_externals_refresh();
                    self.drain_effects();
                }
            }
        }

        self.finish().await;
    }

    fn is_done(&self) -> bool { self.stopping && !self.persisting && !self.persist.is_pending() }

    /// Handle one input, containing any panic, then drain effects.
    fn guarded(&mut self, name: &'static str, f: impl FnOnce(&mut Self)) {
        let result = catch_unwind(AssertUnwindSafe(|| f(self)));
        if let Err(panic_info) = result {
            let panic_msg = panic_info
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic_info.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(input = name, panic = %panic_msg, "hub: handler panicked, continuing");
        }
        self.store.purge_expired_leases(Instant::now());
        self.drain_effects();
    }

    // ========================================================================
    // Startup and shutdown
    // ========================================================================

    async fn load_layout(&mut self) {
        match self.gateway.load().await {
            Ok(Some(document)) => match persistence::decode(&document) {
                Ok(state) => {
                    tracing::info!(notes = state.notes.len(), links = state.links.len(), "hub: layout loaded");
                    self.store.initialize_from_state(state);
                    return;
                }
                Err(err) => tracing::warn!(error = %err, "hub: stored layout unreadable, using sample"),
            },
            Ok(None) => tracing::info!("hub: no stored layout, using sample"),
            Err(err) => tracing::warn!(error = %err, "hub: layout load failed, using sample"),
        }
        self.store.initialize_from_state(sample_board());
    }

    async fn finish(mut self) {
        // Handles dropped with a save still pending: write it inline.
        if self.persist.flush().is_some() && !self.persisting {
            match persistence::encode(self.store.state()) {
                Ok(document) => {
                    if let Err(err) = self.gateway.persist(document).await {
                        tracing::warn!(error = %err, "hub: final save failed");
                    }
                }
                Err(err) => tracing::warn!(error = %err, "hub: final save not encoded"),
            }
        }

        for waiter in self.shutdown_waiters.drain(..) {
            let _ = waiter.send(());
        }
        tracing::debug!("hub: stopped");
    }

    // ========================================================================
    // Mailbox
    // ========================================================================

    fn handle_message(&mut self, msg: HubMessage) {
        let now = Instant::now();
        let store = &mut self.store;

        match msg {
            HubMessage::CreateNote { overrides, respond_to } => {
                let id = store.create_note(overrides, now);
                if let Some(tx) = respond_to {
                    let _ = tx.send(id);
                }
            }
            HubMessage::DeleteNote { id } => {
                store.delete_note(&id);
            }
            HubMessage::UndoDelete => {
                store.undo_delete(now);
            }
            HubMessage::UpdateContent { id, title, content } => {
                store.update_note_content(&id, title, content);
            }
            HubMessage::PatchNote { id, patch } => {
                store.update_note_window(&id, patch);
            }
            HubMessage::BringToFront { id } => {
                store.bring_note_to_front(&id, FocusOrigin::Board);
            }
            HubMessage::SetNoteRect { id, rect } => {
                store.set_note_rect_from_board(&id, rect, now);
            }

            HubMessage::OpenNote { id, respond_to } => {
                let request = store.open_note_window(&id, now);
                match (Option::<OpenOutcome>::from(request), respond_to) {
                    (Some(outcome), Some(tx)) => {
                        let _ = tx.send(outcome);
                    }
                    (None, Some(tx)) => self.open_waiters.entry(id).or_default().push(tx),
                    (_, None) => {}
                }
            }
            HubMessage::OpenAll => {
                store.open_all_notes(now);
            }
            HubMessage::CloseNote { id } => store.close_note_window(&id),
            HubMessage::ToggleNote { id } => {
                store.toggle_note_window(&id, now);
            }

            HubMessage::BeginDrag { id, operation } => {
                store.begin_drag(&id, operation);
            }
            HubMessage::DragBy { id, dx, dy, free } => {
                store.drag_by(&id, dx, dy, free, now);
            }
            HubMessage::CommitDrag { id } => {
                store.commit_drag(&id, now);
            }
            HubMessage::CancelDrag { id } => {
                store.cancel_drag(&id, now);
            }

            HubMessage::CreateLink { source, target } => {
                store.create_link(&source, &target);
            }
            HubMessage::DeleteLink { id } => {
                store.delete_link(&id);
            }
            HubMessage::SetLinkDirected { id, directed } => {
                store.set_link_directed(&id, directed);
            }
            HubMessage::ReverseLink { id } => {
                store.reverse_link(&id);
            }
            HubMessage::SetLinkLabel { id, label } => {
                store.set_link_label(&id, label);
            }
            HubMessage::BeginLink { source } => {
                store.begin_link(&source);
            }
            HubMessage::CompleteLink { target } => {
                store.complete_link(&target);
            }
            HubMessage::CancelLink => store.cancel_link(),

            HubMessage::SetMode(mode) => {
                store.set_mode(mode);
            }
            HubMessage::ToggleSnapToGrid => {
                store.toggle_snap_to_grid();
            }
            HubMessage::SetConnectStyle(style) => {
                store.set_connect_style(style);
            }
            HubMessage::SetSelectedNotes(ids) => {
                store.set_selected_notes(ids);
            }
            HubMessage::SetSelectedLinks(ids) => {
                store.set_selected_links(ids);
            }
            HubMessage::ToggleNoteSelection { id } => {
                store.toggle_note_selection(&id);
            }
            HubMessage::ClearSelection => {
                store.clear_selection();
            }
            HubMessage::SetGridDensity(density) => {
                store.set_grid_density(density);
            }
            HubMessage::ToggleSidebar => {
                store.toggle_sidebar();
            }
            HubMessage::SetShowConnections(show) => {
                store.set_show_connections(show);
            }

            HubMessage::TrackExternal(snapshot) => {
                store.track_external(snapshot);
            }
            HubMessage::MoveExternal { id, rect } => {
                store.move_external(&id, rect);
            }
            HubMessage::SetExternalHidden { id, hidden } => {
                store.set_external_hidden(&id, hidden);
            }
            HubMessage::UntrackExternal { id } => {
                store.untrack_external(&id);
            }
            HubMessage::PruneExternals => {
                store.prune_unbound_externals();
            }
            HubMessage::RefreshExternals => store.request_externals_refresh(),

            HubMessage::ResetLayout => store.reset_to_sample_layout(now),
            HubMessage::Flush { respond_to } => {
                if let Some(tx) = respond_to {
                    self.flush_waiters.push(tx);
                }
                store.flush_now();
            }

            HubMessage::SpawnResolved { id, attempt, result } => store.on_spawn_resolved(&id, attempt, result),
            HubMessage::HandshakeTimeout { id, attempt } => store.on_handshake_timeout(&id, attempt),
            HubMessage::RectApplied { id, result } => store.on_rect_applied(&id, result),
            HubMessage::ExternalsEnumerated(result) => match result {
                Ok(snapshots) => {
                    store.reconcile_externals(&snapshots);
                }
                Err(err) => tracing::warn!(error = %err, "hub: window enumeration failed"),
            },
            HubMessage::PersistFinished { revision, result } => self.finish_persist(revision, result),

            HubMessage::Query { query, respond_to } => {
                let result = self.execute_query(query);
                let _ = respond_to.send(result);
            }
            HubMessage::Shutdown { respond_to } => {
                tracing::debug!("hub: shutdown requested");
                self.stopping = true;
                if let Some(tx) = respond_to {
                    self.shutdown_waiters.push(tx);
                }
                if self.persist.flush().is_some() {
                    self.start_persist();
                }
            }
        }
    }

    // ========================================================================
    // Window events
    // ========================================================================

    fn handle_event(&mut self, event: BusEvent) {
        let now = Instant::now();
        let store = &mut self.store;

        match event {
            BusEvent::NoteMoved(NoteRect { id, rect }) => {
                store.on_window_moved(&id, rect, now);
            }
            BusEvent::NoteResized(NoteRect { id, rect }) => {
                store.on_window_resized(&id, rect, now);
            }
            BusEvent::NoteFocused(NoteRef { id }) => {
                store.bring_note_to_front(&id, FocusOrigin::Os);
            }
            BusEvent::NoteBlurred(NoteRef { id }) => store.on_note_blurred(&id),
            BusEvent::NoteClosed(NoteRef { id }) => store.mark_note_closed_from_os(&id),
            BusEvent::NoteContentChanged(ContentChanged { id, title, content }) => {
                store.update_note_content(&id, title, content);
            }
            BusEvent::NoteReady(NoteRef { id }) => store.on_note_ready(&id),
            BusEvent::NoteRequestHydrate(NoteRef { id }) => store.request_hydrate(&id),
            BusEvent::NoteHydrate(_)
            | BusEvent::PersistOk(_)
            | BusEvent::PersistFail(_)
            | BusEvent::OverlayStateSync(_) => {}
        }
    }

    // ========================================================================
    // Effects
    // ========================================================================

    fn drain_effects(&mut self) {
        for effect in self.store.take_effects() {
            match effect {
                BoardEffect::Emit(event) => self.bus.emit(event),
                // No debounce once shutdown has been requested.
                BoardEffect::SchedulePersist if self.stopping => self.start_persist(),
                BoardEffect::SchedulePersist => {
                    self.persist.update((), Instant::now());
                }
                BoardEffect::PersistNow => {
                    self.persist.cancel();
                    self.start_persist();
                }
                BoardEffect::OpenSettled { id, outcome } => self.settle_open(&id, &outcome),
                other => self.executor.execute(other),
            }
        }
    }

    fn settle_open(&mut self, id: &NoteId, outcome: &OpenOutcome) {
        tracing::debug!(%id, ?outcome, "hub: open settled");
        for tx in self.open_waiters.remove(id).unwrap_or_default() {
            let _ = tx.send(outcome.clone());
        }
    }

    fn broadcast_overlay(&self) {
        let overlay = OverlayState::from_board(self.store.state());
        self.bus.emit(BusEvent::OverlayStateSync(Box::new(overlay)));
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    fn start_persist(&mut self) {
        if self.persisting {
            self.persist_again = true;
            return;
        }

        let revision = self.store.revision();
        self.saving_waiters.append(&mut self.flush_waiters);

        let document = match persistence::encode(self.store.state()) {
            Ok(document) => document,
            Err(err) => {
                self.finish_persist(revision, Err(HostError::Storage(err.to_string())));
                return;
            }
        };

        tracing::debug!(revision, "hub: saving layout");
        self.persisting = true;
        let gateway = self.gateway.clone();
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let result = gateway.persist(document).await;
            if let Some(sender) = mailbox.upgrade() {
                let _ = sender.send(HubMessage::PersistFinished { revision, result }).await;
            }
        });
    }

    fn finish_persist(&mut self, revision: u64, result: Result<(), HostError>) {
        self.persisting = false;

        let status = match result {
            Ok(()) => {
                tracing::debug!(revision, "hub: layout saved");
                self.bus.emit(BusEvent::PersistOk(Empty {}));
                SaveStatus::Saved { revision }
            }
            Err(err) => {
                tracing::warn!(revision, error = %err, "hub: layout save failed");
                let error = err.to_string();
                self.bus.emit(BusEvent::PersistFail(PersistFailure { error: Some(error.clone()) }));
                SaveStatus::Failed { revision, error }
            }
        };

        self.store.record_save(status.clone());
        for tx in self.saving_waiters.drain(..) {
            let _ = tx.send(status.clone());
        }

        if std::mem::take(&mut self.persist_again) {
            self.start_persist();
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn execute_query(&self, query: HubQuery) -> QueryResult {
        let store = &self.store;
        match query {
            HubQuery::GetBoard => QueryResult::Board(Box::new(store.state().clone())),
            HubQuery::GetNote { id } => QueryResult::Note(store.state().notes.get(&id).cloned().map(Box::new)),
            HubQuery::GetOverlay => QueryResult::Overlay(Box::new(OverlayState::from_board(store.state()))),
            HubQuery::GetConnectors { style, only_open } => {
                let style = style.unwrap_or(store.state().ui.connect_style);
                QueryResult::Connectors(connector_paths(store.state(), style, only_open))
            }
            HubQuery::GetWindowPhase { id } => QueryResult::WindowPhase(store.window_phase(&id)),
            HubQuery::GetDragSession { id } => QueryResult::DragSession(store.drag_session(id.as_str()).cloned()),
            HubQuery::GetLinkingDraft => QueryResult::LinkingDraft(store.linking_draft().clone()),
            HubQuery::GetLastSave => QueryResult::LastSave(store.last_save().cloned()),
            HubQuery::GetRevision => QueryResult::Revision(store.revision()),
        }
    }
}

/// Wait for the next tick of an optional interval; never resolves when the
/// interval is disabled.
async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
