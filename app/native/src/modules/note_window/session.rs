//! A note window's side of the handshake and sync protocol.
//!
//! ```text
//!   start ──► emit note:ready ──► wait for note:hydrate ──► editing
//!                  │                                          │
//!                  └─ no hydrate after 1s: note:request_hydrate
//! ```
//!
//! While running, the session also samples its window frame on an adaptive
//! schedule and emits `note:moved` / `note:resized`, and forwards content
//! edits as `note:content_changed` once typing has paused.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};

use super::NativeWindow;
use super::poller::{PollScheduler, RectSampler};
use crate::config::SyncConfig;
use crate::modules::board::debounce::Debouncer;
use crate::modules::board::state::NoteId;
use crate::modules::bus::{BusEvent, BusSubscription, ContentChanged, Hydrate, MessageBus, NoteRef};

/// Time to wait for hydration before asking for it explicitly.
pub const HYDRATE_FALLBACK: Duration = Duration::from_secs(1);

/// Behaviour of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Announce `note:ready` on start. Disabled to simulate a window that
    /// never finishes loading.
    pub respond_ready: bool,
    pub hydrate_fallback: Duration,
    pub content_debounce: Duration,
    pub scheduler: PollScheduler,
}

impl Default for SessionOptions {
    fn default() -> Self { Self::from_config(&SyncConfig::default()) }
}

impl SessionOptions {
    #[must_use]
    pub const fn from_config(config: &SyncConfig) -> Self {
        Self {
            respond_ready: true,
            hydrate_fallback: HYDRATE_FALLBACK,
            content_debounce: config.content_debounce(),
            scheduler: PollScheduler::from_config(config),
        }
    }
}

#[derive(Debug)]
enum SessionCommand {
    Edit { title: Option<String>, content: Option<String> },
    Focus,
    Blur,
    RequestHydrate,
    /// The user closed the window.
    Close,
    /// Stop without emitting anything, e.g. when the window is replaced.
    Detach,
}

/// Cloneable control surface of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: NoteId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    hydrated: watch::Receiver<Option<Hydrate>>,
}

impl SessionHandle {
    #[must_use]
    pub const fn id(&self) -> &NoteId { &self.id }

    /// Edit the note's title and/or content as the user would.
    pub fn edit(&self, title: Option<String>, content: Option<String>) -> bool {
        self.send(SessionCommand::Edit { title, content })
    }

    pub fn edit_content(&self, content: impl Into<String>) -> bool {
        self.edit(None, Some(content.into()))
    }

    pub fn focus(&self) -> bool { self.send(SessionCommand::Focus) }

    pub fn blur(&self) -> bool { self.send(SessionCommand::Blur) }

    pub fn request_hydrate(&self) -> bool { self.send(SessionCommand::RequestHydrate) }

    pub fn close(&self) -> bool { self.send(SessionCommand::Close) }

    pub fn detach(&self) -> bool { self.send(SessionCommand::Detach) }

    /// Whether the session task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool { !self.commands.is_closed() }

    /// The last hydrate payload received, if any.
    #[must_use]
    pub fn hydrated(&self) -> Option<Hydrate> { self.hydrated.borrow().clone() }

    /// Wait until the session has been hydrated.
    ///
    /// Returns `None` if the session stops first.
    pub async fn wait_hydrated(&self) -> Option<Hydrate> {
        let mut receiver = self.hydrated.clone();
        receiver.wait_for(Option::is_some).await.ok().and_then(|h| h.as_ref().cloned())
    }

    fn send(&self, command: SessionCommand) -> bool { self.commands.send(command).is_ok() }
}

/// The running state of one note window.
pub struct NoteWindowSession<W> {
    id: NoteId,
    window: Arc<W>,
    bus: MessageBus,
    events: BusSubscription,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    hydrated: watch::Sender<Option<Hydrate>>,
    options: SessionOptions,
    sampler: RectSampler,
    last_change: Option<Instant>,
    edits: Debouncer<ContentChanged>,
}

impl<W: NativeWindow> NoteWindowSession<W> {
    /// Start a session on the current runtime.
    ///
    /// The bus subscription is taken before `note:ready` goes out, so the
    /// hydrate answer cannot be missed.
    pub fn spawn(id: NoteId, window: Arc<W>, bus: MessageBus, options: SessionOptions) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (hydrated_tx, hydrated_rx) = watch::channel(None);

        let session = Self {
            id: id.clone(),
            window,
            events: bus.subscribe(),
            bus,
            commands: command_rx,
            hydrated: hydrated_tx,
            options,
            sampler: RectSampler::new(),
            last_change: None,
            edits: Debouncer::new(options.content_debounce),
        };
        tokio::spawn(session.run());

        SessionHandle { id, commands: command_tx, hydrated: hydrated_rx }
    }

    async fn run(mut self) {
        tracing::debug!(id = %self.id, "session: started");
        let started = Instant::now();
        let mut hydrate_deadline = None;
        if self.options.respond_ready {
            self.bus.emit(BusEvent::NoteReady(NoteRef { id: self.id.clone() }));
            hydrate_deadline = Some(started + self.options.hydrate_fallback);
        }

        if !self.poll(started) {
            self.settle_pending();
            return;
        }
        let mut next_poll = started + self.options.scheduler.next_delay(None);

        loop {
            let edits_due = self.edits.deadline();

            tokio::select! {
                event = self.events.recv() => match event {
                    Some(BusEvent::NoteHydrate(hydrate)) if hydrate.id == self.id => {
                        self.on_hydrate(hydrate);
                    }
                    Some(_) => {}
                    None => break,
                },
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Edit { title, content }) => self.on_edit(title, content),
                    Some(SessionCommand::Focus) => {
                        self.bus.emit(BusEvent::NoteFocused(NoteRef { id: self.id.clone() }));
                    }
                    Some(SessionCommand::Blur) => {
                        self.bus.emit(BusEvent::NoteBlurred(NoteRef { id: self.id.clone() }));
                    }
                    Some(SessionCommand::RequestHydrate) => self.emit_request_hydrate(),
                    Some(SessionCommand::Close) => {
                        self.report_closed();
                        break;
                    }
                    Some(SessionCommand::Detach) | None => break,
                },
                () = sleep_until(next_poll) => {
                    let now = Instant::now();
                    if !self.poll(now) {
                        self.settle_pending();
                        break;
                    }
                    let since = self.last_change.map(|at| now.duration_since(at));
                    next_poll = now + self.options.scheduler.next_delay(since);
                }
                () = sleep_until(edits_due.unwrap_or(started)), if edits_due.is_some() => {
                    if let Some(change) = self.edits.take_settled(Instant::now()) {
                        self.bus.emit(BusEvent::NoteContentChanged(change));
                    }
                }
                () = sleep_until(hydrate_deadline.unwrap_or(started)), if hydrate_deadline.is_some() => {
                    hydrate_deadline = None;
                    if self.hydrated.borrow().is_none() {
                        tracing::debug!(id = %self.id, "session: no hydrate yet, requesting");
                        self.emit_request_hydrate();
                    }
                }
            }
        }

        tracing::debug!(id = %self.id, "session: stopped");
    }

    fn on_hydrate(&mut self, hydrate: Hydrate) {
        tracing::trace!(id = %self.id, "session: hydrated");
        // Content from the hub replaces whatever was being typed.
        self.edits.cancel();
        self.hydrated.send_replace(Some(hydrate));
    }

    fn on_edit(&mut self, title: Option<String>, content: Option<String>) {
        if self.hydrated.borrow().is_none() {
            tracing::debug!(id = %self.id, "session: edit before hydration ignored");
            return;
        }
        let mut change = self.edits.flush().unwrap_or_else(|| ContentChanged {
            id: self.id.clone(),
            title: None,
            content: None,
        });
        if title.is_some() {
            change.title = title;
        }
        if content.is_some() {
            change.content = content;
        }
        self.edits.update(change, Instant::now());
    }

    fn flush_edits(&mut self) {
        if let Some(change) = self.edits.flush() {
            self.bus.emit(BusEvent::NoteContentChanged(change));
        }
    }

    fn report_closed(&mut self) {
        self.flush_edits();
        self.bus.emit(BusEvent::NoteClosed(NoteRef { id: self.id.clone() }));
    }

    /// Handle commands queued before the window disappeared. A pending close
    /// is still reported.
    fn settle_pending(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                SessionCommand::Edit { title, content } => self.on_edit(title, content),
                SessionCommand::Close => {
                    self.report_closed();
                    return;
                }
                SessionCommand::Detach => return,
                SessionCommand::Focus | SessionCommand::Blur | SessionCommand::RequestHydrate => {}
            }
        }
    }

    fn emit_request_hydrate(&self) {
        self.bus.emit(BusEvent::NoteRequestHydrate(NoteRef { id: self.id.clone() }));
    }

    /// Sample the frame. Returns `false` once the window is gone.
    fn poll(&mut self, now: Instant) -> bool {
        let rect = match self.window.outer_rect() {
            Ok(rect) => rect,
            Err(err) => {
                tracing::debug!(id = %self.id, error = %err, "session: window gone, stopping");
                return false;
            }
        };

        let change = self.sampler.observe(rect);
        if change.moved {
            self.bus.emit(BusEvent::moved(self.id.clone(), rect));
        }
        if change.resized {
            self.bus.emit(BusEvent::resized(self.id.clone(), rect));
        }
        if change.any() {
            self.last_change = Some(now);
        }
        true
    }
}
