//! In-process window host.
//!
//! Each spawned note gets a [`VirtualWindow`] and a [`NoteWindowSession`]
//! running on the current runtime, so the whole protocol (ready, hydrate,
//! polling, edits, close) runs end to end without a GUI toolkit. Every
//! capability call is recorded for inspection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{ExternalSnapshot, HostError, LayoutGateway, SpawnRequest, WindowHost};
use crate::modules::board::state::{NoteId, Rect};
use crate::modules::bus::MessageBus;
use crate::modules::note_window::{NativeWindow, NoteWindowSession, SessionHandle, SessionOptions};

/// A window that only exists as a frame.
#[derive(Debug)]
pub struct VirtualWindow {
    label: String,
    rect: Mutex<Rect>,
    closed: AtomicBool,
}

impl VirtualWindow {
    #[must_use]
    pub fn new(label: impl Into<String>, rect: Rect) -> Self {
        Self { label: label.into(), rect: Mutex::new(rect), closed: AtomicBool::new(false) }
    }

    #[must_use]
    pub fn rect(&self) -> Rect { *self.rect.lock() }

    pub fn set_rect(&self, rect: Rect) { *self.rect.lock() = rect; }

    pub fn close(&self) { self.closed.store(true, Ordering::Release); }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }
}

impl NativeWindow for VirtualWindow {
    fn outer_rect(&self) -> Result<Rect, HostError> {
        if self.is_closed() {
            return Err(HostError::NotFound(self.label.clone()));
        }
        Ok(self.rect())
    }
}

/// A recorded capability call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Spawn { id: NoteId, rect: Rect },
    Focus { id: NoteId },
    Close { id: NoteId },
    SetRect { id: NoteId, rect: Rect },
    Enumerate,
    MoveExternal { native_handle: String, rect: Rect },
}

/// Knobs for simulating misbehaving windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessOptions {
    /// Reject every spawn request.
    pub fail_spawn: bool,
    pub session: SessionOptions,
}

struct HostedWindow {
    window: Arc<VirtualWindow>,
    session: SessionHandle,
}

/// [`WindowHost`] backed by virtual windows and in-process sessions.
pub struct HeadlessHost {
    bus: MessageBus,
    options: Mutex<HeadlessOptions>,
    windows: Mutex<HashMap<String, HostedWindow>>,
    externals: Mutex<Vec<ExternalSnapshot>>,
    calls: Mutex<Vec<HostCall>>,
}

impl std::fmt::Debug for HeadlessHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessHost")
            .field("windows", &self.windows.lock().len())
            .field("calls", &self.calls.lock().len())
            .finish_non_exhaustive()
    }
}

impl HeadlessHost {
    #[must_use]
    pub fn new(bus: MessageBus, options: HeadlessOptions) -> Self {
        Self {
            bus,
            options: Mutex::new(options),
            windows: Mutex::new(HashMap::new()),
            externals: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Change behaviour for subsequent spawns.
    pub fn set_options(&self, options: HeadlessOptions) { *self.options.lock() = options; }

    /// Replace the set of foreign windows reported by enumeration.
    pub fn set_externals(&self, externals: Vec<ExternalSnapshot>) { *self.externals.lock() = externals; }

    #[must_use]
    pub fn window(&self, id: &NoteId) -> Option<Arc<VirtualWindow>> {
        self.windows.lock().get(&id.window_label()).map(|w| w.window.clone())
    }

    #[must_use]
    pub fn session(&self, id: &NoteId) -> Option<SessionHandle> {
        self.windows.lock().get(&id.window_label()).map(|w| w.session.clone())
    }

    #[must_use]
    pub fn open_windows(&self) -> usize { self.windows.lock().len() }

    /// Move a window as the user would, by dragging its title bar.
    pub fn user_move(&self, id: &NoteId, rect: Rect) -> bool {
        self.window(id).map(|w| w.set_rect(rect)).is_some()
    }

    /// Close a window as the user would. The session reports `note:closed`.
    pub fn user_close(&self, id: &NoteId) -> bool {
        let Some(hosted) = self.windows.lock().remove(&id.window_label()) else {
            return false;
        };
        let reported = hosted.session.close();
        hosted.window.close();
        reported
    }

    #[must_use]
    pub fn calls(&self) -> Vec<HostCall> { self.calls.lock().clone() }

    #[must_use]
    pub fn spawn_count(&self, id: &NoteId) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, HostCall::Spawn { id: spawned, .. } if spawned == id))
            .count()
    }

    fn record(&self, call: HostCall) { self.calls.lock().push(call); }
}

impl WindowHost for HeadlessHost {
    async fn spawn_window(&self, request: SpawnRequest) -> Result<(), HostError> {
        self.record(HostCall::Spawn { id: request.id.clone(), rect: request.rect });
        let options = *self.options.lock();
        if options.fail_spawn {
            return Err(HostError::Rejected(format!("spawn disabled for {}", request.label)));
        }

        let window = Arc::new(VirtualWindow::new(request.label.clone(), request.rect));
        let session =
            NoteWindowSession::spawn(request.id.clone(), window.clone(), self.bus.clone(), options.session);

        // A retry replaces the previous attempt without reporting a close.
        if let Some(previous) = self.windows.lock().insert(request.label, HostedWindow { window, session }) {
            previous.window.close();
            previous.session.detach();
        }
        tracing::debug!(id = %request.id, "headless: window spawned");
        Ok(())
    }

    async fn focus_window(&self, id: NoteId) -> Result<(), HostError> {
        self.record(HostCall::Focus { id: id.clone() });
        let session = self.session(&id).ok_or_else(|| HostError::NotFound(id.window_label()))?;
        session.focus();
        Ok(())
    }

    async fn close_window(&self, id: NoteId) -> Result<(), HostError> {
        self.record(HostCall::Close { id: id.clone() });
        let hosted = self
            .windows
            .lock()
            .remove(&id.window_label())
            .ok_or_else(|| HostError::NotFound(id.window_label()))?;
        // Hub-commanded closes never come back as `note:closed`.
        hosted.session.detach();
        hosted.window.close();
        Ok(())
    }

    async fn set_window_rect(&self, id: NoteId, rect: Rect) -> Result<(), HostError> {
        self.record(HostCall::SetRect { id: id.clone(), rect });
        let window = self.window(&id).ok_or_else(|| HostError::NotFound(id.window_label()))?;
        window.set_rect(rect);
        Ok(())
    }

    async fn enumerate_windows(&self) -> Result<Vec<ExternalSnapshot>, HostError> {
        self.record(HostCall::Enumerate);
        Ok(self.externals.lock().clone())
    }

    async fn move_external_window(&self, native_handle: String, rect: Rect) -> Result<(), HostError> {
        self.record(HostCall::MoveExternal { native_handle: native_handle.clone(), rect });
        let mut externals = self.externals.lock();
        let external = externals
            .iter_mut()
            .find(|e| e.native_handle == native_handle)
            .ok_or(HostError::NotFound(native_handle))?;
        external.rect = rect;
        Ok(())
    }
}

/// [`LayoutGateway`] holding the document in memory.
#[derive(Debug, Default)]
pub struct MemoryLayout {
    document: Mutex<Option<String>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryLayout {
    #[must_use]
    pub fn with_document(document: impl Into<String>) -> Self {
        Self { document: Mutex::new(Some(document.into())), ..Self::default() }
    }

    /// Make subsequent writes fail.
    pub fn set_fail_writes(&self, fail: bool) { self.fail_writes.store(fail, Ordering::Release); }

    #[must_use]
    pub fn document(&self) -> Option<String> { self.document.lock().clone() }

    /// Number of successful writes.
    #[must_use]
    pub fn writes(&self) -> usize { self.writes.load(Ordering::Acquire) }
}

impl LayoutGateway for MemoryLayout {
    async fn persist(&self, document: String) -> Result<(), HostError> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(HostError::Storage("disk full".into()));
        }
        *self.document.lock() = Some(document);
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn load(&self) -> Result<Option<String>, HostError> { Ok(self.document()) }
}
