//! Integration tests for the hub and its note windows.
//!
//! Every test runs the real actor, executor and window sessions against the
//! headless host, with the tokio clock paused so timers fire deterministically.
//!
//! ```bash
//! cargo test -p hinotes --test hub_integration
//! ```

use std::sync::Arc;
use std::time::Duration;

use hinotes_lib::events;
use hinotes_lib::modules::board::drag::DragOperation;
use hinotes_lib::modules::board::persistence;
use hinotes_lib::modules::board::state::{NoteId, Rect};
use hinotes_lib::modules::board::store::{OpenOutcome, SaveStatus, WindowPhase};
use hinotes_lib::modules::board::{HubActor, HubHandle, HubMessage, HubOptions};
use hinotes_lib::modules::bus::{BusSubscription, MessageBus};
use hinotes_lib::modules::host::headless::{HeadlessHost, HeadlessOptions, HostCall, MemoryLayout};
use hinotes_lib::modules::note_window::SessionOptions;

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    hub: HubHandle,
    host: Arc<HeadlessHost>,
    layout: Arc<MemoryLayout>,
    observer: BusSubscription,
}

fn start(options: HubOptions, host_options: HeadlessOptions) -> Harness {
    let bus = MessageBus::default();
    let observer = bus.subscribe();
    let host = Arc::new(HeadlessHost::new(bus.clone(), host_options));
    let layout = Arc::new(MemoryLayout::default());
    let hub = HubActor::spawn(options, host.clone(), layout.clone(), bus);
    Harness { hub, host, layout, observer }
}

fn start_default() -> Harness {
    start(HubOptions { open_on_start: false, ..HubOptions::default() }, HeadlessOptions::default())
}

fn id(s: &str) -> NoteId { NoteId::new(s) }

fn channels(observer: &mut BusSubscription) -> Vec<&'static str> {
    observer.drain().iter().map(|e| e.channel()).collect()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_opens_spawn_once() {
    let h = start_default();

    let (first, second) = tokio::join!(h.hub.open_note("note-2"), h.hub.open_note("note-2"));
    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|o| format!("{o:?}"));

    assert_eq!(outcomes, vec![OpenOutcome::InFlight, OpenOutcome::Opened]);
    assert_eq!(h.host.spawn_count(&id("note-2")), 1);
    assert_eq!(h.hub.window_phase("note-2").await.unwrap(), WindowPhase::Open);
    assert_eq!(h.hub.open_note("note-2").await.unwrap(), OpenOutcome::AlreadyOpen);
}

#[tokio::test(start_paused = true)]
async fn test_silent_window_retried_then_abandoned() {
    let session = SessionOptions { respond_ready: false, ..SessionOptions::default() };
    let h = start(
        HubOptions { open_on_start: false, ..HubOptions::default() },
        HeadlessOptions { fail_spawn: false, session },
    );

    assert_eq!(h.hub.open_note("note-1").await.unwrap(), OpenOutcome::TimedOut);
    assert_eq!(h.host.spawn_count(&id("note-1")), 2);
    assert_eq!(h.hub.window_phase("note-1").await.unwrap(), WindowPhase::Closed);
    assert!(!h.hub.note("note-1").await.unwrap().unwrap().is_open);

    // The zombie window is closed, not left on screen.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.host.calls().contains(&HostCall::Close { id: id("note-1") }));
    assert_eq!(h.host.open_windows(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_spawn_fails_open() {
    let h = start(
        HubOptions { open_on_start: false, ..HubOptions::default() },
        HeadlessOptions { fail_spawn: true, session: SessionOptions::default() },
    );

    let outcome = h.hub.open_note("note-3").await.unwrap();
    assert!(matches!(outcome, OpenOutcome::Failed(_)));
    assert!(!h.hub.note("note-3").await.unwrap().unwrap().is_open);
}

#[tokio::test(start_paused = true)]
async fn test_user_close_marks_note_closed() {
    let h = start_default();
    h.hub.open_note("note-1").await.unwrap();

    assert!(h.host.user_close(&id("note-1")));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!h.hub.note("note-1").await.unwrap().unwrap().is_open);
    assert_eq!(h.hub.window_phase("note-1").await.unwrap(), WindowPhase::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_close_then_reopen_keeps_new_window() {
    let h = start_default();
    h.hub.open_note("note-1").await.unwrap();

    h.hub.send_async(HubMessage::CloseNote { id: id("note-1") }).await.unwrap();
    assert_eq!(h.hub.open_note("note-1").await.unwrap(), OpenOutcome::Opened);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(h.hub.window_phase("note-1").await.unwrap(), WindowPhase::Open);
    assert!(h.hub.note("note-1").await.unwrap().unwrap().is_open);
    assert!(h.host.window(&id("note-1")).is_some());
    assert_eq!(h.host.spawn_count(&id("note-1")), 2);
    assert_eq!(h.host.open_windows(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_twice_reopens() {
    let h = start_default();
    h.hub.open_note("note-2").await.unwrap();

    h.hub.send_async(HubMessage::ToggleNote { id: id("note-2") }).await.unwrap();
    h.hub.send_async(HubMessage::ToggleNote { id: id("note-2") }).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(h.hub.window_phase("note-2").await.unwrap(), WindowPhase::Open);
    assert!(h.hub.note("note-2").await.unwrap().unwrap().is_open);
    assert_eq!(h.host.open_windows(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_layout_reopens_open_notes() {
    let h = start_default();
    h.hub.open_note("note-1").await.unwrap();

    h.hub.send_async(HubMessage::ResetLayout).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let board = h.hub.board().await.unwrap();
    assert_eq!(board.open_count(), board.notes.len());
    assert_eq!(h.host.open_windows(), board.notes.len());
    assert!(board.note("note-1").unwrap().is_open);
}

#[tokio::test(start_paused = true)]
async fn test_reopen_after_abandoned_handshake() {
    let silent = SessionOptions { respond_ready: false, ..SessionOptions::default() };
    let h = start(
        HubOptions { open_on_start: false, ..HubOptions::default() },
        HeadlessOptions { fail_spawn: false, session: silent },
    );
    assert_eq!(h.hub.open_note("note-5").await.unwrap(), OpenOutcome::TimedOut);

    h.host.set_options(HeadlessOptions::default());
    assert_eq!(h.hub.open_note("note-5").await.unwrap(), OpenOutcome::Opened);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(h.hub.window_phase("note-5").await.unwrap(), WindowPhase::Open);
    assert!(h.host.window(&id("note-5")).is_some());
    assert_eq!(h.host.spawn_count(&id("note-5")), 3);
}

#[tokio::test(start_paused = true)]
async fn test_open_on_start_opens_every_note() {
    let h = start(HubOptions { open_on_start: true, ..HubOptions::default() }, HeadlessOptions::default());
    tokio::time::sleep(Duration::from_millis(200)).await;

    let board = h.hub.board().await.unwrap();
    assert_eq!(board.open_count(), board.notes.len());
    assert_eq!(h.host.open_windows(), board.notes.len());
}

// ============================================================================
// Geometry sync
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_commit_drag_suppresses_window_echo() {
    let mut options = HubOptions { open_on_start: false, ..HubOptions::default() };
    options.store.echo_block = Duration::from_secs(2);
    let mut h = start(options, HeadlessOptions::default());
    h.hub.open_note("note-1").await.unwrap();
    let origin = h.hub.note("note-1").await.unwrap().unwrap().rect;

    h.hub.send_async(HubMessage::BeginDrag { id: id("note-1"), operation: DragOperation::Move }).await.unwrap();
    h.hub.send_async(HubMessage::DragBy { id: id("note-1"), dx: 80.0, dy: 40.0, free: true }).await.unwrap();
    h.hub.send_async(HubMessage::CommitDrag { id: id("note-1") }).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let target = Rect::new(origin.x + 80.0, origin.y + 40.0, origin.width, origin.height);
    assert_eq!(h.host.window(&id("note-1")).unwrap().rect(), target);
    h.observer.drain();

    // The OS reports a stale intermediate position while the block is armed.
    let stale = Rect::new(origin.x + 30.0, origin.y + 10.0, origin.width, origin.height);
    h.host.user_move(&id("note-1"), stale);
    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert!(channels(&mut h.observer).contains(&events::note::MOVED));
    assert_eq!(h.hub.note("note-1").await.unwrap().unwrap().rect, target);

    // Once the block expires, user moves are accepted again.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let moved = Rect::new(origin.x + 200.0, origin.y, origin.width, origin.height);
    h.host.user_move(&id("note-1"), moved);
    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(h.hub.note("note-1").await.unwrap().unwrap().rect, moved);
}

#[tokio::test(start_paused = true)]
async fn test_user_move_is_persisted() {
    let h = start_default();
    h.hub.open_note("note-2").await.unwrap();
    let mut rect = h.hub.note("note-2").await.unwrap().unwrap().rect;
    rect.y += 120.0;

    h.host.user_move(&id("note-2"), rect);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let saved = persistence::decode(&h.layout.document().unwrap()).unwrap();
    assert_eq!(saved.note("note-2").unwrap().rect, rect);
}

// ============================================================================
// Content and persistence
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_content_edit_reaches_board_and_disk() {
    let mut h = start_default();
    h.hub.open_note("note-4").await.unwrap();
    let session = h.host.session(&id("note-4")).unwrap();
    session.wait_hydrated().await;
    h.observer.drain();

    session.edit_content("draft");
    session.edit_content("final text");
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(h.hub.note("note-4").await.unwrap().unwrap().content, "final text");
    let status = h.hub.flush().await.unwrap();
    assert!(matches!(status, SaveStatus::Saved { .. }));

    let seen = channels(&mut h.observer);
    assert_eq!(seen.iter().filter(|c| **c == events::note::CONTENT_CHANGED).count(), 1);
    assert!(seen.contains(&events::persist::OK));

    let saved = persistence::decode(&h.layout.document().unwrap()).unwrap();
    assert_eq!(saved.note("note-4").unwrap().content, "final text");
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_is_reported_on_bus() {
    let mut h = start_default();
    h.layout.set_fail_writes(true);
    h.hub.send_async(HubMessage::ToggleSnapToGrid).await.unwrap();

    let status = h.hub.flush().await.unwrap();
    assert!(matches!(status, SaveStatus::Failed { .. }));
    assert!(channels(&mut h.observer).contains(&events::persist::FAIL));

    h.layout.set_fail_writes(false);
    assert!(matches!(h.hub.flush().await.unwrap(), SaveStatus::Saved { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_overlay_follows_board_changes() {
    let mut h = start_default();
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.observer.drain();

    h.hub.send_async(HubMessage::ToggleSidebar).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(channels(&mut h.observer).contains(&events::overlay::STATE_SYNC));
}

// ============================================================================
// Delete and undo
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_delete_and_undo() {
    let h = start_default();
    h.hub.open_note("note-1").await.unwrap();
    let before = h.hub.board().await.unwrap();
    assert!(before.links.values().any(|l| l.references("note-1")));

    h.hub.send_async(HubMessage::DeleteNote { id: id("note-1") }).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let deleted = h.hub.board().await.unwrap();
    assert!(deleted.note("note-1").is_none());
    assert!(!deleted.links.values().any(|l| l.references("note-1")));
    assert!(h.host.window(&id("note-1")).is_none());

    h.hub.send_async(HubMessage::UndoDelete).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let restored = h.hub.board().await.unwrap();
    assert!(restored.note("note-1").unwrap().is_open);
    assert_eq!(restored.links.len(), deleted.links.len());
    assert_eq!(h.host.spawn_count(&id("note-1")), 2);
}

#[tokio::test(start_paused = true)]
async fn test_undo_immediately_after_delete_reopens() {
    let h = start_default();
    h.hub.open_note("note-1").await.unwrap();

    h.hub.send_async(HubMessage::DeleteNote { id: id("note-1") }).await.unwrap();
    h.hub.send_async(HubMessage::UndoDelete).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(h.hub.note("note-1").await.unwrap().unwrap().is_open);
    assert_eq!(h.hub.window_phase("note-1").await.unwrap(), WindowPhase::Open);
    assert!(h.host.window(&id("note-1")).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_writes_pending_save() {
    let h = start_default();
    h.hub.create_note(Default::default()).await.unwrap();
    h.hub.shutdown().await.unwrap();

    assert_eq!(h.layout.writes(), 1);
    assert!(h.hub.is_closed());
}
