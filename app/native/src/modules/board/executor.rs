//! Applies host-facing [`BoardEffect`]s.
//!
//! Each effect runs as its own task so a slow capability call never blocks
//! the hub. Results that the store needs to see are sent back into the hub
//! mailbox; the rest are logged.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::actor::HubMessage;
use super::effects::BoardEffect;
use crate::modules::host::WindowHost;

/// Runs host effects and reports results to the hub.
pub struct EffectExecutor<H> {
    host: Arc<H>,
    mailbox: mpsc::WeakSender<HubMessage>,
}

impl<H> Clone for EffectExecutor<H> {
    fn clone(&self) -> Self { Self { host: self.host.clone(), mailbox: self.mailbox.clone() } }
}

impl<H: WindowHost> EffectExecutor<H> {
    /// The executor holds only a weak reference to the mailbox, so it never
    /// keeps a stopped hub alive.
    pub const fn new(host: Arc<H>, mailbox: mpsc::WeakSender<HubMessage>) -> Self {
        Self { host, mailbox }
    }

    #[must_use]
    pub fn host(&self) -> &Arc<H> { &self.host }

    /// Start applying an effect.
    ///
    /// Effects that are not host work (bus emits, persistence, open
    /// outcomes) are handled by the hub itself and ignored here.
    pub fn execute(&self, effect: BoardEffect) {
        tracing::trace!(effect = effect.name(), "executor: running");
        let host = self.host.clone();
        let mailbox = self.mailbox.clone();

        match effect {
            BoardEffect::SpawnWindow { request, attempt } => {
                tokio::spawn(async move {
                    let id = request.id.clone();
                    let result = host.spawn_window(request).await;
                    report(&mailbox, HubMessage::SpawnResolved { id, attempt, result }).await;
                });
            }
            BoardEffect::ArmHandshakeTimer { id, attempt, timeout } => {
                tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    report(&mailbox, HubMessage::HandshakeTimeout { id, attempt }).await;
                });
            }
            BoardEffect::FocusWindow { id } => {
                tokio::spawn(async move {
                    if let Err(err) = host.focus_window(id.clone()).await {
                        tracing::warn!(%id, error = %err, "executor: focus failed");
                    }
                });
            }
            BoardEffect::CloseWindow { id } => {
                tokio::spawn(async move {
                    if let Err(err) = host.close_window(id.clone()).await {
                        tracing::warn!(%id, error = %err, "executor: close failed");
                    }
                });
            }
            BoardEffect::SetWindowRect { id, rect } => {
                tokio::spawn(async move {
                    let result = host.set_window_rect(id.clone(), rect).await;
                    report(&mailbox, HubMessage::RectApplied { id, result }).await;
                });
            }
            BoardEffect::MoveExternal { id, native_handle, rect } => {
                tokio::spawn(async move {
                    if let Err(err) = host.move_external_window(native_handle, rect).await {
                        tracing::warn!(%id, error = %err, "executor: external move failed");
                    }
                });
            }
            BoardEffect::RefreshExternals => {
                tokio::spawn(async move {
                    let result = host.enumerate_windows().await;
                    report(&mailbox, HubMessage::ExternalsEnumerated(result)).await;
                });
            }
            BoardEffect::Emit(_)
            | BoardEffect::OpenSettled { .. }
            | BoardEffect::SchedulePersist
            | BoardEffect::PersistNow => {
                tracing::debug!(effect = effect.name(), "executor: not a host effect, skipped");
            }
        }
    }
}

async fn report(mailbox: &mpsc::WeakSender<HubMessage>, msg: HubMessage) {
    let name = msg.name();
    let Some(sender) = mailbox.upgrade() else {
        tracing::debug!(msg = name, "executor: hub gone, result dropped");
        return;
    };
    if sender.send(msg).await.is_err() {
        tracing::debug!(msg = name, "executor: hub gone, result dropped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::modules::board::state::{NoteId, Rect};
    use crate::modules::bus::MessageBus;
    use crate::modules::host::SpawnRequest;
    use crate::modules::host::headless::{HeadlessHost, HeadlessOptions, HostCall};

    fn executor() -> (EffectExecutor<HeadlessHost>, mpsc::Receiver<HubMessage>, mpsc::Sender<HubMessage>) {
        let host = Arc::new(HeadlessHost::new(MessageBus::default(), HeadlessOptions::default()));
        let (tx, rx) = mpsc::channel(16);
        (EffectExecutor::new(host, tx.downgrade()), rx, tx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_reports_result() {
        let (executor, mut rx, _tx) = executor();
        executor.execute(BoardEffect::SpawnWindow {
            request: SpawnRequest::new(NoteId::new("a"), Rect::default()),
            attempt: 2,
        });

        match rx.recv().await {
            Some(HubMessage::SpawnResolved { id, attempt, result }) => {
                assert_eq!(id.as_str(), "a");
                assert_eq!(attempt, 2);
                assert!(result.is_ok());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timer_fires_after_timeout() {
        let (executor, mut rx, _tx) = executor();
        let start = tokio::time::Instant::now();
        executor.execute(BoardEffect::ArmHandshakeTimer {
            id: NoteId::new("a"),
            attempt: 1,
            timeout: Duration::from_secs(2),
        });

        assert!(matches!(rx.recv().await, Some(HubMessage::HandshakeTimeout { attempt: 1, .. })));
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rect_on_missing_window_reports_error() {
        let (executor, mut rx, _tx) = executor();
        executor.execute(BoardEffect::SetWindowRect { id: NoteId::new("ghost"), rect: Rect::default() });

        assert!(matches!(rx.recv().await, Some(HubMessage::RectApplied { result: Err(_), .. })));
        assert_eq!(executor.host().calls(), vec![HostCall::SetRect {
            id: NoteId::new("ghost"),
            rect: Rect::default()
        }]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_dropped_once_hub_is_gone() {
        let (executor, rx, tx) = executor();
        drop(rx);
        drop(tx);
        executor.execute(BoardEffect::RefreshExternals);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(executor.host().calls(), vec![HostCall::Enumerate]);
    }
}
