//! One live connection of a delivery session

use std::sync::Mutex;
use std::time::Duration;

use chat_core::{ChatEvent, SseFrame};
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use uuid::Uuid;

/// Item on a connection's queue.
#[derive(Debug, Clone)]
pub enum Envelope {
    Event(ChatEvent),
    /// Sentinel that unblocks and ends the delivery loop.
    Close,
}

/// Registry-side record of a connection: the sending half of its queue
/// plus the liveness bookkeeping the probe reads.
#[derive(Debug)]
pub(crate) struct Connection {
    pub id: Uuid,
    sender: mpsc::UnboundedSender<Envelope>,
    last_pong: Mutex<Instant>,
}

impl Connection {
    pub fn new(id: Uuid, sender: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            id,
            sender,
            last_pong: Mutex::new(Instant::now()),
        }
    }

    /// Enqueue an item; false when the receiving loop is gone.
    pub fn send(&self, envelope: Envelope) -> bool {
        self.sender.send(envelope).is_ok()
    }

    pub fn mark_pong(&self) {
        *self.last_pong.lock().unwrap() = Instant::now();
    }

    pub fn last_pong(&self) -> Instant {
        *self.last_pong.lock().unwrap()
    }
}

/// Receiving half handed to the transport: the delivery loop for one
/// connection. FIFO in enqueue order; a timed-out wait yields a
/// keepalive so intermediaries keep the transport open.
pub struct ConnectionHandle {
    pub session_key: String,
    pub connection_id: Uuid,
    pub(crate) receiver: mpsc::UnboundedReceiver<Envelope>,
    pub(crate) keepalive: Duration,
}

impl ConnectionHandle {
    /// Wait for the next frame to put on the wire. Suspension happens
    /// exactly here.
    pub async fn next_frame(&mut self) -> SseFrame {
        match timeout(self.keepalive, self.receiver.recv()).await {
            Ok(Some(Envelope::Event(event))) => SseFrame::Event(event),
            Ok(Some(Envelope::Close)) | Ok(None) => SseFrame::Done,
            Err(_) => SseFrame::Keepalive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(keepalive: Duration) -> (ConnectionHandle, mpsc::UnboundedSender<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ConnectionHandle {
                session_key: "s1".into(),
                connection_id: Uuid::new_v4(),
                receiver: rx,
                keepalive,
            },
            tx,
        )
    }

    #[tokio::test]
    async fn frames_preserve_enqueue_order() {
        let (mut handle, tx) = handle(Duration::from_secs(5));
        tx.send(Envelope::Event(ChatEvent::LoadingStart {
            chat_id: Uuid::nil(),
        }))
        .unwrap();
        tx.send(Envelope::Event(ChatEvent::LoadingEnd {
            chat_id: Uuid::nil(),
        }))
        .unwrap();

        assert!(matches!(
            handle.next_frame().await,
            SseFrame::Event(ChatEvent::LoadingStart { .. })
        ));
        assert!(matches!(
            handle.next_frame().await,
            SseFrame::Event(ChatEvent::LoadingEnd { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_queue_yields_keepalive() {
        let (mut handle, _tx) = handle(Duration::from_secs(30));
        assert_eq!(handle.next_frame().await, SseFrame::Keepalive);
    }

    #[tokio::test]
    async fn close_sentinel_ends_the_loop() {
        let (mut handle, tx) = handle(Duration::from_secs(5));
        tx.send(Envelope::Close).unwrap();
        assert_eq!(handle.next_frame().await, SseFrame::Done);
    }

    #[tokio::test]
    async fn dropped_sender_ends_the_loop() {
        let (mut handle, tx) = handle(Duration::from_secs(5));
        drop(tx);
        assert_eq!(handle.next_frame().await, SseFrame::Done);
    }
}
