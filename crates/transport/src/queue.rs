//! Bounded per-connection queues.
//!
//! The ingress queue (inbound audio) drops the oldest frame on overflow so a
//! slow consumer never blocks the socket read loop. The egress queue drops
//! the newest item instead: a full egress queue means the client can't keep
//! up, and a disconnected or stalled client must never stall the pipeline
//! that's trying to send it audio.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::frame::EgressItem;

/// Minimum gap between "egress queue full" warnings, so a sustained stall
/// doesn't spam the log once per dropped frame.
const EGRESS_DROP_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Bounded, drop-oldest queue for inbound audio frames.
pub struct IngressQueue<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    buf: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
    dropped: std::sync::atomic::AtomicU64,
}

impl<T> Clone for IngressQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> IngressQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                buf: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
                capacity,
                notify: Notify::new(),
                dropped: std::sync::atomic::AtomicU64::new(0),
            }),
        }
    }

    /// Push a frame, dropping the oldest queued frame if the queue is full.
    pub fn push(&self, item: T) {
        let mut buf = self.inner.buf.lock();
        if buf.len() >= self.inner.capacity {
            buf.pop_front();
            self.inner
                .dropped
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        buf.push_back(item);
        drop(buf);
        self.inner.notify.notify_one();
    }

    /// Pop the oldest frame, waiting if the queue is currently empty.
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.inner.buf.lock().pop_front() {
                return item;
            }
            self.inner.notify.notified().await;
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        self.inner.buf.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Bounded egress channel: a full queue drops the newest item rather than
/// blocking the producer.
pub fn egress_channel(bound: usize) -> (EgressSender, EgressReceiver) {
    let (tx, rx) = tokio::sync::mpsc::channel(bound);
    let inner = Arc::new(EgressInner {
        tx,
        dropped: AtomicU64::new(0),
        last_drop_log: Mutex::new(None),
    });
    (EgressSender { inner }, EgressReceiver { rx })
}

struct EgressInner {
    tx: tokio::sync::mpsc::Sender<EgressItem>,
    dropped: AtomicU64,
    last_drop_log: Mutex<Option<std::time::Instant>>,
}

#[derive(Clone)]
pub struct EgressSender {
    inner: Arc<EgressInner>,
}

impl EgressSender {
    /// Drops `item` and returns `Ok(())` if the queue is full, logging at
    /// most once per [`EGRESS_DROP_LOG_INTERVAL`]. Only a closed receiver
    /// (connection torn down) is an error.
    pub async fn send(&self, item: EgressItem) -> crate::error::Result<()> {
        match self.inner.tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.inner.dropped.fetch_add(1, Ordering::Relaxed) + 1;

                let now = std::time::Instant::now();
                let mut last_log = self.inner.last_drop_log.lock();
                let should_log = last_log
                    .map(|t| now.duration_since(t) >= EGRESS_DROP_LOG_INTERVAL)
                    .unwrap_or(true);
                if should_log {
                    tracing::warn!(dropped, "egress queue full, dropping frame");
                    *last_log = Some(now);
                }

                Ok(())
            },
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                Err(crate::error::TransportError::Closed)
            },
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

pub struct EgressReceiver {
    rx: tokio::sync::mpsc::Receiver<EgressItem>,
}

impl EgressReceiver {
    pub async fn recv(&mut self) -> Option<EgressItem> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<EgressItem, tokio::sync::mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingress_drops_oldest_on_overflow() {
        let q: IngressQueue<u32> = IngressQueue::new(2);
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.len(), 2);
        assert_eq!(q.dropped_count(), 1);
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), Some(3));
    }

    #[tokio::test]
    async fn test_ingress_pop_waits_for_push() {
        let q: IngressQueue<u32> = IngressQueue::new(4);
        let q2 = q.clone();
        let handle = tokio::spawn(async move { q2.pop().await });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        q.push(42);
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_egress_channel_roundtrip() {
        let (tx, mut rx) = egress_channel(4);
        tx.send(EgressItem::binary(vec![1, 2, 3])).await.unwrap();
        let item = rx.recv().await.unwrap();
        assert!(item.is_binary());
    }

    #[tokio::test]
    async fn test_egress_drops_newest_on_overflow() {
        let (tx, mut rx) = egress_channel(1);
        tx.send(EgressItem::binary(vec![1])).await.unwrap();
        tx.send(EgressItem::binary(vec![2])).await.unwrap();
        assert_eq!(tx.dropped_count(), 1);

        let item = rx.recv().await.unwrap();
        match item {
            EgressItem::Binary(bytes) => assert_eq!(bytes.as_ref(), &[1]),
            EgressItem::Control(_) => panic!("expected binary item"),
        }
    }

    #[tokio::test]
    async fn test_egress_send_errors_once_receiver_dropped() {
        let (tx, rx) = egress_channel(1);
        drop(rx);
        let result = tx.send(EgressItem::binary(vec![1])).await;
        assert!(matches!(result, Err(crate::error::TransportError::Closed)));
    }
}
