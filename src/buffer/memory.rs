//! In-process, byte-bounded FIFO store — the one concrete [`Store`]
//! implementation the core ships, the async/Rust translation of the
//! reference design's memory buffer.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::buffer::store::{NextOutcome, Store};
use crate::core::message::Message;
use crate::error::CoreError;

struct Inner {
    queue: VecDeque<Message>,
    used_bytes: usize,
    closed: bool,
    closing: bool,
}

/// A `VecDeque`-backed store bounded by total bytes used, not item count.
/// `push_message` blocks until enough bytes are freed by `shift_message`
/// rather than rejecting the push outright — the behaviour the buffer
/// wrapper's backpressure relies on (see the wrapper module docs).
pub struct MemoryStore {
    capacity_bytes: usize,
    inner: Mutex<Inner>,
    space_freed: Notify,
    message_available: Notify,
}

impl MemoryStore {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                used_bytes: 0,
                closed: false,
                closing: false,
            }),
            space_freed: Notify::new(),
            message_available: Notify::new(),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn push_message(&self, message: Message) -> Result<usize, CoreError> {
        let size = message.byte_size();
        let mut message = Some(message);
        loop {
            {
                let mut inner = self.inner.lock().await;
                if inner.closed {
                    return Err(CoreError::TypeClosed);
                }
                if inner.used_bytes + size <= self.capacity_bytes {
                    inner.used_bytes += size;
                    inner.queue.push_back(message.take().unwrap());
                    let used = inner.used_bytes;
                    drop(inner);
                    self.message_available.notify_one();
                    return Ok(used);
                }
            }
            self.space_freed.notified().await;
        }
    }

    async fn next_message(&self) -> Result<NextOutcome, CoreError> {
        loop {
            {
                let inner = self.inner.lock().await;
                if inner.closed {
                    return Err(CoreError::TypeClosed);
                }
                if let Some(msg) = inner.queue.front() {
                    return Ok(NextOutcome::Message(msg.clone()));
                }
                if inner.closing {
                    return Ok(NextOutcome::EndOfInput);
                }
            }
            self.message_available.notified().await;
        }
    }

    async fn shift_message(&self) -> Result<usize, CoreError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(CoreError::TypeClosed);
        }
        let freed = match inner.queue.pop_front() {
            Some(msg) => {
                let size = msg.byte_size();
                inner.used_bytes = inner.used_bytes.saturating_sub(size);
                size
            }
            None => 0,
        };
        drop(inner);
        self.space_freed.notify_one();
        Ok(freed)
    }

    async fn close_once_empty(&self) {
        let mut inner = self.inner.lock().await;
        inner.closing = true;
        drop(inner);
        self.message_available.notify_waiters();
    }

    async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        drop(inner);
        self.message_available.notify_waiters();
        self.space_freed.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let store = MemoryStore::new(1024);
        store
            .push_message(Message::from_parts(vec![&b"a"[..]]))
            .await
            .unwrap();
        store
            .push_message(Message::from_parts(vec![&b"b"[..]]))
            .await
            .unwrap();

        match store.next_message().await.unwrap() {
            NextOutcome::Message(m) => assert_eq!(m.get(0).unwrap().as_ref(), b"a"),
            NextOutcome::EndOfInput => panic!("expected message"),
        }
        store.shift_message().await.unwrap();
        match store.next_message().await.unwrap() {
            NextOutcome::Message(m) => assert_eq!(m.get(0).unwrap().as_ref(), b"b"),
            NextOutcome::EndOfInput => panic!("expected message"),
        }
    }

    #[tokio::test]
    async fn test_next_message_is_monotonic_until_shift() {
        let store = MemoryStore::new(1024);
        store
            .push_message(Message::from_parts(vec![&b"a"[..]]))
            .await
            .unwrap();

        for _ in 0..3 {
            match store.next_message().await.unwrap() {
                NextOutcome::Message(m) => assert_eq!(m.get(0).unwrap().as_ref(), b"a"),
                NextOutcome::EndOfInput => panic!("expected message"),
            }
        }
    }

    #[tokio::test]
    async fn test_close_once_empty_drains_then_ends() {
        let store = MemoryStore::new(1024);
        store
            .push_message(Message::from_parts(vec![&b"a"[..]]))
            .await
            .unwrap();
        store.close_once_empty().await;

        match store.next_message().await.unwrap() {
            NextOutcome::Message(_) => {}
            NextOutcome::EndOfInput => panic!("queue not drained yet"),
        }
        store.shift_message().await.unwrap();

        match store.next_message().await.unwrap() {
            NextOutcome::EndOfInput => {}
            NextOutcome::Message(_) => panic!("expected end of input"),
        }
    }

    #[tokio::test]
    async fn test_close_unblocks_waiters_with_type_closed() {
        let store = std::sync::Arc::new(MemoryStore::new(1024));
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.next_message().await })
        };
        tokio::task::yield_now().await;
        store.close().await;
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(CoreError::TypeClosed)));
    }

    #[tokio::test]
    async fn test_push_blocks_until_space_freed() {
        let store = std::sync::Arc::new(MemoryStore::new(4));
        store
            .push_message(Message::from_parts(vec![vec![0u8; 4]]))
            .await
            .unwrap();

        let store2 = store.clone();
        let pending = tokio::spawn(async move {
            store2
                .push_message(Message::from_parts(vec![vec![0u8; 4]]))
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        store.shift_message().await.unwrap();
        tokio::time::timeout(std::time::Duration::from_millis(100), pending)
            .await
            .expect("push should unblock once space is freed")
            .unwrap()
            .unwrap();
    }
}
