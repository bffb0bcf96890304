//! Buffer store: the pluggable bounded FIFO a buffer stage wraps.

use async_trait::async_trait;

use crate::core::message::Message;
use crate::error::CoreError;

/// Outcome of a [`Store::next_message`] call.
pub enum NextOutcome {
    /// The oldest enqueued message. Still present in the store until
    /// [`Store::shift_message`] is called for it.
    Message(Message),
    /// No further pushes will occur (`close_once_empty` was called) and the
    /// queue has fully drained.
    EndOfInput,
}

/// A bounded FIFO of messages, safe for exactly one concurrent producer and
/// one concurrent consumer. This is the seam at which a real implementation
/// would plug in a disk-backed or externally-hosted queue; the core ships
/// one in-process implementation, [`super::memory::MemoryStore`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Enqueues `message`. Blocks until enough capacity is available, or
    /// fails if the store has been asked to reject it outright (for a
    /// byte-bounded store, this never happens — pushes always eventually
    /// succeed once space frees up).
    async fn push_message(&self, message: Message) -> Result<usize, CoreError>;

    /// Returns the oldest enqueued message. Blocks until one is available,
    /// until input-closure has drained the queue (`EndOfInput`), or returns
    /// `TypeClosed` if the store has been closed outright.
    async fn next_message(&self) -> Result<NextOutcome, CoreError>;

    /// Pops the oldest message, releasing the bytes it held. Called after
    /// the downstream consumer has acknowledged it — never before.
    async fn shift_message(&self) -> Result<usize, CoreError>;

    /// Marks that no further pushes will occur; `next_message` returns
    /// `EndOfInput` once the queue drains instead of blocking forever.
    async fn close_once_empty(&self);

    /// Immediate shutdown. In-flight and future reads/writes return
    /// `TypeClosed`.
    async fn close(&self);
}
