//! Transaction: a message bundled with a single-shot reply channel.
//!
//! The `reply_to` half of a transaction is a [`tokio::sync::oneshot`] pair:
//! exactly one send, exactly one receive, never closed explicitly by either
//! side. This is the idiomatic Rust substitute for the reference design's
//! private response channel — a future/promise with the same
//! select-against-close behaviour preserved.

use crate::core::message::Message;
use crate::core::response::Response;
use tokio::sync::oneshot;

/// An immutable `(payload, reply_to)` pair flowing downstream through a
/// pipeline of stages.
#[derive(Debug)]
pub struct Transaction {
    pub payload: Message,
    pub reply_to: oneshot::Sender<Response>,
}

impl Transaction {
    /// Creates a transaction for `payload`, returning it alongside the
    /// receiving half of its private reply channel.
    pub fn new(payload: Message) -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        (
            Transaction {
                payload,
                reply_to: tx,
            },
            rx,
        )
    }

    /// Sends `response` on this transaction's reply channel. Consumes the
    /// transaction since a reply can only be sent once.
    ///
    /// Returns the response back on failure (the receiver was dropped,
    /// typically because the originator gave up or the process is shutting
    /// down) so the caller can decide how to log or discard it.
    pub fn respond(self, response: Response) -> Result<(), Response> {
        self.reply_to.send(response)
    }
}
