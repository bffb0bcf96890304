//! Stage interface: the contract every source, processor, buffer and sink
//! implements some subset of.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::core::close::CloseSignal;
use crate::core::transaction::Transaction;
use crate::error::CoreError;

/// Default capacity of the bounded channel used for a stage's transaction
/// stream. The reference design specifies an unbuffered rendezvous; a
/// bounded channel of size zero is the direct `tokio::mpsc` equivalent, but
/// a small buffer avoids pointless context-switch churn under load without
/// weakening the ack-exactness guarantees the size is irrelevant to.
pub const TRANSACTION_CHAN_CAPACITY: usize = 1;

/// Lifecycle every stage supports: non-blocking idempotent close, and a
/// bounded wait for the worker to actually terminate.
///
/// Implementors expose their [`CloseSignal`] so the default methods can be
/// shared rather than hand-rolled per stage.
pub trait Stage: Send + Sync {
    fn close_signal(&self) -> &CloseSignal;

    /// Signals shutdown without blocking. Idempotent.
    fn close_async(&self) {
        self.close_signal().close_async();
    }

    /// Blocks until the stage's worker has terminated or `timeout` elapses.
    fn wait_for_close(
        &self,
        timeout: Duration,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), CoreError>> + Send + '_>>
    {
        Box::pin(self.close_signal().wait_for_close(timeout))
    }
}

/// Consumer capability: a stage that accepts an upstream transaction stream.
pub trait Consumer: Stage {
    /// Binds `input` as this stage's source of transactions and starts its
    /// worker task. May be called at most once.
    fn start_receiving(&mut self, input: mpsc::Receiver<Transaction>) -> Result<(), CoreError>;
}

/// Producer capability: a stage that emits a downstream transaction stream.
pub trait Producer: Stage {
    /// Returns this stage's output stream. The stream closes when, and only
    /// when, the stage has finished draining and will emit no more
    /// transactions. May be taken at most once; subsequent calls return
    /// `None`.
    fn transaction_chan(&mut self) -> Option<mpsc::Receiver<Transaction>>;
}
