//! Processor interface: the external collaborator a pipeline stage wraps.

use async_trait::async_trait;

use crate::core::message::Message;
use crate::core::response::Response;

/// Result of processing a single message.
pub enum ProcessOutcome {
    /// The message (or messages it was split into) should continue
    /// downstream. Never empty — use `Drop` to discard a message.
    Emit(Vec<Message>),
    /// The message is discarded here. `response` is sent upstream as-is
    /// (it may itself carry an error explaining the drop, or be success if
    /// the processor intentionally filters with no error).
    Drop(Response),
}

/// A single-message transform. Processors are synchronous with respect to
/// the transactional substrate — any I/O they perform is their own concern —
/// and must not retain references to the input message after returning.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Processes one message, returning either its replacement(s) or a
    /// drop response.
    async fn process_message(&mut self, msg: Message) -> ProcessOutcome;
}
