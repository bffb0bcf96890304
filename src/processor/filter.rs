use async_trait::async_trait;

use crate::core::message::Message;
use crate::core::response::Response;
use crate::processor::traits::{ProcessOutcome, Processor};

/// Drops messages failing a predicate. Content-based routing conditions
/// themselves are an external collaborator's concern (per the core's
/// component design); this processor is the minimal glue that turns a
/// predicate into a drop/pass decision.
pub struct FilterProcessor<P>
where
    P: FnMut(&Message) -> bool + Send + Sync,
{
    name: String,
    predicate: P,
    drop_reason: String,
}

impl<P> FilterProcessor<P>
where
    P: FnMut(&Message) -> bool + Send + Sync,
{
    /// `predicate` returning `true` means "keep"; `false` drops the message
    /// and acknowledges upstream with an error built from `drop_reason`.
    pub fn new(name: impl Into<String>, predicate: P, drop_reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            predicate,
            drop_reason: drop_reason.into(),
        }
    }
}

#[async_trait]
impl<P> Processor for FilterProcessor<P>
where
    P: FnMut(&Message) -> bool + Send + Sync,
{
    async fn process_message(&mut self, msg: Message) -> ProcessOutcome {
        if (self.predicate)(&msg) {
            ProcessOutcome::Emit(vec![msg])
        } else {
            tracing::debug!(processor = %self.name, reason = %self.drop_reason, "dropping message");
            ProcessOutcome::Drop(Response::error(anyhow::anyhow!(self.drop_reason.clone())))
        }
    }
}
