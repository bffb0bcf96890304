use async_trait::async_trait;

use crate::core::message::Message;
use crate::processor::traits::{ProcessOutcome, Processor};

/// Applies a pure transform to every message that passes through. Stands in
/// for the teacher's per-field `scale`/`lowpass` processors, generalised to
/// operate on the whole message instead of a single named JSON field.
pub struct MapProcessor<F>
where
    F: FnMut(Message) -> Message + Send + Sync,
{
    name: String,
    transform: F,
}

impl<F> MapProcessor<F>
where
    F: FnMut(Message) -> Message + Send + Sync,
{
    pub fn new(name: impl Into<String>, transform: F) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }
}

#[async_trait]
impl<F> Processor for MapProcessor<F>
where
    F: FnMut(Message) -> Message + Send + Sync,
{
    async fn process_message(&mut self, msg: Message) -> ProcessOutcome {
        tracing::trace!(processor = %self.name, "mapping message");
        ProcessOutcome::Emit(vec![(self.transform)(msg)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_map_applies_transform() {
        let mut proc = MapProcessor::new("upper", |mut m: Message| {
            let upper: Vec<u8> = m
                .get(0)
                .map(|p| p.to_ascii_uppercase())
                .unwrap_or_default();
            m = Message::from_parts(vec![upper]);
            m
        });

        match proc
            .process_message(Message::from_parts(vec![&b"hello"[..]]))
            .await
        {
            ProcessOutcome::Emit(msgs) => {
                assert_eq!(msgs.len(), 1);
                assert_eq!(msgs[0].get(0).unwrap().as_ref(), b"HELLO");
            }
            ProcessOutcome::Drop(_) => panic!("expected emit"),
        }
    }
}
