//! Buffer/output wrapper stage: wraps a [`Store`] into a stage with two
//! concurrent workers — an input worker that acks on successful enqueue, and
//! an output worker that replays the store downstream and surfaces delivery
//! failures on an errors side-channel instead of retrying them.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::buffer::store::{NextOutcome, Store};
use crate::core::close::CloseSignal;
use crate::core::response::{ErrorBatch, Response};
use crate::core::stage::{Consumer, Producer, Stage, TRANSACTION_CHAN_CAPACITY};
use crate::core::transaction::Transaction;
use crate::error::CoreError;

/// Capacity of the errors side-channel. Bounded so a slow or absent
/// observer cannot make the output worker's error reporting unbounded, but
/// large enough that a burst of failures doesn't itself become a source of
/// backpressure on delivery.
const ERRORS_CHAN_CAPACITY: usize = 64;

pub struct BufferStage {
    close: CloseSignal,
    store: Arc<dyn Store>,
    messages_out_tx: Option<mpsc::Sender<Transaction>>,
    messages_out_rx: Option<mpsc::Receiver<Transaction>>,
    errors_tx: Option<mpsc::Sender<ErrorBatch>>,
    errors_rx: Option<mpsc::Receiver<ErrorBatch>>,
    started: bool,
}

impl BufferStage {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let (out_tx, out_rx) = mpsc::channel(TRANSACTION_CHAN_CAPACITY);
        let (err_tx, err_rx) = mpsc::channel(ERRORS_CHAN_CAPACITY);
        Self {
            close: CloseSignal::new(),
            store,
            messages_out_tx: Some(out_tx),
            messages_out_rx: Some(out_rx),
            errors_tx: Some(err_tx),
            errors_rx: Some(err_rx),
            started: false,
        }
    }

    /// Returns the errors side-channel. Aggregates delivery errors observed
    /// by the output worker; orthogonal to the transactional ack path. May
    /// be taken at most once.
    pub fn errors_chan(&mut self) -> Option<mpsc::Receiver<ErrorBatch>> {
        self.errors_rx.take()
    }
}

impl Stage for BufferStage {
    fn close_signal(&self) -> &CloseSignal {
        &self.close
    }
}

impl Producer for BufferStage {
    fn transaction_chan(&mut self) -> Option<mpsc::Receiver<Transaction>> {
        self.messages_out_rx.take()
    }
}

impl Consumer for BufferStage {
    fn start_receiving(&mut self, input: mpsc::Receiver<Transaction>) -> Result<(), CoreError> {
        if self.started {
            return Err(CoreError::AlreadyStarted);
        }
        self.started = true;

        let store = self.store.clone();
        let out_tx = self
            .messages_out_tx
            .take()
            .expect("sender is only taken once, on the first start_receiving call");
        let errors_tx = self
            .errors_tx
            .take()
            .expect("errors sender is only taken once, on the first start_receiving call");
        let close = self.close.clone();
        let close_done = self.close.clone();

        tokio::spawn(async move {
            tokio::join!(
                input_worker(input, store.clone(), close),
                output_worker(store, out_tx, errors_tx),
            );
            close_done.mark_done();
        });

        Ok(())
    }
}

/// For each incoming transaction, pushes its payload to the store and acks
/// the producer on successful enqueue — the critical ack-on-enqueue design
/// choice, independent of whether the message has reached the sink yet.
///
/// On `CloseAsync` this stops accepting new input and marks the store
/// closed-once-empty, the same signal a natural input-stream closure sends
/// — whatever is already queued must still reach the output worker and be
/// drained before the downstream stream closes. A transaction that is
/// mid-push when shutdown is requested is abandoned unacknowledged; its
/// `reply_to` is dropped rather than answered, so the sender observes the
/// close rather than an ack. `store.close()` — the immediate variant that
/// answers in-flight reads with `TypeClosed` — is reserved for unblocking a
/// push or read that would otherwise wedge a worker forever; plain shutdown
/// never needs it here since dropping the pending future is enough.
async fn input_worker(mut input: mpsc::Receiver<Transaction>, store: Arc<dyn Store>, close: CloseSignal) {
    loop {
        let tran = tokio::select! {
            biased;
            _ = close.closed_requested() => {
                store.close_once_empty().await;
                return;
            }
            maybe = input.recv() => match maybe {
                Some(t) => t,
                None => {
                    store.close_once_empty().await;
                    return;
                }
            },
        };

        let Transaction { payload, reply_to } = tran;
        tokio::select! {
            biased;
            _ = close.closed_requested() => {
                store.close_once_empty().await;
                return;
            }
            res = store.push_message(payload) => {
                let response = match res {
                    Ok(_) => Response::success(),
                    Err(err) => Response::error(err),
                };
                let _ = reply_to.send(response);
            }
        }
    }
}

/// Repeatedly replays the oldest stored message downstream, shifting it out
/// of the store once delivery resolves — successfully or not. Errors are
/// published to the side-channel rather than retried.
///
/// Deliberately does not select against the close signal: this worker
/// drains the store until `EndOfInput` regardless of `CloseAsync`,
/// terminating only once the input worker has marked the store
/// closed-once-empty and the queue has emptied. It never stalls forever
/// waiting on an abandoned reply — the input worker's own shutdown drops
/// `reply_to` on anything it abandons, and downstream stages do the same
/// when they give up mid-shutdown, so `reply_rx` always resolves.
async fn output_worker(
    store: Arc<dyn Store>,
    out_tx: mpsc::Sender<Transaction>,
    errors_tx: mpsc::Sender<ErrorBatch>,
) {
    loop {
        let message = match store.next_message().await {
            Ok(NextOutcome::Message(m)) => m,
            Ok(NextOutcome::EndOfInput) => break,
            Err(CoreError::TypeClosed) => break,
            Err(_) => break,
        };

        let (tran, reply_rx) = Transaction::new(message);
        if out_tx.send(tran).await.is_err() {
            break;
        }

        match reply_rx.await {
            Ok(response) => {
                if let Some(err) = response.as_err() {
                    let _ = errors_tx
                        .send(ErrorBatch::single(anyhow!(err.to_string())))
                        .await;
                }
                let _ = store.shift_message().await;
            }
            Err(_) => {
                let _ = errors_tx
                    .send(ErrorBatch::single(anyhow!(
                        "downstream dropped reply channel without acknowledging"
                    )))
                    .await;
                let _ = store.shift_message().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::memory::MemoryStore;
    use crate::core::message::Message;
    use std::time::Duration;

    fn byte_message(tag: u8, size: usize) -> Message {
        let mut bytes = vec![0u8; size];
        bytes[0] = tag;
        Message::from_parts(vec![bytes])
    }

    #[tokio::test]
    async fn test_unbuffered_flow_in_order_with_acks() {
        let store = Arc::new(MemoryStore::new(1725));
        let mut stage = BufferStage::new(store);
        let mut out = stage.transaction_chan().unwrap();
        let (in_tx, in_rx) = mpsc::channel(1);
        stage.start_receiving(in_rx).unwrap();

        for i in 0u8..50 {
            let (tran, reply_rx) = Transaction::new(byte_message(i, 100));
            in_tx.send(tran).await.unwrap();
            let res = tokio::time::timeout(Duration::from_secs(1), reply_rx)
                .await
                .unwrap()
                .unwrap();
            assert!(!res.is_err());

            let out_tran = tokio::time::timeout(Duration::from_secs(1), out.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(out_tran.payload.get(0).unwrap()[0], i);
            out_tran.respond(Response::success()).unwrap();
        }
    }

    #[tokio::test]
    async fn test_backpressure_blocks_until_downstream_acks() {
        let incr = 100usize;
        let total = 50usize;
        // `Message::byte_size` sums raw part lengths with no per-message
        // overhead, so the store is exactly full at `incr * total` bytes —
        // unlike a wire format that charges framing overhead per message.
        let store = Arc::new(MemoryStore::new(incr * total));
        let mut stage = BufferStage::new(store);
        let mut out = stage.transaction_chan().unwrap();
        let (in_tx, in_rx) = mpsc::channel(1);
        stage.start_receiving(in_rx).unwrap();

        for i in 0u8..total as u8 {
            let (tran, reply_rx) = Transaction::new(byte_message(i, incr));
            in_tx.send(tran).await.unwrap();
            tokio::time::timeout(Duration::from_secs(1), reply_rx)
                .await
                .unwrap()
                .unwrap();
        }

        // The 51st push should not be acked within 100ms: the store is full.
        let (tran, mut reply_rx) = Transaction::new(byte_message(0, incr));
        in_tx.send(tran).await.unwrap();
        assert!(
            tokio::time::timeout(Duration::from_millis(100), &mut reply_rx)
                .await
                .is_err(),
            "overflowed response returned before the store had space"
        );

        let first_out = tokio::time::timeout(Duration::from_secs(1), out.recv())
            .await
            .unwrap()
            .unwrap();
        first_out.respond(Response::success()).unwrap();

        // Now the 51st push should complete quickly.
        let res = tokio::time::timeout(Duration::from_millis(100), reply_rx)
            .await
            .expect("51st response should arrive once the store has space")
            .unwrap();
        assert!(!res.is_err());
    }

    #[tokio::test]
    async fn test_graceful_close_drains_then_closes_output() {
        let store = Arc::new(MemoryStore::new(10_000));
        let mut stage = BufferStage::new(store);
        let mut out = stage.transaction_chan().unwrap();
        let (in_tx, in_rx) = mpsc::channel(1);
        stage.start_receiving(in_rx).unwrap();

        for i in 0u8..5 {
            let (tran, reply_rx) = Transaction::new(byte_message(i, 10));
            in_tx.send(tran).await.unwrap();
            reply_rx.await.unwrap();
        }
        drop(in_tx);

        for i in 0u8..5 {
            let tran = tokio::time::timeout(Duration::from_secs(1), out.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(tran.payload.get(0).unwrap()[0], i);
            tran.respond(Response::success()).unwrap();
        }

        let closed = tokio::time::timeout(Duration::from_secs(1), out.recv())
            .await
            .unwrap();
        assert!(closed.is_none(), "output stream should be closed");

        stage.wait_for_close(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_async_drains_queued_messages_before_closing_output() {
        let store = Arc::new(MemoryStore::new(10_000));
        let mut stage = BufferStage::new(store);
        let mut out = stage.transaction_chan().unwrap();
        let (in_tx, in_rx) = mpsc::channel(1);
        stage.start_receiving(in_rx).unwrap();

        for i in 0u8..5 {
            let (tran, reply_rx) = Transaction::new(byte_message(i, 10));
            in_tx.send(tran).await.unwrap();
            reply_rx.await.unwrap();
        }

        // CloseAsync, not input-stream closure. The 5 already-enqueued
        // messages must still be delivered downstream before the output
        // stream closes — closing must not discard queued work.
        stage.close_async();

        for i in 0u8..5 {
            let tran = tokio::time::timeout(Duration::from_secs(1), out.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(tran.payload.get(0).unwrap()[0], i);
            tran.respond(Response::success()).unwrap();
        }

        let closed = tokio::time::timeout(Duration::from_secs(1), out.recv())
            .await
            .unwrap();
        assert!(closed.is_none(), "output stream should be closed");

        stage.wait_for_close(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_side_channel_receives_batch_of_one() {
        let store = Arc::new(MemoryStore::new(10_000));
        let mut stage = BufferStage::new(store);
        let mut out = stage.transaction_chan().unwrap();
        let mut errors = stage.errors_chan().unwrap();
        let (in_tx, in_rx) = mpsc::channel(1);
        stage.start_receiving(in_rx).unwrap();

        let (tran, reply_rx) = Transaction::new(byte_message(0, 10));
        in_tx.send(tran).await.unwrap();
        reply_rx.await.unwrap();

        let out_tran = tokio::time::timeout(Duration::from_secs(1), out.recv())
            .await
            .unwrap()
            .unwrap();
        out_tran
            .respond(Response::error(anyhow!("test error")))
            .unwrap();

        let batch = tokio::time::timeout(Duration::from_secs(5), errors.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.0[0].to_string().contains("test error"));
    }
}
