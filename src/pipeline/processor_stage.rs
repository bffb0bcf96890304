//! Processor pipeline stage: wraps an ordered list of processors and turns
//! them into a single stage with transaction semantics — dropping,
//! transforming and fanning out one input transaction into N outputs, and
//! collapsing N downstream acknowledgements back into one upstream ack.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::core::close::CloseSignal;
use crate::core::message::Message;
use crate::core::response::Response;
use crate::core::stage::{Consumer, Producer, Stage, TRANSACTION_CHAN_CAPACITY};
use crate::core::transaction::Transaction;
use crate::error::CoreError;
use crate::processor::traits::{ProcessOutcome, Processor};

/// A stage that reads from a source, runs each message through a chain of
/// processors, and either propagates the result(s) or drops the message.
pub struct ProcessorPipeline {
    close: CloseSignal,
    processors: Option<Vec<Box<dyn Processor>>>,
    messages_out_tx: Option<mpsc::Sender<Transaction>>,
    messages_out_rx: Option<mpsc::Receiver<Transaction>>,
    started: bool,
}

impl ProcessorPipeline {
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Self {
        let (tx, rx) = mpsc::channel(TRANSACTION_CHAN_CAPACITY);
        Self {
            close: CloseSignal::new(),
            processors: Some(processors),
            messages_out_tx: Some(tx),
            messages_out_rx: Some(rx),
            started: false,
        }
    }
}

impl Stage for ProcessorPipeline {
    fn close_signal(&self) -> &CloseSignal {
        &self.close
    }
}

impl Producer for ProcessorPipeline {
    fn transaction_chan(&mut self) -> Option<mpsc::Receiver<Transaction>> {
        self.messages_out_rx.take()
    }
}

impl Consumer for ProcessorPipeline {
    fn start_receiving(&mut self, input: mpsc::Receiver<Transaction>) -> Result<(), CoreError> {
        if self.started {
            return Err(CoreError::AlreadyStarted);
        }
        self.started = true;

        let processors = self
            .processors
            .take()
            .expect("processors are only taken once, on the first start_receiving call");
        let out_tx = self
            .messages_out_tx
            .take()
            .expect("sender is only taken once, on the first start_receiving call");
        let close = self.close.clone();

        tokio::spawn(run(processors, input, out_tx, close));
        Ok(())
    }
}

/// Runs each message in `tran.payload` through `processors` in order,
/// collapsing intermediate drops and fan-outs into the single working list
/// the reference forward algorithm describes.
async fn run_processors(
    processors: &mut [Box<dyn Processor>],
    payload: Message,
) -> (Vec<Message>, Option<Response>) {
    let mut working = vec![payload];
    let mut last_response = None;

    for processor in processors.iter_mut() {
        if working.is_empty() {
            break;
        }
        let mut next = Vec::with_capacity(working.len());
        for msg in working.drain(..) {
            match processor.process_message(msg).await {
                ProcessOutcome::Emit(msgs) => next.extend(msgs),
                ProcessOutcome::Drop(res) => last_response = Some(res),
            }
        }
        working = next;
    }

    (working, last_response)
}

/// Sends each fanned-out transaction downstream in order, spawning an
/// independent awaiter for each reply so responses can be collected
/// concurrently and out of order while sends stay sequential. `abort` is
/// checked before each send so the parent can tell this task to stop
/// enqueueing further sends once it has given up on the fan-out (first
/// error, or shutdown).
async fn send_fanout(
    fanout: Vec<(Transaction, tokio::sync::oneshot::Receiver<Response>)>,
    out_tx: mpsc::Sender<Transaction>,
    result_tx: mpsc::Sender<Response>,
    abort: Arc<AtomicBool>,
) {
    for (tran, reply_rx) in fanout {
        if abort.load(Ordering::Acquire) {
            break;
        }
        if out_tx.send(tran).await.is_err() {
            break;
        }
        let result_tx = result_tx.clone();
        tokio::spawn(async move {
            let res = match reply_rx.await {
                Ok(res) => res,
                Err(_) => Response::error(anyhow!("downstream dropped reply channel")),
            };
            let _ = result_tx.send(res).await;
        });
    }
}

/// Aggregates fan-out responses per the first-error policy: success once
/// every response is success, or the first error observed, whichever comes
/// first. Returns `None` if shutdown was signalled before the fan-out
/// resolved — in which case the caller must not reply upstream at all.
async fn collect_fanout(
    total: usize,
    mut result_rx: mpsc::Receiver<Response>,
    abort: &Arc<AtomicBool>,
    close: &CloseSignal,
) -> Option<Response> {
    if total == 0 {
        return Some(Response::success());
    }
    let mut received = 0;
    loop {
        tokio::select! {
            biased;
            _ = close.closed_requested() => {
                abort.store(true, Ordering::Release);
                return None;
            }
            maybe = result_rx.recv() => {
                match maybe {
                    Some(res) => {
                        received += 1;
                        if res.is_err() {
                            abort.store(true, Ordering::Release);
                            return Some(res);
                        }
                        if received == total {
                            return Some(Response::success());
                        }
                    }
                    None => return Some(Response::success()),
                }
            }
        }
    }
}

async fn run(
    mut processors: Vec<Box<dyn Processor>>,
    mut input: mpsc::Receiver<Transaction>,
    out_tx: mpsc::Sender<Transaction>,
    close: CloseSignal,
) {
    loop {
        let tran = tokio::select! {
            biased;
            _ = close.closed_requested() => break,
            maybe = input.recv() => match maybe {
                Some(t) => t,
                None => break,
            },
        };

        let (working, last_response) = run_processors(&mut processors, tran.payload).await;

        if working.is_empty() {
            let response = last_response.unwrap_or_else(Response::success);
            let _ = tran.respond(response);
            continue;
        }

        let fanout: Vec<_> = working.into_iter().map(Transaction::new).collect();
        let total = fanout.len();
        let (result_tx, result_rx) = mpsc::channel(total.max(1));
        let abort = Arc::new(AtomicBool::new(false));

        tokio::spawn(send_fanout(
            fanout,
            out_tx.clone(),
            result_tx,
            abort.clone(),
        ));

        match collect_fanout(total, result_rx, &abort, &close).await {
            Some(response) => {
                let _ = tran.respond(response);
            }
            None => {
                // Shutdown was signalled mid-fan-out. Per the lifecycle
                // contract we drop `tran` unanswered and stop the worker;
                // its originator observes this stage's stream closing.
                break;
            }
        }
    }

    drop(out_tx);
    close.close_async();
    close.mark_done();
}
