//! Demo source stage: emits a counting message on a fixed interval.
//!
//! Grounded in the teacher's `SimulatedInputSource` (`input/simulated.rs`) —
//! same interval-driven `tokio::select!` loop, translated from a
//! fire-and-forget broadcast channel into a transactional producer that
//! waits on each message's ack before sending the next.

use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::core::close::CloseSignal;
use crate::core::message::Message;
use crate::core::stage::{Producer, Stage, TRANSACTION_CHAN_CAPACITY};
use crate::core::transaction::Transaction;

/// Emits messages of the form `[counter]` every `interval`, stopping after
/// `limit` messages if one is given. Exists to exercise and demonstrate the
/// pipeline end to end; not meant as a production data source.
pub struct TickerSource {
    close: CloseSignal,
    out_rx: Option<mpsc::Receiver<Transaction>>,
}

impl TickerSource {
    pub fn new(interval: Duration, limit: Option<u64>) -> Self {
        let (out_tx, out_rx) = mpsc::channel(TRANSACTION_CHAN_CAPACITY);
        let close = CloseSignal::new();

        tokio::spawn(run(out_tx, close.clone(), interval, limit));

        Self {
            close,
            out_rx: Some(out_rx),
        }
    }
}

impl Stage for TickerSource {
    fn close_signal(&self) -> &CloseSignal {
        &self.close
    }
}

impl Producer for TickerSource {
    fn transaction_chan(&mut self) -> Option<mpsc::Receiver<Transaction>> {
        self.out_rx.take()
    }
}

async fn run(
    out_tx: mpsc::Sender<Transaction>,
    close: CloseSignal,
    interval: Duration,
    limit: Option<u64>,
) {
    let mut counter: u64 = 0;
    loop {
        if let Some(limit) = limit {
            if counter >= limit {
                break;
            }
        }

        tokio::select! {
            biased;
            _ = close.closed_requested() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let message = Message::from_parts(vec![counter.to_string().into_bytes()]);
        let (tran, reply_rx) = Transaction::new(message);

        tokio::select! {
            biased;
            _ = close.closed_requested() => break,
            res = out_tx.send(tran) => if res.is_err() { break },
        }

        tokio::select! {
            biased;
            _ = close.closed_requested() => break,
            res = reply_rx => {
                if let Ok(response) = res {
                    if let Some(err) = response.as_err() {
                        tracing::warn!("ticker message {} was not accepted: {}", counter, err);
                    }
                }
            }
        }

        counter += 1;
    }

    drop(out_tx);
    close.close_async();
    close.mark_done();
}
