//! Demo sink stage: logs every message it receives and acks immediately.
//!
//! Grounded in the teacher's `LogSink` (`sink/log.rs`) — same
//! log-and-forget behaviour, translated into a `Consumer` that replies on
//! the transaction's single-shot channel instead of just returning.

use tokio::sync::mpsc;

use crate::core::close::CloseSignal;
use crate::core::response::Response;
use crate::core::stage::{Consumer, Stage};
use crate::core::transaction::Transaction;
use crate::error::CoreError;

pub struct LogSink {
    close: CloseSignal,
    name: String,
    started: bool,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            close: CloseSignal::new(),
            name: name.into(),
            started: false,
        }
    }
}

impl Stage for LogSink {
    fn close_signal(&self) -> &CloseSignal {
        &self.close
    }
}

impl Consumer for LogSink {
    fn start_receiving(&mut self, mut input: mpsc::Receiver<Transaction>) -> Result<(), CoreError> {
        if self.started {
            return Err(CoreError::AlreadyStarted);
        }
        self.started = true;

        let name = self.name.clone();
        let close = self.close.clone();
        tokio::spawn(async move {
            loop {
                let tran = tokio::select! {
                    biased;
                    _ = close.closed_requested() => break,
                    maybe = input.recv() => match maybe {
                        Some(t) => t,
                        None => break,
                    },
                };

                tracing::info!(target: "sink", stage = %name, message = ?tran.payload);
                let _ = tran.respond(Response::success());
            }
            close.mark_done();
        });

        Ok(())
    }
}
