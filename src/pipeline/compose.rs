//! Composition glue: wraps a sink with a processor pipeline so sinks can be
//! extended without modifying either side.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::core::close::CloseSignal;
use crate::core::stage::{Consumer, Producer, Stage};
use crate::core::transaction::Transaction;
use crate::error::CoreError;
use crate::pipeline::processor_stage::ProcessorPipeline;
use crate::processor::Processor;

/// A stage that is both a producer and a consumer of transactions — what a
/// processor pipeline stage is, and the shape [`wrap_with_pipeline`] needs
/// to compose one in front of a sink.
pub trait PipelineStage: Producer + Consumer {}
impl<T: Producer + Consumer> PipelineStage for T {}

/// A sink extended with a processor pipeline in front of it. Constructs the
/// pipeline, wires the sink's input to the pipeline's output, and exposes
/// the pipeline's `start_receiving` as its own — the uniform glue that lets
/// any sink gain processing without being modified itself.
pub struct ComposedSink {
    pipeline: Box<dyn PipelineStage>,
    sink: Box<dyn Consumer>,
}

/// Constructs a [`ProcessorPipeline`] from `processors` and wraps `sink`
/// with it, returning the combined stage.
pub fn wrap_with_pipeline(
    processors: Vec<Box<dyn Processor>>,
    sink: Box<dyn Consumer>,
) -> ComposedSink {
    ComposedSink::new(processors, sink)
}

impl ComposedSink {
    pub fn new(processors: Vec<Box<dyn Processor>>, mut sink: Box<dyn Consumer>) -> Self {
        let mut pipeline = ProcessorPipeline::new(processors);
        let pipeline_out = pipeline
            .transaction_chan()
            .expect("a freshly constructed pipeline always has an output channel");
        sink.start_receiving(pipeline_out)
            .expect("a freshly constructed sink always accepts its first start_receiving");

        Self {
            pipeline: Box::new(pipeline),
            sink,
        }
    }
}

impl Stage for ComposedSink {
    fn close_signal(&self) -> &CloseSignal {
        self.pipeline.close_signal()
    }

    fn close_async(&self) {
        self.pipeline.close_async();
    }

    fn wait_for_close(
        &self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + '_>> {
        Box::pin(async move {
            self.pipeline.wait_for_close(timeout).await?;
            self.sink.wait_for_close(timeout).await
        })
    }
}

impl Consumer for ComposedSink {
    fn start_receiving(&mut self, input: mpsc::Receiver<Transaction>) -> Result<(), CoreError> {
        self.pipeline.start_receiving(input)
    }
}

/// Folds a chain of processor-pipeline stages between an upstream source and
/// a terminal sink, generalising [`ComposedSink`] beyond the single-pipeline
/// case: `stages` run in order, each feeding the next, with the last one
/// feeding `sink`.
pub fn wrap_with_pipelines(
    mut stages: Vec<Box<dyn PipelineStage>>,
    sink: Box<dyn Consumer>,
) -> ChainedSink {
    let mut sink = sink;
    // Wire right-to-left: each stage's output becomes the next consumer's
    // input, ending with the sink.
    while let Some(mut stage) = stages.pop() {
        let out = stage
            .transaction_chan()
            .expect("a freshly constructed stage always has an output channel");
        sink_accepts(&mut *sink, out);
        sink = Box::new(StageAsConsumerWrapper { stage, next: sink });
    }
    ChainedSink { head: sink }
}

fn sink_accepts(sink: &mut dyn Consumer, input: mpsc::Receiver<Transaction>) {
    sink.start_receiving(input)
        .expect("a freshly constructed consumer always accepts its first start_receiving");
}

/// Wraps one pipeline stage together with everything downstream of it so
/// the fold in [`wrap_with_pipelines`] can treat "a stage plus its
/// continuation" as a single `Consumer`.
struct StageAsConsumerWrapper {
    stage: Box<dyn PipelineStage>,
    next: Box<dyn Consumer>,
}

impl Stage for StageAsConsumerWrapper {
    fn close_signal(&self) -> &CloseSignal {
        self.stage.close_signal()
    }

    fn close_async(&self) {
        self.stage.close_async();
    }

    fn wait_for_close(
        &self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + '_>> {
        Box::pin(async move {
            self.stage.wait_for_close(timeout).await?;
            self.next.wait_for_close(timeout).await
        })
    }
}

impl Consumer for StageAsConsumerWrapper {
    fn start_receiving(&mut self, input: mpsc::Receiver<Transaction>) -> Result<(), CoreError> {
        self.stage.start_receiving(input)
    }
}

/// The result of [`wrap_with_pipelines`]: a single consumer representing the
/// whole chain, which closes front-to-back on shutdown.
pub struct ChainedSink {
    head: Box<dyn Consumer>,
}

impl Stage for ChainedSink {
    fn close_signal(&self) -> &CloseSignal {
        self.head.close_signal()
    }

    fn close_async(&self) {
        self.head.close_async();
    }

    fn wait_for_close(
        &self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + '_>> {
        self.head.wait_for_close(timeout)
    }
}

impl Consumer for ChainedSink {
    fn start_receiving(&mut self, input: mpsc::Receiver<Transaction>) -> Result<(), CoreError> {
        self.head.start_receiving(input)
    }
}
