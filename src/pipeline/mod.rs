//! Processor pipeline stage and the composition helpers that wire it in
//! front of a sink.

pub mod compose;
pub mod processor_stage;

pub use compose::{wrap_with_pipeline, wrap_with_pipelines, ChainedSink, ComposedSink, PipelineStage};
pub use processor_stage::ProcessorPipeline;
