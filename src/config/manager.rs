//! Builds a running source/pipeline/buffer/sink chain from a [`Config`],
//! the composition-layer equivalent of the teacher's
//! `PipelineManager::build_all`/`connect_stages`/`start_all` sequence —
//! collapsed here into a single construction step, since every stage in
//! this crate spawns its worker as soon as it is wired rather than waiting
//! for a separate `start` call.

use std::sync::Arc;

use crate::buffer::{BufferStage, MemoryStore, Store};
use crate::config::factory;
use crate::config::types::Config;
use crate::core::stage::{Consumer, Producer, Stage};
use crate::pipeline::{wrap_with_pipelines, ChainedSink, PipelineStage, ProcessorPipeline};

pub struct PipelineManager {
    source: Box<dyn Producer>,
    chain: ChainedSink,
}

impl PipelineManager {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let mut source = factory::create_source(&config.source)?;
        let sink = factory::create_sink(&config.sink)?;

        let mut stages: Vec<Box<dyn PipelineStage>> = Vec::new();
        if !config.pipeline.is_empty() {
            let processors = config
                .pipeline
                .iter()
                .map(factory::create_processor)
                .collect::<anyhow::Result<Vec<_>>>()?;
            stages.push(Box::new(ProcessorPipeline::new(processors)));
        }
        if let Some(buffer) = config.buffer {
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new(buffer.capacity_bytes));
            stages.push(Box::new(BufferStage::new(store)));
        }

        let mut chain = wrap_with_pipelines(stages, sink);

        let source_out = source
            .transaction_chan()
            .expect("a freshly constructed source always has an output channel");
        chain.start_receiving(source_out)?;

        Ok(Self { source, chain })
    }

    /// Signals every stage in the chain to stop. Non-blocking and
    /// idempotent; pair with [`Self::wait_until_done`] to drain gracefully.
    pub fn close_async(&self) {
        self.source.close_async();
        self.chain.close_async();
    }

    /// Resolves once the source has stopped producing and the chain has
    /// finished draining everything it produced. Runs indefinitely if the
    /// source never exhausts itself and [`Self::close_async`] is never
    /// called — the expected steady state for a long-running service.
    pub async fn wait_until_done(&self) {
        self.source.close_signal().wait_until_done().await;
        self.chain.close_signal().wait_until_done().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::default_config;
    use std::time::Duration;

    #[tokio::test]
    async fn test_default_config_builds_and_drains() {
        let mut config = default_config();
        config.source.parameters.insert("interval_ms".to_string(), serde_json::json!(1));
        config.source.parameters.insert("limit".to_string(), serde_json::json!(5));

        let manager = PipelineManager::from_config(config).unwrap();
        tokio::time::timeout(Duration::from_secs(5), manager.wait_until_done())
            .await
            .expect("pipeline with a bounded source should drain and finish");
    }

    #[tokio::test]
    async fn test_close_async_drains_a_long_running_source() {
        let mut config = default_config();
        config.source.parameters.insert("interval_ms".to_string(), serde_json::json!(5));
        config.source.parameters.remove("limit");

        let manager = PipelineManager::from_config(config).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.close_async();

        tokio::time::timeout(Duration::from_secs(5), manager.wait_until_done())
            .await
            .expect("close_async should unblock an unbounded source's pipeline");
    }

    #[tokio::test]
    async fn test_unknown_stage_type_fails_construction() {
        let mut config = default_config();
        config.sink.r#type = "nonexistent".to_string();
        assert!(PipelineManager::from_config(config).is_err());
    }
}
