//! Configuration type definitions, deserialised from TOML and used by the
//! factory to construct the source/pipeline/buffer/sink chain.

use std::collections::HashMap;

use serde::Deserialize;

/// Root configuration for a single pipeline run.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub source: StageConfig,

    #[serde(default)]
    pub pipeline: Vec<StageConfig>,

    pub buffer: Option<BufferConfig>,

    pub sink: StageConfig,
}

/// Configuration for a single named stage (source, processor, or sink).
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StageConfig {
    #[serde(rename = "type")]
    pub r#type: String,

    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

/// Configuration for the optional buffer stage between the pipeline and
/// the sink.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct BufferConfig {
    pub capacity_bytes: usize,
}
