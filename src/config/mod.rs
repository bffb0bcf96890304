//! Configuration surface: TOML-driven description of a source, an optional
//! processor pipeline, an optional buffer, and a sink, plus the factory
//! that turns those descriptions into running stages.

pub mod factory;
pub mod loader;
pub mod manager;
pub mod params;
pub mod types;

pub use loader::{default_config, load_config, load_config_from_string};
pub use manager::PipelineManager;
pub use types::{BufferConfig, Config, StageConfig};
