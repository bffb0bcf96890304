//! Stage and processor registries: named constructors looked up at config
//! load time, mirroring the teacher's `processors::factory` /
//! `stages::factory` `OnceLock<Mutex<HashMap<...>>>` singleton pattern —
//! process-wide by default, but never consulted by the core's own tests.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use tokio::time::Duration;

use crate::config::params::extract_param;
use crate::config::types::StageConfig;
use crate::core::stage::{Consumer, Producer};
use crate::processor::{FilterProcessor, MapProcessor, Processor};
use crate::stages::{LogSink, TickerSource};

type ProcessorConstructor =
    Box<dyn Fn(&StageConfig) -> anyhow::Result<Box<dyn Processor>> + Send + Sync>;
type SourceConstructor = Box<dyn Fn(&StageConfig) -> anyhow::Result<Box<dyn Producer>> + Send + Sync>;
type SinkConstructor = Box<dyn Fn(&StageConfig) -> anyhow::Result<Box<dyn Consumer>> + Send + Sync>;

static PROCESSOR_REGISTRY: OnceLock<Mutex<HashMap<String, ProcessorConstructor>>> = OnceLock::new();
static SOURCE_REGISTRY: OnceLock<Mutex<HashMap<String, SourceConstructor>>> = OnceLock::new();
static SINK_REGISTRY: OnceLock<Mutex<HashMap<String, SinkConstructor>>> = OnceLock::new();

fn processor_registry() -> &'static Mutex<HashMap<String, ProcessorConstructor>> {
    PROCESSOR_REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn source_registry() -> &'static Mutex<HashMap<String, SourceConstructor>> {
    SOURCE_REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn sink_registry() -> &'static Mutex<HashMap<String, SinkConstructor>> {
    SINK_REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn register_processor(name: &str, constructor: ProcessorConstructor) {
    processor_registry()
        .lock()
        .unwrap()
        .insert(name.to_string(), constructor);
}

pub fn register_source(name: &str, constructor: SourceConstructor) {
    source_registry()
        .lock()
        .unwrap()
        .insert(name.to_string(), constructor);
}

pub fn register_sink(name: &str, constructor: SinkConstructor) {
    sink_registry()
        .lock()
        .unwrap()
        .insert(name.to_string(), constructor);
}

fn ensure_defaults() {
    static INITIALIZED: OnceLock<()> = OnceLock::new();
    INITIALIZED.get_or_init(|| {
        register_processor(
            "uppercase",
            Box::new(|config: &StageConfig| {
                let _ = config;
                Ok(Box::new(MapProcessor::new("uppercase", |mut m| {
                    let upper = m.get(0).map(|p| p.to_ascii_uppercase()).unwrap_or_default();
                    m = crate::core::message::Message::from_parts(vec![upper]);
                    m
                })) as Box<dyn Processor>)
            }),
        );
        register_processor(
            "nonempty",
            Box::new(|config: &StageConfig| {
                let _ = config;
                Ok(Box::new(FilterProcessor::new(
                    "nonempty",
                    |m: &crate::core::message::Message| !m.is_empty(),
                    "message had no parts",
                )) as Box<dyn Processor>)
            }),
        );

        register_source(
            "ticker",
            Box::new(|config: &StageConfig| {
                let interval_ms: u64 = extract_param(&config.parameters, "interval_ms", 1000);
                let limit: Option<u64> = extract_param(&config.parameters, "limit", None);
                Ok(Box::new(TickerSource::new(Duration::from_millis(interval_ms), limit))
                    as Box<dyn Producer>)
            }),
        );

        register_sink(
            "log",
            Box::new(|config: &StageConfig| {
                let name: String = extract_param(&config.parameters, "name", "sink".to_string());
                Ok(Box::new(LogSink::new(name)) as Box<dyn Consumer>)
            }),
        );

        tracing::info!("default stage and processor types registered");
    });
}

pub fn create_processor(config: &StageConfig) -> anyhow::Result<Box<dyn Processor>> {
    ensure_defaults();
    let registry = processor_registry().lock().unwrap();
    registry
        .get(config.r#type.as_str())
        .ok_or_else(|| anyhow::anyhow!("unknown processor type '{}'", config.r#type))
        .and_then(|constructor| constructor(config))
}

pub fn create_source(config: &StageConfig) -> anyhow::Result<Box<dyn Producer>> {
    ensure_defaults();
    let registry = source_registry().lock().unwrap();
    registry
        .get(config.r#type.as_str())
        .ok_or_else(|| anyhow::anyhow!("unknown source type '{}'", config.r#type))
        .and_then(|constructor| constructor(config))
}

pub fn create_sink(config: &StageConfig) -> anyhow::Result<Box<dyn Consumer>> {
    ensure_defaults();
    let registry = sink_registry().lock().unwrap();
    registry
        .get(config.r#type.as_str())
        .ok_or_else(|| anyhow::anyhow!("unknown sink type '{}'", config.r#type))
        .and_then(|constructor| constructor(config))
}
