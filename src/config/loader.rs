//! Loads a [`Config`] from a TOML file or string, the way the teacher's
//! `config::loader::load_config`/`load_config_from_string` do.

use std::path::Path;

use crate::config::types::Config;

pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .map_err(|e| anyhow::anyhow!("reading '{}': {}", path.as_ref().display(), e))?;
    load_config_from_string(&content)
}

pub fn load_config_from_string(content: &str) -> anyhow::Result<Config> {
    toml::from_str(content).map_err(|e| anyhow::anyhow!("parsing config: {}", e))
}

/// A minimal, always-valid configuration: a ticker source emitting every
/// second, an uppercasing pipeline stage, and a log sink. Used as the CLI's
/// fallback when no config file is given.
pub fn default_config() -> Config {
    use crate::config::types::StageConfig;
    use std::collections::HashMap;

    Config {
        source: StageConfig {
            r#type: "ticker".to_string(),
            parameters: {
                let mut params = HashMap::new();
                params.insert("interval_ms".to_string(), serde_json::json!(1000));
                params
            },
        },
        pipeline: vec![StageConfig {
            r#type: "uppercase".to_string(),
            parameters: HashMap::new(),
        }],
        buffer: None,
        sink: StageConfig {
            r#type: "log".to_string(),
            parameters: {
                let mut params = HashMap::new();
                params.insert("name".to_string(), serde_json::json!("default"));
                params
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_toml() {
        let toml = r#"
            [source]
            type = "ticker"
            parameters = { interval_ms = 50 }

            [[pipeline]]
            type = "uppercase"

            [sink]
            type = "log"
        "#;

        let config = load_config_from_string(toml).unwrap();
        assert_eq!(config.source.r#type, "ticker");
        assert_eq!(config.pipeline.len(), 1);
        assert_eq!(config.sink.r#type, "log");
        assert!(config.buffer.is_none());
    }

    #[test]
    fn test_load_with_buffer() {
        let toml = r#"
            [source]
            type = "ticker"

            [buffer]
            capacity_bytes = 4096

            [sink]
            type = "log"
        "#;

        let config = load_config_from_string(toml).unwrap();
        assert_eq!(config.buffer.unwrap().capacity_bytes, 4096);
    }

    #[test]
    fn test_malformed_toml_errs() {
        assert!(load_config_from_string("not valid toml [[[").is_err());
    }
}
