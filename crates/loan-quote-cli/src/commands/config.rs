use serde_json::Value;

use loan_quote_core::EngineConfig;

use crate::input;

/// Engine configuration from `--config`, or the shipped defaults.
///
/// Partial files are accepted; missing sections keep their defaults.
pub fn load(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let config: EngineConfig = input::file::read_document(path)?;
            tracing::debug!(path, "engine configuration loaded");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

pub fn run_show(config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(config)?)
}
