use std::path::Path;

use crate::config::schema::Config;
use crate::disposition::TransferTarget;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `.yml`/`.yaml` files are YAML, everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Json,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content, ConfigFormat::from_path(path))
}

pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let fs = &config.file_system;
    for (name, value) in [
        ("file_system.base_mount", &fs.base_mount),
        ("file_system.input_dir", &fs.input_dir),
        ("file_system.output_dir", &fs.output_dir),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("{} must not be empty", name),
            });
        }
    }

    if fs.input_dir == fs.output_dir {
        return Err(ConfigError::Validation {
            message: "file_system.input_dir and file_system.output_dir must differ".to_string(),
        });
    }

    if config.output.transfer_on_completion {
        TransferTarget::from_config(&config.output).map_err(|e| ConfigError::Validation {
            message: e.to_string(),
        })?;
    }

    if config.output.transfer_types.is_empty() || config.output.required_types.is_empty() {
        return Err(ConfigError::Validation {
            message: "output.transfer_types and output.required_types must not be empty"
                .to_string(),
        });
    }

    Ok(())
}
