// Configuration for the roadwatch service

use serde::{Deserialize, Serialize};

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_level: "info".to_string(),
        }
    }
}

/// On-disk locations for uploaded and processed media
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub upload_dir: String,
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
            output_dir: "outputs".to_string(),
        }
    }
}

/// Request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Segmentation model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    pub input_size: i32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub class_names: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "model/best_advanced.onnx".to_string(),
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            class_names: vec!["pothole".to_string()],
        }
    }
}

/// Frame geometry and video sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub display_width: i32,
    pub display_height: i32,
    pub frame_stride: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            display_width: 1020,
            display_height: 500,
            frame_stride: 3,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub limits: LimitsConfig,
    pub model: ModelConfig,
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Load configuration from file
    /// SECURITY: Path validation to prevent reading arbitrary files
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        use std::fs;

        // Check for path traversal sequences
        if path.contains("..") || path.contains("//") || path.contains("\\\\") {
            return Err(ConfigError::IoError(format!(
                "Path traversal detected: '{}'",
                path
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_str(&content)
    }

    /// Load configuration from string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        // Try JSON first
        if let Ok(config) = serde_json::from_str::<AppConfig>(content) {
            return Ok(config);
        }

        // Try TOML
        if let Ok(config) = toml::from_str::<AppConfig>(content) {
            return Ok(config);
        }

        Err(ConfigError::ParseError("Unknown format".to_string()))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay ROADWATCH_* environment variables onto this configuration
    pub fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("ROADWATCH_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                self.server.port = p;
            }
        }

        if let Ok(host) = std::env::var("ROADWATCH_HOST") {
            self.server.host = host;
        }

        if let Ok(log_level) = std::env::var("ROADWATCH_LOG_LEVEL") {
            self.server.log_level = log_level;
        }

        if let Ok(upload_dir) = std::env::var("ROADWATCH_UPLOAD_DIR") {
            self.paths.upload_dir = upload_dir;
        }

        if let Ok(output_dir) = std::env::var("ROADWATCH_OUTPUT_DIR") {
            self.paths.output_dir = output_dir;
        }

        if let Ok(model_path) = std::env::var("ROADWATCH_MODEL_PATH") {
            self.model.path = model_path;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port cannot be 0".to_string(),
            ));
        }

        if self.limits.max_upload_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_upload_bytes must be > 0".to_string(),
            ));
        }

        if self.model.input_size <= 0 {
            return Err(ConfigError::ValidationError(
                "model.input_size must be > 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.model.confidence_threshold)
            || self.model.confidence_threshold == 0.0
        {
            return Err(ConfigError::ValidationError(
                "model.confidence_threshold must be in (0, 1]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.model.iou_threshold) || self.model.iou_threshold == 0.0 {
            return Err(ConfigError::ValidationError(
                "model.iou_threshold must be in (0, 1]".to_string(),
            ));
        }

        if self.model.class_names.is_empty() {
            return Err(ConfigError::ValidationError(
                "model.class_names cannot be empty".to_string(),
            ));
        }

        if self.processing.display_width <= 0 || self.processing.display_height <= 0 {
            return Err(ConfigError::ValidationError(
                "processing display dimensions must be > 0".to_string(),
            ));
        }

        if self.processing.frame_stride == 0 {
            return Err(ConfigError::ValidationError(
                "processing.frame_stride must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.limits.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(config.processing.display_width, 1020);
        assert_eq!(config.processing.display_height, 500);
        assert_eq!(config.processing.frame_stride, 3);
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_thresholds_are_rejected() {
        let mut config = AppConfig::default();
        config.model.confidence_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.model.iou_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_class_list_is_rejected() {
        let mut config = AppConfig::default();
        config.model.class_names.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_frame_stride_is_rejected() {
        let mut config = AppConfig::default();
        config.processing.frame_stride = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let content = r#"
[server]
host = "127.0.0.1"
port = 8080
log_level = "debug"

[model]
path = "custom/model.onnx"
input_size = 640
confidence_threshold = 0.5
iou_threshold = 0.6
class_names = ["pothole", "crack"]
"#;
        let config = AppConfig::from_str(content).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.model.class_names.len(), 2);
        // untouched sections keep their defaults
        assert_eq!(config.paths.upload_dir, "uploads");
        assert_eq!(config.processing.display_width, 1020);
    }

    #[test]
    fn traversal_path_is_rejected() {
        assert!(AppConfig::from_file("../etc/passwd").is_err());
    }
}
