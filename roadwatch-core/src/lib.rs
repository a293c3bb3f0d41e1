pub mod config;
pub mod error;
pub mod media;

pub use config::{AppConfig, ConfigError};
pub use error::{Error, Result};
pub use media::{MediaKind, StoredUpload};
