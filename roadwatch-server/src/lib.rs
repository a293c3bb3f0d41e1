pub mod http;
pub mod metrics;
pub mod static_files;
