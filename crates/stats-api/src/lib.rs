//! HTTP surface of the mesh stats service

pub mod api;
pub mod config;

pub use api::{create_router, run_until, serve, AppState, VersionInfo};
pub use config::ApiConfig;
