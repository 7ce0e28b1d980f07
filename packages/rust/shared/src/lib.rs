//! Shared types, error model, and configuration for LeadMatrix.
//!
//! This crate is the foundation depended on by all other LeadMatrix crates.
//! It provides:
//! - [`LeadMatrixError`], the unified error type
//! - Domain types ([`ScanQuery`], [`GeoBias`], [`Business`], [`LeadId`])
//! - Configuration ([`AppConfig`], [`EngineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EngineConfig, EngineSection, ExportSection, GeolocationConfig, GeolocationMode,
    GeolocationSection, SessionSection, config_dir, config_file_path, expand_home, init_config,
    load_config, load_config_from, resolve_api_key, validate_api_key,
};
pub use error::{LeadMatrixError, Result};
pub use types::{
    Business, GeoBias, LeadId, NOT_AVAILABLE, RawExtractionResult, SavedSession, ScanQuery,
    SocialFootprint, is_present,
};
