//! Shared types, error model, and configuration for newsdigest.
//!
//! This crate is the foundation depended on by all other newsdigest crates.
//! It provides:
//! - [`DigestError`], the unified error type
//! - Domain types ([`SourceDocument`], [`Corpus`], [`SourceManifest`], [`LanguageProfile`])
//! - Configuration ([`AppConfig`], runtime option structs, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CollectConfig, CollectOptions, InferenceConfig, InferenceSettings, OutputConfig,
    OutputOptions, SourceSpec, config_dir, config_file_path, default_sources, init_config,
    load_config, load_config_from,
};
pub use error::{DigestError, Result};
pub use types::{
    Corpus, DocumentDate, ENGLISH_LABELS, HeaderLabels, LanguageProfile, ManifestCounts,
    ManifestEntry, Section, SourceDocument, SourceManifest, SourceStatus,
};
