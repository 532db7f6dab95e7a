//! Data models for the extraction pipeline.

pub mod config;
pub mod result;
pub mod stats;

pub use config::{
    EngineConfig, ExecutionMode, ExtractionConfig, LanguageSet, OutputConfig, PagescanConfig,
    Preset, Profile,
};
pub use result::{ExtractionResult, PageOutcome, RunState};
pub use stats::RunStats;
