//! Common types shared across the glance comparison crates.

pub mod config;
pub mod error;

pub use config::{
    AnalysisDefaults, EpsilonSpec, LonLatConfig, ResolvedVariable, ToleranceConfig,
    VariableConfig, DEFAULT_LATITUDE_NAME, DEFAULT_LONGITUDE_NAME,
};
pub use error::{GlanceError, GlanceResult};
