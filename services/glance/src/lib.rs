//! Glance service library
//!
//! Compares variables between two data files: selects the variables, checks
//! geolocation, runs the per-variable comparisons and assembles the report.
//! The `glance` binary is a thin command-line front end over these modules.

pub mod compare;
pub mod config_loader;
pub mod names;
pub mod noise;
pub mod report;
pub mod sources;
