//! Intersect Core
//!
//! Core types for the NSDF Intersect CI pipeline.
//!
//! This crate contains:
//! - Domain types: services, source trees, execution environments, images,
//!   tags and registry credentials
//! - Constants: process-wide defaults shared by the runner and the CLI
//!
//! Nothing here performs I/O. Materializing environments and images is the
//! job of the runner's container engine.

pub mod constants;
pub mod domain;
pub mod error;

pub use error::{CoreError, Result};
