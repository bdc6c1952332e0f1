//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the tag synchronization core:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It owns the on-disk JSON configuration and establishes the logging
//! conventions used throughout the system.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, ChangeDetection, TagSelection};
pub use error::{Error, Result};
