//! Shared types and configuration for Bankcore.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Currency codes with their minor-unit precision
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
