//! Shared library for cross-cutting concerns in the contract toolkit crates.
//!
//! This crate provides centralized implementations for:
//! - A common error type with configuration-error classification
//! - Environment-variable parsing helpers for crate configuration
//! - Tracing subscriber initialisation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod tracing_config;

pub use env::{load_dotenv, parse_env, parse_env_list};
pub use error::ToolkitError;
pub use tracing_config::{TracingConfig, init_tracing};
