//! Shared test utilities for the contract toolkit.
//!
//! This crate provides:
//! - Proptest generators for contract values and JSON documents
//! - A recording command registry
//! - Sample contracts for the supported body kinds

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
