//! # accountd-core
//!
//! Core types and utilities for the accountd directory service.
//!
//! This crate provides the foundational pieces shared by the accountd crates:
//! error handling, service configuration, and session tracking.
//!
//! ## Modules
//!
//! - [`error`] - Error types and structured error responses
//! - [`config`] - Service configuration loaded from a JSON file
//! - [`session`] - Session identifiers and the session handle store

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
