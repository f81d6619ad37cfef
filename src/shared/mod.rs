//! Shared Module
//!
//! This module contains types and data structures shared by every component
//! of the sync core: the messaging domain model, the error taxonomy, and the
//! gateway configuration.
//!
//! # Overview
//!
//! All types here are plain data designed for serialization; they carry no
//! I/O of their own.

/// Gateway configuration
pub mod config;

/// Shared error types
pub mod error;

/// Messaging domain model and wire shapes
pub mod messaging;

/// Re-export commonly used types for convenience
pub use config::{ConfigError, GatewayConfig, GatewayConfigBuilder};
pub use error::{ClientError, MalformedPayloadError, NetworkError};
