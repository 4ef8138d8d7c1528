//! # passgate-common
//!
//! Shared claim types, configuration, error handling, and value-shape validation used
//! across the Passgate crates. This is the foundation layer: no cryptography, just
//! primitives and contracts.

pub mod auth;
pub mod config;
pub mod error;
pub mod validation;
