//! Common types shared across Parley components.

#![warn(clippy::pedantic)]

/// Module for common call and identity types
pub mod types;
