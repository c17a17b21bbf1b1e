//! Utility functions and helpers for ai-completion.
//!
//! This module provides cross-cutting concerns like structured logging,
//! secret sanitization, and crash-safe file replacement.
//!
//! # Submodules
//!
//! - `atomic_write`: Temp file + rename writes for whole-file stores.
//! - `logging`: Tracing and logging initialization with security filters.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod atomic_write;
pub mod logging;
