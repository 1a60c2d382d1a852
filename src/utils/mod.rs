//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `pollnotify` application.
//!
//! It holds the error types, logging setup and the payload text codec.

pub mod codec;
pub mod error;
pub mod logging;
