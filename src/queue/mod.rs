//! The `queue` module provides the ordered, doubly linked queue used as the
//! per-client backlog.
//!
//! It supports O(1) push at both ends and pop at the front, plus ordered
//! inserts by priority or timestamp.

pub mod ordered;

pub use ordered::{NodeHandle, OrderedQueue};

#[cfg(test)]
mod tests;
