//! # Two Steps Testkit
//!
//! Test utilities for the Two Steps board.
//!
//! This crate provides:
//! - Board fixtures over in-memory and temp-file stores
//! - Property-based test generators using proptest
//! - An in-process HTTP harness with a cookie jar
//!
//! ## Usage
//!
//! ```rust,ignore
//! use twosteps_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_board() {
//!     let board = TestBoard::memory();
//!     let alice = board.sign_in_as("alice");
//!     // ... service operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
