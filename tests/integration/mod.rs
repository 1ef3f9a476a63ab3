//! Integration test suite for amplifier-profiles
//!
//! End-to-end tests over the public API and the CLI binary.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **pipeline**: discover, load, merge and compile through [`ProfileService`]
//! - **compile_atomicity**: failed compilations leave no trace
//! - **git_refs**: real local repositories behind `git+` references
//! - **cli**: the `amplifier-profiles` binary
//!
//! [`ProfileService`]: amplifier_profiles::service::ProfileService

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod compile_atomicity;
mod git_refs;
mod pipeline;
