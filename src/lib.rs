//! Amplifier profile resolution and compilation.
//!
//! A profile is a markdown file whose YAML front-matter declares the modules,
//! agents and context a session runs with. This crate turns registered profile
//! collections into compiled module trees a runtime can load:
//!
//! ```text
//! collections.txt ──► discover ──► manifest cache ──► load (+ extends) ──► merge
//!                                                                           │
//!                          active_profile ◄── activate ◄── compile ◄────────┘
//! ```
//!
//! # Modules
//!
//! ## Pipeline
//! - [`source`] - collection registry and the reference grammar
//! - [`resolver`] - reference string to local path (git, filesystem, bundled)
//! - [`discovery`] - scan collections, apply the schema gate, cache manifests
//! - [`loader`] - single-level `extends`
//! - [`merge`] - identity merge of module lists, deep merge of config maps
//! - [`compiler`] - staged, atomically swapped compiled layout
//! - [`active`] - active profile tracking
//! - [`service`] - facade running the pipeline with optional deadlines
//!
//! ## Supporting
//! - [`git`] - system git wrapper and the [`git::GitBackend`] seam
//! - [`cache`] - commit-keyed git checkout cache
//! - [`profile`] - manifest and resolved profile types
//! - [`markdown`] - front-matter splitting
//! - [`config`] - global config and directory layout
//! - [`core`] - errors and user-facing error rendering
//! - [`utils`] - atomic writes, directory copies, path validation
//! - [`cli`] - the `amplifier-profiles` command
//!
//! # Manifest format
//!
//! ```markdown
//! ---
//! profile:
//!   name: dev
//!   schema-version: 2
//!   version: 1.2.0
//!   description: Development profile
//!   extends: base
//! session:
//!   orchestrator:
//!     module: loop-streaming
//!     source: git+https://github.com/example/loop-streaming@main
//!   context-manager: context-simple
//! tools:
//!   - module: tool-web
//!     config:
//!       timeout: 30
//! agents:
//!   reviewer: agents/reviewer.md
//! context:
//!   core: git+https://github.com/example/context@v1/core
//! ---
//! You are a helpful development assistant.
//! ```
//!
//! Only `schema-version: 2` is accepted; other manifests are skipped during discovery.

pub mod active;
pub mod cache;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod core;
pub mod discovery;
pub mod git;
pub mod loader;
pub mod markdown;
pub mod merge;
pub mod profile;
pub mod resolver;
pub mod service;
pub mod source;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
