//! Cross-cutting utilities: file system helpers and path validation.

pub mod fs;
pub mod path_validation;

pub use path_validation::{validate_logical_name, validate_no_traversal};
