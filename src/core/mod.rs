//! Core types and error handling shared by every pipeline component.
//!
//! - [`error`] - [`ProfileError`], [`ErrorContext`] and [`user_friendly_error`]
//! - [`file_error`] - structured file system errors attached at the operation site

pub mod error;
pub mod file_error;

pub use error::{ErrorContext, ProfileError, user_friendly_error};
pub use file_error::{FileOperation, FileOperationError, FileResultExt};
