//! Core types and error handling for podforge
//!
//! - [`error`] - the [`PodforgeError`] enum and user-facing [`ErrorContext`]
//! - [`file_error`] - file operation errors that remember what was being done

pub mod error;
pub mod file_error;

pub use error::{ErrorContext, PodforgeError, user_friendly_error};
pub use file_error::{FileOperation, FileOperationError, FileResultExt};
