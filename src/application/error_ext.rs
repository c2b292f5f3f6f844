//! Error conversion helpers for reading catalog sources
//!
//! Provides extension traits for attaching the offending path to errors.

use std::fmt::Display;
use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// fs.read_to_string(&index)
    ///     .with_path_context("read library index", &index)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

/// Extension trait turning format errors (JSON, CSV) into `ApplicationError::Parse`.
pub trait ParseResultExt<T> {
    fn with_parse_context(self, path: &Path) -> ApplicationResult<T>;
}

impl<T, E: Display> ParseResultExt<T> for Result<T, E> {
    fn with_parse_context(self, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
