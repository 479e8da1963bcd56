//! Path context for I/O results crossing into the application layer

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Attach "what was being done to which file" to an `io::Result`.
pub trait IoResultExt<T> {
    /// ```ignore
    /// let text = fs.read_to_string(path).with_path_context("read tree", path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{action} {}", path.display()),
            source: Box::new(e),
        })
    }
}
