//! Ergonomic error context helpers.
//!
//! Converts IO errors into context-rich `NetError` variants.

use crate::base::neterror::NetError;
use std::io;
use std::path::Path;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Attach the path of an upload source to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use httpwork::base::context::IoResultExt;
    ///
    /// let data = tokio::fs::read(&path).await.file_context(&path)?;
    /// // Error: "Failed to read /tmp/a.bin: No such file or directory"
    /// ```
    fn file_context(self, path: &Path) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn file_context(self, path: &Path) -> Result<T, NetError> {
        self.map_err(|e| NetError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_file_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::NotFound, "missing"));
        let err = result.file_context(Path::new("/tmp/upload.bin")).unwrap_err();

        match err {
            NetError::FileRead { path, source } => {
                assert_eq!(path, Path::new("/tmp/upload.bin"));
                assert_eq!(source.kind(), ErrorKind::NotFound);
            }
            _ => panic!("Expected FileRead"),
        }
    }
}
