//! Filesystem port for template and result file I/O.

use std::path::Path;

/// Provides filesystem access for reading templates and writing results.
///
/// Abstracting the filesystem allows the message store to be tested
/// without touching the real disk.
pub trait FileSystem {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Writes the given contents to a file, creating parent directories and
    /// overwriting any previous contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns `true` if the path names an existing regular file.
    /// Directories do not count.
    fn is_file(&self, path: &Path) -> bool;
}
