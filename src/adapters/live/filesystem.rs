//! Live filesystem adapter using `std::fs`.

use std::path::Path;

use crate::ports::filesystem::FileSystem;

/// Live filesystem adapter backed by real disk I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, contents)?)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_parent_directories_and_overwrites() {
        let dir = std::env::temp_dir().join("aiapp_live_fs_write");
        let path = dir.join("answers/demo_result_latest.md");
        let fs = LiveFileSystem;

        fs.write(&path, "first").unwrap();
        fs.write(&path, "second").unwrap();

        assert!(fs.is_file(&path));
        assert!(!fs.is_file(&dir.join("answers")));
        assert_eq!(fs.read_to_string(&path).unwrap(), "second");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_missing_file_is_an_error() {
        let fs = LiveFileSystem;
        let path = std::env::temp_dir().join("aiapp_live_fs_missing/nope.md");
        assert!(!fs.is_file(&path));
        assert!(fs.read_to_string(&path).is_err());
    }
}
