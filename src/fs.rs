use std::{fs, io, path::Path};

/// Filesystem operations used while validating settings and waiting for the
/// client certificate. Tests swap in their own implementation.
pub trait FileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// `Ok(false)` when something exists at `path` that is not a regular file.
    /// Symlinks are followed.
    fn is_regular_file(&self, path: &Path) -> io::Result<bool>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn is_regular_file(&self, path: &Path) -> io::Result<bool> {
        fs::metadata(path).map(|metadata| metadata.is_file())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_file_system_distinguishes_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("client.pem");
        fs::write(&file, b"cert").unwrap();

        assert!(OsFileSystem.is_regular_file(&file).unwrap());
        assert!(!OsFileSystem.is_regular_file(dir.path()).unwrap());

        let err = OsFileSystem
            .is_regular_file(&dir.path().join("missing.pem"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn os_file_system_reads_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("client.pem");
        let to = dir.path().join("app-client.pem");
        fs::write(&from, b"cert").unwrap();

        OsFileSystem.rename(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(OsFileSystem.read(&to).unwrap(), b"cert");
    }
}
