use std::{
    error,
    fmt::{Display, Formatter},
    io,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use crate::fs::FileSystem;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum FileWaitError {
    PermissionDenied { path: PathBuf },
    RelocationFailed { from: PathBuf, to: PathBuf, source: io::Error },
    RetryExhausted { retry_count_limit: u32, path: PathBuf },
}

impl Display for FileWaitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied { path } => {
                write!(f, "Permission denied while checking whether {} exists", path.display())
            }
            Self::RelocationFailed { from, to, source } => write!(
                f,
                "Unable to move certificate file {} to {}: {}",
                from.display(),
                to.display(),
                source
            ),
            Self::RetryExhausted { retry_count_limit, path } => write!(
                f,
                "Certificate file {} was not available after {} retries",
                path.display(),
                retry_count_limit
            ),
        }
    }
}

impl error::Error for FileWaitError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::RelocationFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Polls for a file written by another process and moves it into place.
///
/// The first check happens immediately. After the n-th failed check the
/// waiter sleeps `base_delay * 2^(n-1)`, capped at `max_delay`, and gives up
/// once more than `retry_count_limit` checks have failed.
#[derive(Clone, Debug)]
pub struct FileWaiter {
    source_path: PathBuf,
    base_delay: Duration,
    max_delay: Duration,
}

impl FileWaiter {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Blocks until the source path holds a regular file, then renames it to
    /// `target`.
    ///
    /// Symlinks are followed when checking readiness, but the rename moves the
    /// link itself, so `target` may end up as a symlink to the real file.
    pub fn wait_for_file(
        &self,
        fs: &dyn FileSystem,
        target: &Path,
        retry_count_limit: u32,
    ) -> Result<(), FileWaitError> {
        let mut retry_count: u32 = 0;

        while !self.is_ready(fs)? {
            retry_count = retry_count.saturating_add(1);
            if retry_count > retry_count_limit {
                return Err(FileWaitError::RetryExhausted {
                    retry_count_limit,
                    path: self.source_path.clone(),
                });
            }
            let delay = self.delay(retry_count);
            log::debug!(
                "Waiting for file {} to become available (retry {}/{}, next check in {:?})",
                self.source_path.display(),
                retry_count,
                retry_count_limit,
                delay
            );
            thread::sleep(delay);
        }

        log::info!(
            "Found {}, moving it to {}",
            self.source_path.display(),
            target.display()
        );
        fs.rename(&self.source_path, target)
            .map_err(|source| FileWaitError::RelocationFailed {
                from: self.source_path.clone(),
                to: target.to_path_buf(),
                source,
            })
    }

    /// Sleep before the check that follows the `retry`-th failure.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn is_ready(&self, fs: &dyn FileSystem) -> Result<bool, FileWaitError> {
        match fs.is_regular_file(&self.source_path) {
            Ok(true) => Ok(true),
            Ok(false) => {
                log::debug!("{} exists but is not a regular file", self.source_path.display());
                Ok(false)
            }
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                Err(FileWaitError::PermissionDenied {
                    path: self.source_path.clone(),
                })
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => {
                log::debug!("Unable to check {}: {}", self.source_path.display(), err);
                Ok(false)
            }
        }
    }
}
