use std::{
    error,
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::task::JoinError;

use crate::auth::method::Authenticator;
use crate::config::{AuthnMode, Config, ConfigError};
use crate::errors::error::AuthnError;
use crate::file_wait::{FileWaitError, FileWaiter};
use crate::fs::{FileSystem, OsFileSystem};

/// Where Conjur injects the signed client certificate. The path is fixed on
/// the Conjur server side.
pub const CLIENT_CERT_SOURCE_PATH: &str = "/etc/conjur/ssl/client.pem";

/// Waits on [`CLIENT_CERT_SOURCE_PATH`] and moves the certificate to `target`.
pub fn wait_for_file(target: &Path, retry_count_limit: u32) -> Result<(), FileWaitError> {
    FileWaiter::new(CLIENT_CERT_SOURCE_PATH).wait_for_file(&OsFileSystem, target, retry_count_limit)
}

#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    FileWait(FileWaitError),
    Authn(AuthnError),
    Task(JoinError),
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{}", err),
            Self::FileWait(err) => write!(f, "{}", err),
            Self::Authn(err) => write!(f, "Conjur authentication failed: {}", err),
            Self::Task(err) => write!(f, "Certificate wait task did not complete: {}", err),
        }
    }
}

impl error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::FileWait(err) => Some(err),
            Self::Authn(err) => Some(err),
            Self::Task(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<FileWaitError> for BootstrapError {
    fn from(err: FileWaitError) -> Self {
        Self::FileWait(err)
    }
}

impl From<AuthnError> for BootstrapError {
    fn from(err: AuthnError) -> Self {
        Self::Authn(err)
    }
}

impl From<JoinError> for BootstrapError {
    fn from(err: JoinError) -> Self {
        Self::Task(err)
    }
}

/// Startup sequence of the authenticator sidecar.
pub struct Bootstrap {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    fs: Arc<dyn FileSystem + Send + Sync>,
    waiter: FileWaiter,
}

impl std::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("mode", &self.config.mode())
            .field("authenticator", &self.authenticator)
            .field("waiter", &self.waiter)
            .finish()
    }
}

impl Bootstrap {
    pub fn from_env(authenticator: Arc<dyn Authenticator>) -> Result<Self, BootstrapError> {
        let config = Config::from_env()?;
        Ok(Self::new(config, authenticator))
    }

    pub fn new(config: Config, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            config,
            authenticator,
            fs: Arc::new(OsFileSystem),
            waiter: FileWaiter::new(CLIENT_CERT_SOURCE_PATH),
        }
    }

    pub fn with_cert_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.waiter = FileWaiter::new(path);
        self
    }

    pub fn with_waiter(mut self, waiter: FileWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem + Send + Sync>) -> Self {
        self.fs = fs;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs login, waits for the injected client certificate and
    /// authenticates, returning the access token.
    ///
    /// In JWT mode there is no client certificate; only `authenticate` runs.
    pub async fn start(&self) -> Result<Vec<u8>, BootstrapError> {
        if self.config.mode() == AuthnMode::Kubernetes {
            log::info!("Logging in to Conjur as {:?}", self.config.identity());
            self.authenticator.login(&self.config).await?;
            self.wait_for_client_cert().await?;
        }

        log::info!("Authenticating with Conjur account {}", self.config.account());
        let token = self.authenticator.authenticate(&self.config).await?;
        log::info!("Conjur authentication succeeded");
        Ok(token)
    }

    async fn wait_for_client_cert(&self) -> Result<(), BootstrapError> {
        let waiter = self.waiter.clone();
        let fs = Arc::clone(&self.fs);
        let target = self.config.client_cert_path().to_path_buf();
        let retry_count_limit = self.config.client_cert_retry_count_limit();

        tokio::task::spawn_blocking(move || waiter.wait_for_file(fs.as_ref(), &target, retry_count_limit))
            .await??;
        Ok(())
    }
}
