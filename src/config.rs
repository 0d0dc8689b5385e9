use std::{
    error,
    fmt::{Display, Formatter},
    io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::fs::{FileSystem, OsFileSystem};
use crate::identity::HostIdentity;
use crate::settings::{AuthnSettings, Setting};
use crate::validation::{self, ValidationError};

pub const DEFAULT_CLIENT_CERT_RETRY_COUNT_LIMIT: u32 = 10;
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(6 * 60);
pub const DEFAULT_CLIENT_CERT_PATH: &str = "/etc/conjur/ssl/client.pem";
pub const DEFAULT_TOKEN_FILE_PATH: &str = "/run/conjur/access-token";

const K8S_AUTHENTICATOR: &str = "authn-k8s";
const JWT_AUTHENTICATOR: &str = "authn-jwt";

/// Authentication style selected by `CONJUR_AUTHN_URL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthnMode {
    Kubernetes,
    Jwt,
    Unrecognized,
}

impl AuthnMode {
    /// Looks for an `authn-k8s` or `authn-jwt` path segment, so both the bare
    /// authenticator name and a full service URL such as
    /// `https://conjur.example.com/authn-k8s/my-cluster` are recognized.
    pub fn detect(url: Option<&str>) -> Self {
        let url = match url {
            Some(url) => url,
            None => return Self::Unrecognized,
        };
        for segment in url.split('/') {
            match segment {
                K8S_AUTHENTICATOR => return Self::Kubernetes,
                JWT_AUTHENTICATOR => return Self::Jwt,
                _ => {}
            }
        }
        Self::Unrecognized
    }

    /// Settings that must be non-empty in this mode.
    ///
    /// An unrecognized mode still needs the account; the URL itself is
    /// reported separately by the validator.
    pub fn required_settings(self) -> &'static [Setting] {
        match self {
            Self::Kubernetes => &[
                Setting::AuthnUrl,
                Setting::Account,
                Setting::AuthnLogin,
                Setting::PodName,
                Setting::PodNamespace,
            ],
            Self::Jwt => &[Setting::AuthnUrl, Setting::Account, Setting::JwtTokenPath],
            Self::Unrecognized => &[Setting::Account],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContainerMode {
    /// Authenticate once and exit.
    Init,
    /// Keep refreshing the access token.
    #[default]
    Sidecar,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownContainerModeError;

impl error::Error for UnknownContainerModeError {}

impl Display for UnknownContainerModeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not valid. Possible values: init, sidecar", Setting::ContainerMode)
    }
}

impl FromStr for ContainerMode {
    type Err = UnknownContainerModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "sidecar" => Ok(Self::Sidecar),
            _ => Err(UnknownContainerModeError),
        }
    }
}

/// Conjur API generation the authenticator talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConjurVersion {
    V4,
    #[default]
    V5,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownConjurVersionError;

impl error::Error for UnknownConjurVersionError {}

impl Display for UnknownConjurVersionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not valid. Possible values: 4, 5", Setting::ConjurVersion)
    }
}

impl FromStr for ConjurVersion {
    type Err = UnknownConjurVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4" => Ok(Self::V4),
            "5" => Ok(Self::V5),
            _ => Err(UnknownConjurVersionError),
        }
    }
}

/// Where the Conjur SSL certificate comes from. An inline value wins over a
/// file path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CertificateSource<'a> {
    Inline(&'a str),
    File(&'a str),
}

impl<'a> CertificateSource<'a> {
    pub(crate) fn from_settings(settings: &'a AuthnSettings) -> Option<Self> {
        settings
            .get_non_empty(Setting::SslCertificate)
            .map(Self::Inline)
            .or_else(|| settings.get_non_empty(Setting::CertFile).map(Self::File))
    }

    pub(crate) fn read(&self, fs: &dyn FileSystem) -> io::Result<Vec<u8>> {
        match self {
            Self::Inline(cert) => Ok(cert.as_bytes().to_vec()),
            Self::File(path) => fs.read(Path::new(path)),
        }
    }
}

impl Display for CertificateSource<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline(_) => write!(f, "{}", Setting::SslCertificate),
            Self::File(path) => write!(f, "{} `{}'", Setting::CertFile, path),
        }
    }
}

/// Mode-specific identity. A `Config` can only hold the fields its mode needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthnIdentity {
    Kubernetes {
        login: HostIdentity,
        pod_name: String,
        pod_namespace: String,
    },
    Jwt {
        token_path: PathBuf,
    },
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid(Vec<ValidationError>),
    /// The settings were handed to [`Config::build`] without passing
    /// [`validate`](crate::validation::validate) first.
    Unvalidated(ValidationError),
    CertificateRead { path: PathBuf, source: io::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(errors) => {
                write!(f, "Invalid authenticator configuration: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            Self::Unvalidated(err) => write!(f, "Settings were not validated before building the configuration: {}", err),
            Self::CertificateRead { path, source } => {
                write!(f, "Unable to read SSL certificate file {}: {}", path.display(), source)
            }
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Unvalidated(err) => Some(err),
            Self::CertificateRead { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Validated authenticator configuration.
///
/// The only way to get one is through [`Config::from_settings`],
/// [`Config::from_env`] or [`Config::build`]; fields are read-only.
///
/// ```compile_fail
/// use std::{path::PathBuf, time::Duration};
/// use conjur_authn::config::{AuthnIdentity, Config, ConjurVersion, ContainerMode};
///
/// let config = Config {
///     url: "authn-jwt".to_string(),
///     account: String::new(),
///     identity: AuthnIdentity::Jwt { token_path: PathBuf::from("/tmp/jwt") },
///     container_mode: ContainerMode::Init,
///     conjur_version: ConjurVersion::V5,
///     client_cert_retry_count_limit: 0,
///     token_timeout: Duration::ZERO,
///     ssl_certificate: Vec::new(),
///     client_cert_path: PathBuf::new(),
///     token_file_path: PathBuf::new(),
/// };
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    url: String,
    account: String,
    identity: AuthnIdentity,
    container_mode: ContainerMode,
    conjur_version: ConjurVersion,
    client_cert_retry_count_limit: u32,
    token_timeout: Duration,
    ssl_certificate: Vec<u8>,
    client_cert_path: PathBuf,
    token_file_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_settings(&AuthnSettings::from_env(), &OsFileSystem)
    }

    /// Validates `settings` and builds the configuration, or returns every
    /// validation error at once.
    pub fn from_settings(settings: &AuthnSettings, fs: &dyn FileSystem) -> Result<Self, ConfigError> {
        let errors = validation::validate(settings, fs);
        if !errors.is_empty() {
            for err in &errors {
                log::warn!("{}", err);
            }
            return Err(ConfigError::Invalid(errors));
        }
        Self::build(settings, fs)
    }

    /// Builds the configuration from settings that already passed
    /// [`validate`](crate::validation::validate).
    pub fn build(settings: &AuthnSettings, fs: &dyn FileSystem) -> Result<Self, ConfigError> {
        let url = required(settings, Setting::AuthnUrl)?;
        let account = required(settings, Setting::Account)?;

        let identity = match AuthnMode::detect(Some(url)) {
            AuthnMode::Kubernetes => {
                let login = required(settings, Setting::AuthnLogin)?;
                AuthnIdentity::Kubernetes {
                    login: HostIdentity::parse(login)
                        .ok_or_else(|| invalid_format(Setting::AuthnLogin, login))?,
                    pod_name: required(settings, Setting::PodName)?.to_string(),
                    pod_namespace: required(settings, Setting::PodNamespace)?.to_string(),
                }
            }
            AuthnMode::Jwt => {
                let token_path = required(settings, Setting::JwtTokenPath)?;
                if !validation::is_valid_token_path(token_path) {
                    return Err(invalid_format(Setting::JwtTokenPath, token_path));
                }
                AuthnIdentity::Jwt {
                    token_path: PathBuf::from(token_path),
                }
            }
            AuthnMode::Unrecognized => {
                return Err(ConfigError::Unvalidated(ValidationError::MissingRequiredSetting(
                    Setting::AuthnUrl,
                )))
            }
        };

        let container_mode: ContainerMode = parse_or_default(settings, Setting::ContainerMode)?;
        let conjur_version: ConjurVersion = parse_or_default(settings, Setting::ConjurVersion)?;
        let client_cert_retry_count_limit = Self::get_retry_count_limit(settings)?;
        let token_timeout = Self::get_token_timeout(settings)?;
        let ssl_certificate = Self::read_ssl_certificate(settings, fs)?;

        let client_cert_path = settings
            .get_non_empty(Setting::ClientCertPath)
            .unwrap_or(DEFAULT_CLIENT_CERT_PATH);
        let token_file_path = settings
            .get_non_empty(Setting::TokenFilePath)
            .unwrap_or(DEFAULT_TOKEN_FILE_PATH);

        Ok(Config {
            url: url.to_string(),
            account: account.to_string(),
            identity,
            container_mode,
            conjur_version,
            client_cert_retry_count_limit,
            token_timeout,
            ssl_certificate,
            client_cert_path: PathBuf::from(client_cert_path),
            token_file_path: PathBuf::from(token_file_path),
        })
    }

    pub fn mode(&self) -> AuthnMode {
        match self.identity {
            AuthnIdentity::Kubernetes { .. } => AuthnMode::Kubernetes,
            AuthnIdentity::Jwt { .. } => AuthnMode::Jwt,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn identity(&self) -> &AuthnIdentity {
        &self.identity
    }

    pub fn container_mode(&self) -> ContainerMode {
        self.container_mode
    }

    pub fn conjur_version(&self) -> ConjurVersion {
        self.conjur_version
    }

    pub fn client_cert_retry_count_limit(&self) -> u32 {
        self.client_cert_retry_count_limit
    }

    pub fn token_timeout(&self) -> Duration {
        self.token_timeout
    }

    /// PEM bytes of the certificate used to verify the Conjur server.
    pub fn ssl_certificate(&self) -> &[u8] {
        &self.ssl_certificate
    }

    /// Where the signed client certificate is moved after login.
    pub fn client_cert_path(&self) -> &Path {
        &self.client_cert_path
    }

    pub fn token_file_path(&self) -> &Path {
        &self.token_file_path
    }

    fn get_retry_count_limit(settings: &AuthnSettings) -> Result<u32, ConfigError> {
        match settings.get_non_empty(Setting::ClientCertRetryCountLimit) {
            None => Ok(DEFAULT_CLIENT_CERT_RETRY_COUNT_LIMIT),
            Some(value) => validation::parse_retry_count_limit(value)
                .ok_or_else(|| invalid_type(Setting::ClientCertRetryCountLimit, value)),
        }
    }

    fn get_token_timeout(settings: &AuthnSettings) -> Result<Duration, ConfigError> {
        match settings.get_non_empty(Setting::TokenTimeout) {
            None => Ok(DEFAULT_TOKEN_TIMEOUT),
            Some(value) => validation::parse_token_timeout(value)
                .ok_or_else(|| invalid_type(Setting::TokenTimeout, value)),
        }
    }

    fn read_ssl_certificate(settings: &AuthnSettings, fs: &dyn FileSystem) -> Result<Vec<u8>, ConfigError> {
        let source = CertificateSource::from_settings(settings)
            .ok_or(ConfigError::Unvalidated(ValidationError::CertificateUnavailable))?;
        source.read(fs).map_err(|err| match source {
            CertificateSource::File(path) => ConfigError::CertificateRead {
                path: PathBuf::from(path),
                source: err,
            },
            CertificateSource::Inline(_) => ConfigError::Unvalidated(ValidationError::CertificateUnavailable),
        })
    }
}

fn required(settings: &AuthnSettings, setting: Setting) -> Result<&str, ConfigError> {
    settings
        .get_non_empty(setting)
        .ok_or(ConfigError::Unvalidated(ValidationError::MissingRequiredSetting(setting)))
}

fn parse_or_default<T: FromStr + Default>(settings: &AuthnSettings, setting: Setting) -> Result<T, ConfigError> {
    match settings.get_non_empty(setting) {
        None => Ok(T::default()),
        Some(value) => value.parse::<T>().map_err(|_| invalid_format(setting, value)),
    }
}

fn invalid_format(setting: Setting, value: &str) -> ConfigError {
    ConfigError::Unvalidated(ValidationError::InvalidFormat {
        setting,
        value: value.to_string(),
    })
}

fn invalid_type(setting: Setting, value: &str) -> ConfigError {
    ConfigError::Unvalidated(ValidationError::InvalidType {
        setting,
        value: value.to_string(),
    })
}
