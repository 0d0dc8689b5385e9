use std::collections::HashMap;
use std::env;
use std::fmt::{Display, Formatter};

/// Environment variables understood by the authenticator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Setting {
    AuthnUrl,
    Account,
    AuthnLogin,
    PodName,
    PodNamespace,
    JwtTokenPath,
    ContainerMode,
    ConjurVersion,
    ClientCertRetryCountLimit,
    TokenTimeout,
    SslCertificate,
    CertFile,
    ClientCertPath,
    TokenFilePath,
}

impl Setting {
    pub const ALL: [Setting; 14] = [
        Setting::AuthnUrl,
        Setting::Account,
        Setting::AuthnLogin,
        Setting::PodName,
        Setting::PodNamespace,
        Setting::JwtTokenPath,
        Setting::ContainerMode,
        Setting::ConjurVersion,
        Setting::ClientCertRetryCountLimit,
        Setting::TokenTimeout,
        Setting::SslCertificate,
        Setting::CertFile,
        Setting::ClientCertPath,
        Setting::TokenFilePath,
    ];

    /// Name of the environment variable backing this setting.
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::AuthnUrl => "CONJUR_AUTHN_URL",
            Self::Account => "CONJUR_ACCOUNT",
            Self::AuthnLogin => "CONJUR_AUTHN_LOGIN",
            Self::PodName => "MY_POD_NAME",
            Self::PodNamespace => "MY_POD_NAMESPACE",
            Self::JwtTokenPath => "JWT_TOKEN_PATH",
            Self::ContainerMode => "CONTAINER_MODE",
            Self::ConjurVersion => "CONJUR_VERSION",
            Self::ClientCertRetryCountLimit => "CONJUR_CLIENT_CERT_RETRY_COUNT_LIMIT",
            Self::TokenTimeout => "CONJUR_TOKEN_TIMEOUT",
            Self::SslCertificate => "CONJUR_SSL_CERTIFICATE",
            Self::CertFile => "CONJUR_CERT_FILE",
            Self::ClientCertPath => "CONJUR_CLIENT_CERT_PATH",
            Self::TokenFilePath => "CONJUR_AUTHN_TOKEN_FILE",
        }
    }
}

impl Display for Setting {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.env_var())
    }
}

/// Raw setting values, exactly as they were provided.
///
/// Nothing is parsed or defaulted here; the validator and the config builder
/// own every interpretation of a value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthnSettings {
    values: HashMap<Setting, String>,
}

impl AuthnSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Setting::ALL
            .iter()
            .filter_map(|setting| env::var(setting.env_var()).ok().map(|value| (*setting, value)))
            .collect()
    }

    pub fn insert(&mut self, setting: Setting, value: impl Into<String>) {
        self.values.insert(setting, value.into());
    }

    pub fn remove(&mut self, setting: Setting) -> Option<String> {
        self.values.remove(&setting)
    }

    pub fn get(&self, setting: Setting) -> Option<&str> {
        self.values.get(&setting).map(String::as_str)
    }

    /// Like [`get`](Self::get), but an empty value counts as not provided.
    pub fn get_non_empty(&self, setting: Setting) -> Option<&str> {
        self.get(setting).filter(|value| !value.is_empty())
    }
}

impl FromIterator<(Setting, String)> for AuthnSettings {
    fn from_iter<I: IntoIterator<Item = (Setting, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(Setting, &'a str)> for AuthnSettings {
    fn from_iter<I: IntoIterator<Item = (Setting, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(setting, value)| (setting, value.to_string()))
            .collect()
    }
}
