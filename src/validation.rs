use std::{
    error,
    fmt::{Display, Formatter},
    num::IntErrorKind,
    time::Duration,
};

use duration_string::DurationString;

use crate::config::{AuthnMode, CertificateSource, ConjurVersion, ContainerMode};
use crate::fs::FileSystem;
use crate::identity::HostIdentity;
use crate::settings::{AuthnSettings, Setting};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    MissingRequiredSetting(Setting),
    InvalidFormat { setting: Setting, value: String },
    InvalidType { setting: Setting, value: String },
    CertificateUnavailable,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequiredSetting(s) => write!(f, "{} must be provided", s),
            Self::InvalidFormat { setting, value } => write!(f, "Invalid format for {} `{}'", setting, value),
            Self::InvalidType { setting, value } => write!(f, "Error parsing {} `{}'", setting, value),
            Self::CertificateUnavailable => write!(
                f,
                "No SSL certificate available: set {} or point {} to a readable file",
                Setting::SslCertificate,
                Setting::CertFile
            ),
        }
    }
}

impl error::Error for ValidationError {}

/// Checks `settings` against every rule that applies to the detected
/// authentication mode and returns all violations, in rule order.
///
/// The certificate file, when one is configured, is read through `fs`.
pub fn validate(settings: &AuthnSettings, fs: &dyn FileSystem) -> Vec<ValidationError> {
    let mode = AuthnMode::detect(settings.get(Setting::AuthnUrl));
    let mut errors = Vec::new();

    if mode == AuthnMode::Unrecognized {
        errors.push(ValidationError::MissingRequiredSetting(Setting::AuthnUrl));
    }

    for setting in mode.required_settings() {
        if settings.get_non_empty(*setting).is_none() {
            errors.push(ValidationError::MissingRequiredSetting(*setting));
        }
    }

    match mode {
        AuthnMode::Kubernetes => {
            check_format(settings, Setting::AuthnLogin, is_valid_login, &mut errors)
        }
        AuthnMode::Jwt => {
            check_format(settings, Setting::JwtTokenPath, is_valid_token_path, &mut errors)
        }
        AuthnMode::Unrecognized => {}
    }
    check_format(settings, Setting::ContainerMode, |v| v.parse::<ContainerMode>().is_ok(), &mut errors);
    check_format(settings, Setting::ConjurVersion, |v| v.parse::<ConjurVersion>().is_ok(), &mut errors);

    check_type(
        settings,
        Setting::ClientCertRetryCountLimit,
        |v| parse_retry_count_limit(v).is_some(),
        &mut errors,
    );
    check_type(settings, Setting::TokenTimeout, |v| parse_token_timeout(v).is_some(), &mut errors);

    if !certificate_available(settings, fs) {
        errors.push(ValidationError::CertificateUnavailable);
    }

    errors
}

fn check_format(
    settings: &AuthnSettings,
    setting: Setting,
    is_valid: impl Fn(&str) -> bool,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(value) = settings.get_non_empty(setting) {
        if !is_valid(value) {
            errors.push(ValidationError::InvalidFormat {
                setting,
                value: value.to_string(),
            });
        }
    }
}

fn check_type(
    settings: &AuthnSettings,
    setting: Setting,
    parses: impl Fn(&str) -> bool,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(value) = settings.get_non_empty(setting) {
        if !parses(value) {
            errors.push(ValidationError::InvalidType {
                setting,
                value: value.to_string(),
            });
        }
    }
}

fn certificate_available(settings: &AuthnSettings, fs: &dyn FileSystem) -> bool {
    match CertificateSource::from_settings(settings) {
        Some(source) => match source.read(fs) {
            Ok(_) => true,
            Err(err) => {
                log::debug!("unable to read SSL certificate from {}: {}", source, err);
                false
            }
        },
        None => false,
    }
}

fn is_valid_login(login: &str) -> bool {
    HostIdentity::parse(login).is_some()
}

/// A token path is a sequence of non-empty components separated by single
/// `/` characters, optionally rooted, with no `.` or `..` components.
pub(crate) fn is_valid_token_path(path: &str) -> bool {
    if path.contains('\0') {
        return false;
    }
    let relative = path.strip_prefix('/').unwrap_or(path);
    !relative.is_empty()
        && relative
            .split('/')
            .all(|component| !component.is_empty() && component != "." && component != "..")
}

/// Non-negative integers above `u32::MAX` saturate to it.
pub(crate) fn parse_retry_count_limit(value: &str) -> Option<u32> {
    match value.parse::<u32>() {
        Ok(limit) => Some(limit),
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => Some(u32::MAX),
        Err(_) => None,
    }
}

pub(crate) fn parse_token_timeout(value: &str) -> Option<Duration> {
    DurationString::from_string(value.to_string())
        .ok()
        .map(Duration::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io, path::Path};

    /// Reads succeed for every path.
    struct ReadableFiles;

    impl FileSystem for ReadableFiles {
        fn read(&self, _: &Path) -> io::Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn is_regular_file(&self, _: &Path) -> io::Result<bool> {
            Ok(true)
        }

        fn rename(&self, _: &Path, _: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    /// Reads fail for every path.
    struct UnreadableFiles;

    impl FileSystem for UnreadableFiles {
        fn read(&self, _: &Path) -> io::Result<Vec<u8>> {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }

        fn is_regular_file(&self, _: &Path) -> io::Result<bool> {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }

        fn rename(&self, _: &Path, _: &Path) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn settings(pairs: &[(Setting, &str)]) -> AuthnSettings {
        pairs.iter().map(|(s, v)| (*s, *v)).collect()
    }

    fn k8s_settings() -> AuthnSettings {
        settings(&[
            (Setting::AuthnUrl, "authn-k8s"),
            (Setting::Account, "testAccount"),
            (Setting::AuthnLogin, "host/myapp"),
            (Setting::PodName, "testPodName"),
            (Setting::PodNamespace, "testNameSpace"),
            (Setting::ClientCertRetryCountLimit, "7"),
            (Setting::TokenTimeout, "6m0s"),
            (Setting::ContainerMode, "init"),
            (Setting::SslCertificate, "samplecertificate"),
        ])
    }

    fn jwt_settings() -> AuthnSettings {
        settings(&[
            (Setting::AuthnUrl, "authn-jwt"),
            (Setting::Account, "testAccount"),
            (Setting::JwtTokenPath, "/tmp/token"),
            (Setting::ClientCertRetryCountLimit, "7"),
            (Setting::TokenTimeout, "6m0s"),
            (Setting::ContainerMode, "init"),
            (Setting::SslCertificate, "samplecertificate"),
        ])
    }

    fn missing_count(errors: &[ValidationError], setting: Setting) -> usize {
        errors
            .iter()
            .filter(|e| **e == ValidationError::MissingRequiredSetting(setting))
            .count()
    }

    #[test]
    fn happy_path_k8s() {
        assert!(validate(&k8s_settings(), &ReadableFiles).is_empty());
    }

    #[test]
    fn happy_path_jwt() {
        assert!(validate(&jwt_settings(), &ReadableFiles).is_empty());
    }

    #[test]
    fn happy_path_with_full_service_url() {
        let mut s = k8s_settings();
        s.insert(
            Setting::AuthnUrl,
            "https://conjur.example.com/api/authn-k8s/my-authenticator",
        );
        assert!(validate(&s, &ReadableFiles).is_empty());
    }

    #[test]
    fn optional_settings_may_be_absent() {
        let s = settings(&[
            (Setting::AuthnUrl, "authn-k8s"),
            (Setting::Account, "testAccount"),
            (Setting::AuthnLogin, "host"),
            (Setting::PodName, "testPodName"),
            (Setting::PodNamespace, "testNameSpace"),
            (Setting::CertFile, "/etc/conjur/ssl/conjur.pem"),
        ]);
        assert!(validate(&s, &ReadableFiles).is_empty());
    }

    #[test]
    fn each_missing_k8s_setting_is_reported_once() {
        for setting in AuthnMode::Kubernetes.required_settings() {
            if *setting == Setting::AuthnUrl {
                continue;
            }
            let mut s = k8s_settings();
            s.insert(*setting, "");
            // Break an unrelated rule too; the missing setting is still reported.
            s.insert(Setting::TokenTimeout, "seventeen");

            let errors = validate(&s, &ReadableFiles);

            assert_eq!(missing_count(&errors, *setting), 1, "{}", setting);
            assert!(errors.contains(&ValidationError::InvalidType {
                setting: Setting::TokenTimeout,
                value: "seventeen".to_string(),
            }));
        }
    }

    #[test]
    fn missing_required_setting_jwt() {
        let errors = validate(&settings(&[(Setting::AuthnUrl, "authn-jwt")]), &ReadableFiles);

        assert_eq!(
            errors,
            vec![
                ValidationError::MissingRequiredSetting(Setting::Account),
                ValidationError::MissingRequiredSetting(Setting::JwtTokenPath),
                ValidationError::CertificateUnavailable,
            ]
        );
    }

    #[test]
    fn unrecognized_url_is_reported_as_missing_url() {
        for url in [None, Some(""), Some("https://conjur.example.com/authn-ldap/foo")] {
            let mut s = k8s_settings();
            match url {
                Some(url) => s.insert(Setting::AuthnUrl, url),
                None => {
                    s.remove(Setting::AuthnUrl);
                }
            }

            let errors = validate(&s, &ReadableFiles);

            assert_eq!(
                errors,
                vec![ValidationError::MissingRequiredSetting(Setting::AuthnUrl)],
                "{:?}",
                url
            );
        }
    }

    #[test]
    fn invalid_username() {
        let mut s = k8s_settings();
        s.insert(Setting::AuthnLogin, "bad-username");

        let errors = validate(&s, &ReadableFiles);

        assert_eq!(
            errors,
            vec![ValidationError::InvalidFormat {
                setting: Setting::AuthnLogin,
                value: "bad-username".to_string(),
            }]
        );
    }

    #[test]
    fn host_login_is_never_a_format_error() {
        for login in ["host", "host/myapp", "host/apps/team/myapp"] {
            let mut s = k8s_settings();
            s.insert(Setting::AuthnLogin, login);
            s.insert(Setting::ClientCertRetryCountLimit, "seven");

            let errors = validate(&s, &ReadableFiles);

            assert!(!errors
                .iter()
                .any(|e| matches!(e, ValidationError::InvalidFormat { setting: Setting::AuthnLogin, .. })));
        }
    }

    #[test]
    fn invalid_jwt_token_path() {
        let mut s = jwt_settings();
        s.insert(Setting::JwtTokenPath, "invalid//path");

        assert_eq!(
            validate(&s, &ReadableFiles),
            vec![ValidationError::InvalidFormat {
                setting: Setting::JwtTokenPath,
                value: "invalid//path".to_string(),
            }]
        );
    }

    #[test]
    fn token_path_shapes() {
        for path in ["/tmp/token", "tmp/token", "/var/run/secrets/tokens/jwt"] {
            assert!(is_valid_token_path(path), "{}", path);
        }
        for path in ["", "/", "invalid//path", "/tmp/../token", "/tmp/./token", "/tmp/token/", "/tmp/\0token"] {
            assert!(!is_valid_token_path(path), "{:?}", path);
        }
    }

    #[test]
    fn jwt_mode_ignores_login_shape() {
        let mut s = jwt_settings();
        s.insert(Setting::AuthnLogin, "bad-username");
        assert!(validate(&s, &ReadableFiles).is_empty());
    }

    #[test]
    fn invalid_retry_count_limit() {
        let mut s = k8s_settings();
        s.insert(Setting::AuthnLogin, "host");
        s.insert(Setting::ClientCertRetryCountLimit, "seven");

        let errors = validate(&s, &ReadableFiles);

        assert_eq!(
            errors,
            vec![ValidationError::InvalidType {
                setting: Setting::ClientCertRetryCountLimit,
                value: "seven".to_string(),
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            "Error parsing CONJUR_CLIENT_CERT_RETRY_COUNT_LIMIT `seven'"
        );
    }

    #[test]
    fn negative_retry_count_limit() {
        let mut s = k8s_settings();
        s.insert(Setting::ClientCertRetryCountLimit, "-1");

        assert_eq!(
            validate(&s, &ReadableFiles),
            vec![ValidationError::InvalidType {
                setting: Setting::ClientCertRetryCountLimit,
                value: "-1".to_string(),
            }]
        );
    }

    #[test]
    fn oversized_retry_count_limit_is_accepted() {
        let mut s = k8s_settings();
        s.insert(Setting::ClientCertRetryCountLimit, "4294967296");

        assert!(validate(&s, &ReadableFiles).is_empty());
    }

    #[test]
    fn invalid_timeout() {
        let mut s = k8s_settings();
        s.insert(Setting::TokenTimeout, "seventeen");

        assert_eq!(
            validate(&s, &ReadableFiles),
            vec![ValidationError::InvalidType {
                setting: Setting::TokenTimeout,
                value: "seventeen".to_string(),
            }]
        );
    }

    #[test]
    fn invalid_container_mode_and_version() {
        let mut s = k8s_settings();
        s.insert(Setting::ContainerMode, "daemon");
        s.insert(Setting::ConjurVersion, "6");

        assert_eq!(
            validate(&s, &ReadableFiles),
            vec![
                ValidationError::InvalidFormat {
                    setting: Setting::ContainerMode,
                    value: "daemon".to_string(),
                },
                ValidationError::InvalidFormat {
                    setting: Setting::ConjurVersion,
                    value: "6".to_string(),
                },
            ]
        );
    }

    #[test]
    fn no_certificate_source() {
        let mut s = k8s_settings();
        s.insert(Setting::SslCertificate, "");
        s.insert(Setting::CertFile, "");

        assert_eq!(
            validate(&s, &ReadableFiles),
            vec![ValidationError::CertificateUnavailable]
        );
    }

    #[test]
    fn either_certificate_source_alone_is_enough() {
        let mut inline_only = k8s_settings();
        inline_only.insert(Setting::CertFile, "");
        assert!(validate(&inline_only, &UnreadableFiles).is_empty());

        let mut file_only = k8s_settings();
        file_only.insert(Setting::SslCertificate, "");
        file_only.insert(Setting::CertFile, "/etc/conjur/ssl/conjur.pem");
        assert!(validate(&file_only, &ReadableFiles).is_empty());
    }

    #[test]
    fn unreadable_certificate_file() {
        let mut s = k8s_settings();
        s.insert(Setting::SslCertificate, "");
        s.insert(Setting::CertFile, "/etc/conjur/ssl/conjur.pem");

        assert_eq!(
            validate(&s, &UnreadableFiles),
            vec![ValidationError::CertificateUnavailable]
        );
    }

    #[test]
    fn every_violation_is_reported_in_one_pass() {
        let s = settings(&[
            (Setting::AuthnUrl, "authn-k8s"),
            (Setting::AuthnLogin, "bad-username"),
            (Setting::ClientCertRetryCountLimit, "seven"),
            (Setting::TokenTimeout, "seventeen"),
        ]);

        assert_eq!(
            validate(&s, &ReadableFiles),
            vec![
                ValidationError::MissingRequiredSetting(Setting::Account),
                ValidationError::MissingRequiredSetting(Setting::PodName),
                ValidationError::MissingRequiredSetting(Setting::PodNamespace),
                ValidationError::InvalidFormat {
                    setting: Setting::AuthnLogin,
                    value: "bad-username".to_string(),
                },
                ValidationError::InvalidType {
                    setting: Setting::ClientCertRetryCountLimit,
                    value: "seven".to_string(),
                },
                ValidationError::InvalidType {
                    setting: Setting::TokenTimeout,
                    value: "seventeen".to_string(),
                },
                ValidationError::CertificateUnavailable,
            ]
        );
    }

    #[test]
    fn parses_typed_values() {
        assert_eq!(parse_retry_count_limit("7"), Some(7));
        assert_eq!(parse_retry_count_limit("seven"), None);
        assert_eq!(parse_retry_count_limit("4294967295"), Some(u32::MAX));
        assert_eq!(parse_retry_count_limit("4294967296"), Some(u32::MAX));
        assert_eq!(parse_retry_count_limit("99999999999999999999999"), Some(u32::MAX));
        assert_eq!(parse_retry_count_limit("-1"), None);
        assert_eq!(parse_token_timeout("6m0s"), Some(Duration::from_secs(360)));
        assert_eq!(parse_token_timeout("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_token_timeout("seventeen"), None);
    }
}
