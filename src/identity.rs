use std::fmt::{Display, Formatter};

const HOST_PREFIX: &str = "host";

/// Conjur host identity given as `CONJUR_AUTHN_LOGIN`.
///
/// Accepted shapes are a bare `host` or `host/<id>`, where `<id>` may contain
/// further `/`-separated segments, e.g. `host/apps/my-namespace/my-app`. The
/// authenticator splits the identity into a policy prefix and the host id when
/// it builds the certificate signing request:
///
/// | login                      | prefix            | suffix   |
/// |----------------------------|-------------------|----------|
/// | `host`                     | `host`            | ``       |
/// | `host/my-app`              | `host`            | `my-app` |
/// | `host/apps/team/my-app`    | `host.apps.team`  | `my-app` |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostIdentity {
    login: String,
    prefix: String,
    suffix: String,
}

impl HostIdentity {
    /// Returns `None` when `login` is not a host identity.
    pub fn parse(login: &str) -> Option<Self> {
        if login == HOST_PREFIX {
            return Some(Self {
                login: login.to_string(),
                prefix: HOST_PREFIX.to_string(),
                suffix: String::new(),
            });
        }

        let host_id = login.strip_prefix("host/")?;
        let segments: Vec<&str> = host_id.split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return None;
        }

        let (suffix, policy) = segments.split_last()?;
        let prefix = if policy.is_empty() {
            HOST_PREFIX.to_string()
        } else {
            format!("{}.{}", HOST_PREFIX, policy.join("."))
        };

        Some(Self {
            login: login.to_string(),
            prefix,
            suffix: suffix.to_string(),
        })
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl Display for HostIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.login)
    }
}
