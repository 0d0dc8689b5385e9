use async_trait::async_trait;
use std::fmt::Debug;

use crate::config::Config;
use crate::errors::error::AuthnError;

/// The Conjur authentication protocol, driven by [`Bootstrap`](crate::bootstrap::Bootstrap).
#[async_trait]
pub trait Authenticator: Debug + Send + Sync {
    /// Asks Conjur to sign a client certificate for this pod. Conjur writes
    /// the certificate into the pod out-of-band, at
    /// [`CLIENT_CERT_SOURCE_PATH`](crate::bootstrap::CLIENT_CERT_SOURCE_PATH).
    ///
    /// Only called in Kubernetes mode.
    async fn login(&self, config: &Config) -> Result<(), AuthnError>;

    /// Exchanges the client certificate or JWT for an access token.
    async fn authenticate(&self, config: &Config) -> Result<Vec<u8>, AuthnError>;
}
