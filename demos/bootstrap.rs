use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use conjur_authn::{
    auth::method::Authenticator,
    bootstrap::Bootstrap,
    config::{Config, ContainerMode},
    errors::error::AuthnError,
    file_wait::FileWaiter,
};

/// Pretends to be Conjur: login writes a certificate where the real server
/// would inject it, authenticate hands back a fixed token.
#[derive(Debug)]
struct LocalConjur {
    inject_at: PathBuf,
}

#[async_trait]
impl Authenticator for LocalConjur {
    async fn login(&self, config: &Config) -> Result<(), AuthnError> {
        println!("login request for {:?}", config.identity());
        tokio::fs::write(&self.inject_at, b"-----BEGIN CERTIFICATE-----\n")
            .await
            .map_err(|err| AuthnError::new(err.to_string()))
    }

    async fn authenticate(&self, _config: &Config) -> Result<Vec<u8>, AuthnError> {
        Ok(b"{\"protected\":\"...\",\"payload\":\"...\"}".to_vec())
    }
}

/// Run with a Kubernetes configuration, e.g.
///
/// ```sh
/// CONJUR_AUTHN_URL=authn-k8s CONJUR_ACCOUNT=myaccount CONJUR_AUTHN_LOGIN=host/myapp \
/// MY_POD_NAME=myapp MY_POD_NAMESPACE=apps CONJUR_SSL_CERTIFICATE=dummy \
/// CONJUR_CLIENT_CERT_PATH=/tmp/app-client.pem cargo run --example bootstrap
/// ```
#[tokio::main]
async fn main() {
    let source = std::env::temp_dir().join("conjur-demo-client.pem");
    let authenticator = Arc::new(LocalConjur {
        inject_at: source.clone(),
    });

    let bootstrap = match Bootstrap::from_env(authenticator) {
        Ok(bootstrap) => bootstrap.with_waiter(
            FileWaiter::new(&source).with_base_delay(Duration::from_millis(50)),
        ),
        Err(err) => {
            println!("{}", err);
            std::process::exit(1);
        }
    };

    match bootstrap.start().await {
        Ok(token) => {
            println!(
                "received access token ({} bytes), client certificate at {}",
                token.len(),
                bootstrap.config().client_cert_path().display()
            );
            if bootstrap.config().container_mode() == ContainerMode::Init {
                println!("init container, exiting");
            }
        }
        Err(err) => {
            println!("bootstrap failed: {}", err);
            std::process::exit(1);
        }
    }
}
