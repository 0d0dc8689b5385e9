//! This library validates the configuration of the Conjur Kubernetes
//! authenticator and waits for the client certificate Conjur injects into
//! the pod during login.
//!
//! ## Installation
//! Add the following to your `Cargo.toml` file:
//! ```toml
//! [dependencies]
//! conjur-authn = "0.1.0"
//! ```
//!
//! ## Usage
//! The authenticator is configured through environment variables.
//!```yaml
//! CONJUR_AUTHN_URL: https://conjur.example.com/authn-k8s/my-cluster
//! CONJUR_ACCOUNT: myaccount
//! CONJUR_SSL_CERTIFICATE: "-----BEGIN CERTIFICATE-----..."   # or CONJUR_CERT_FILE
//! CONJUR_CLIENT_CERT_RETRY_COUNT_LIMIT: 10
//! CONJUR_TOKEN_TIMEOUT: 6m0s
//! CONTAINER_MODE: sidecar
//! CONJUR_VERSION: 5
//! CONJUR_CLIENT_CERT_PATH: /etc/conjur/ssl/client.pem
//! CONJUR_AUTHN_TOKEN_FILE: /run/conjur/access-token
//! ```
//!
//! For Kubernetes authentication (`authn-k8s` in the URL):
//! ```yaml
//! CONJUR_AUTHN_LOGIN: host/apps/myapp
//! MY_POD_NAME: myapp-5d4f7
//! MY_POD_NAMESPACE: apps
//! ```
//!
//! For JWT authentication (`authn-jwt` in the URL):
//! ```yaml
//! JWT_TOKEN_PATH: /var/run/secrets/tokens/jwt
//! ```
//! Optional values above show their defaults.
//!
//! Every configuration problem is reported at once:
//! ```no_run
//! use conjur_authn::config::{Config, ConfigError};
//!
//! match Config::from_env() {
//!     Ok(config) => println!("authenticating as {:?}", config.identity()),
//!     Err(ConfigError::Invalid(errors)) => {
//!         for err in errors {
//!             eprintln!("{}", err);
//!         }
//!         std::process::exit(1);
//!     }
//!     Err(err) => panic!("{}", err),
//! }
//! ```
//!
//! Waiting for the client certificate after login:
//! ```no_run
//! use std::path::Path;
//! use conjur_authn::bootstrap::wait_for_file;
//!
//! wait_for_file(Path::new("/etc/conjur/ssl/app-client.pem"), 10).unwrap();
//! ```
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod file_wait;
pub mod fs;
pub mod identity;
pub mod settings;
pub mod validation;
