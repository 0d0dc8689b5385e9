use std::{error::Error, fmt};

/// Failure reported by an [`Authenticator`](crate::auth::method::Authenticator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnError {
    description: String,
}

impl AuthnError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for AuthnError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

impl Error for AuthnError {}
