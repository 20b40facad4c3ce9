//! Bearer token sources.

use async_trait::async_trait;

use super::TokenProvider;
use crate::error::ReportingError;

const SERVICE: &str = "studytimer";
const TOKEN_KEY: &str = "token";

/// Token kept in the OS keyring.
#[derive(Debug, Clone)]
pub struct KeyringTokenProvider {
    service: String,
}

impl Default for KeyringTokenProvider {
    fn default() -> Self {
        Self {
            service: SERVICE.to_string(),
        }
    }
}

impl KeyringTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self) -> Result<keyring::Entry, ReportingError> {
        keyring::Entry::new(&self.service, TOKEN_KEY)
            .map_err(|e| ReportingError::TokenLookup(e.to_string()))
    }

    /// Persist a token obtained at sign-in.
    pub fn save(&self, token: &str) -> Result<(), ReportingError> {
        self.entry()?
            .set_password(token)
            .map_err(|e| ReportingError::TokenLookup(e.to_string()))
    }

    /// Forget the stored token. Missing entries are not an error.
    pub fn remove(&self) -> Result<(), ReportingError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ReportingError::TokenLookup(e.to_string())),
        }
    }
}

#[async_trait]
impl TokenProvider for KeyringTokenProvider {
    async fn get_token(&self) -> Result<Option<String>, ReportingError> {
        match self.entry()?.get_password() {
            Ok(token) if !token.is_empty() => Ok(Some(token)),
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ReportingError::TokenLookup(e.to_string())),
        }
    }
}

/// Fixed token, for tests and for tokens passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> Result<Option<String>, ReportingError> {
        Ok(self.token.clone())
    }
}
