use std::error::Error;
use std::fmt;

use tracing::{debug, warn};

pub const KEYRING_SERVICE: &str = "cardchat";
const KEYRING_USER: &str = "openai";

/// Describes failures when attempting to access the system keyring.
///
/// Recoverable errors indicate that the credential backend was
/// temporarily unavailable (for example when the keychain service is
/// locked). Permanent errors surface the underlying cause directly so
/// callers can report them to the user.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner())
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

fn entry() -> Result<keyring::Entry, KeyringAccessError> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?)
}

/// The stored API key, `None` when nothing is stored.
pub fn load_api_key() -> Result<Option<String>, KeyringAccessError> {
    match entry()?.get_password() {
        Ok(key) => {
            debug!("API key loaded from keyring");
            Ok(Some(key))
        }
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Keyring lookup for config resolution. Backend failures are logged and
/// treated as an empty layer.
pub fn api_key_layer() -> Option<String> {
    match load_api_key() {
        Ok(key) => key,
        Err(err) => {
            if err.is_recoverable() {
                debug!(error = %err, "keyring unavailable");
            } else {
                warn!(error = %err, "failed to read API key from keyring");
            }
            None
        }
    }
}

pub fn store_api_key(api_key: &str) -> Result<(), KeyringAccessError> {
    entry()?.set_password(api_key.trim())?;
    Ok(())
}

/// Returns whether a key was removed.
pub fn delete_api_key() -> Result<bool, KeyringAccessError> {
    match entry()?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_outages_are_recoverable() {
        let err = KeyringAccessError::from(keyring::Error::NoStorageAccess(Box::new(
            std::io::Error::other("locked"),
        )));
        assert!(err.is_recoverable());
        assert!(err.source().is_some());
    }

    #[test]
    fn other_failures_are_permanent() {
        let err = KeyringAccessError::from(keyring::Error::NoEntry);
        assert!(!err.is_recoverable());
    }
}
