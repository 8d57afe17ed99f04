//! Platform API keys.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A platform API key.
///
/// `Debug` output is redacted. The raw key is only reachable through
/// [`CredentialToken::expose`], and through `Serialize` so it can be
/// written to durable storage.
#[derive(Debug, Clone)]
pub struct CredentialToken(SecretString);

impl CredentialToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw key, for the authorization header and storage.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Key safe for display.
    #[must_use]
    pub fn masked(&self) -> String {
        mask_token(self.expose())
    }
}

impl From<String> for CredentialToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<&str> for CredentialToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl PartialEq for CredentialToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for CredentialToken {}

impl PartialEq<str> for CredentialToken {
    fn eq(&self, other: &str) -> bool {
        self.expose() == other
    }
}

impl PartialEq<&str> for CredentialToken {
    fn eq(&self, other: &&str) -> bool {
        self.expose() == *other
    }
}

impl Serialize for CredentialToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for CredentialToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Mask a credential, keeping only its last four characters.
#[must_use]
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
