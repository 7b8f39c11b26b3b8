//! Secret string wrapper for channel secrets, signing keys and API keys.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A string value that never appears in logs, Debug output or serialized JSON.
///
/// `Debug` and `Display` print `[REDACTED]` (or nothing when empty) and
/// `Serialize` always emits an empty string. Call
/// [`expose()`](SecretString::expose) at the point of use.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The plain value. Keep the result out of logs.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return this secret if set, otherwise the value found by `lookup`
    /// under `env_name`.
    ///
    /// Configuration files may name an environment variable instead of
    /// embedding the secret; the inline value always wins.
    pub fn or_env_with<F>(&self, env_name: Option<&str>, lookup: F) -> SecretString
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.0.is_empty() {
            return self.clone();
        }
        env_name
            .filter(|n| !n.is_empty())
            .and_then(|n| lookup(n))
            .map(SecretString)
            .unwrap_or_default()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "\"\"")
        } else {
            write!(f, "\"[REDACTED]\"")
        }
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, "[REDACTED]")
        }
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        SecretString(s.to_owned())
    }
}
