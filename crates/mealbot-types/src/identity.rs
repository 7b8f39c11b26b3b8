//! Chat-platform identity and login origin.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque user identifier issued by the messaging platform.
///
/// Stable per end user and used as the join key between the chat side
/// and the stored [`Profile`](crate::profile::Profile).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatIdentity(String);

impl ChatIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw platform id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ChatIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChatIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ChatIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChatIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Where a login flow was started from.
///
/// `Chat` flows end on an HTML page telling the user to go back to the
/// chat; `Web` flows redirect to the frontend with a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Login link sent by the webhook gateway to an unregistered user.
    #[default]
    Chat,
    /// Login started from the web frontend.
    Web,
}

impl Origin {
    /// Lowercase wire name, as accepted by `?origin=`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Chat => "chat",
            Origin::Web => "web",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(Origin::Chat),
            "web" => Ok(Origin::Web),
            other => Err(format!("unknown origin: {other}")),
        }
    }
}
