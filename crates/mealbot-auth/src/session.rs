//! Signed session tokens.
//!
//! Tokens are HS256 JWTs whose subject is the chat identity. A
//! *provisional* token is short-lived and only good for finishing
//! registration; everything else needs a full token. Verification never
//! errors: any signature mismatch, malformed token or expiry yields
//! `None`, which callers treat as unauthenticated.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mealbot_types::config::AuthConfig;
use mealbot_types::{AuthError, ChatIdentity, MealbotError, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// JWT claim set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Chat identity.
    pub sub: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch. Checked with zero leeway.
    pub exp: i64,
    /// Set only on provisional tokens; omitted from full ones.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub provisional: bool,
}

/// A token that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSession {
    /// The token's subject.
    pub identity: ChatIdentity,
    /// Whether this token only opens the registration form.
    pub provisional: bool,
    /// Taken from the `exp` claim.
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies session tokens with one process-wide secret.
///
/// Changing the secret invalidates every token issued before the change.
pub struct SessionTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    session_ttl: chrono::Duration,
    provisional_ttl: chrono::Duration,
}

impl SessionTokenIssuer {
    /// Issuer signing with `secret`.
    ///
    /// `session_ttl` is the lifetime of full tokens and `provisional_ttl`
    /// that of provisional ones.
    ///
    /// # Errors
    ///
    /// [`MealbotError::ConfigInvalid`] if the secret is empty or a lifetime
    /// does not fit in a chrono duration.
    pub fn new(
        secret: &SecretString,
        session_ttl: Duration,
        provisional_ttl: Duration,
    ) -> Result<Self, MealbotError> {
        if secret.is_empty() {
            return Err(MealbotError::ConfigInvalid {
                reason: "session secret is empty".into(),
            });
        }
        let to_chrono = |d: Duration| {
            chrono::Duration::from_std(d).map_err(|e| MealbotError::ConfigInvalid {
                reason: format!("session lifetime out of range: {e}"),
            })
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.expose().as_bytes()),
            decoding: DecodingKey::from_secret(secret.expose().as_bytes()),
            validation,
            session_ttl: to_chrono(session_ttl)?,
            provisional_ttl: to_chrono(provisional_ttl)?,
        })
    }

    /// Issuer built from the `[auth]` section: the resolved session secret,
    /// `session_ttl_hours` and `provisional_ttl_minutes`.
    pub fn from_config(cfg: &AuthConfig) -> Result<Self, MealbotError> {
        Self::new(
            &cfg.session_secret,
            Duration::from_secs(cfg.session_ttl_hours * 3600),
            Duration::from_secs(cfg.provisional_ttl_minutes * 60),
        )
    }

    /// Issue a token for `identity`.
    ///
    /// A provisional token gets the short lifetime and carries the
    /// `provisional` claim.
    pub fn issue(&self, identity: &ChatIdentity, provisional: bool) -> Result<String, AuthError> {
        self.issue_at(identity, provisional, Utc::now())
    }

    fn issue_at(
        &self,
        identity: &ChatIdentity,
        provisional: bool,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let ttl = if provisional {
            self.provisional_ttl
        } else {
            self.session_ttl
        };
        let claims = SessionClaims {
            sub: identity.as_str().to_owned(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            provisional,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Authentication(format!("could not sign session token: {e}")))
    }

    /// Check signature and expiry.
    ///
    /// Returns `None` for anything that does not verify, including a token
    /// with an empty subject. Surrounding whitespace is ignored.
    pub fn verify(&self, token: &str) -> Option<VerifiedSession> {
        let data = match jsonwebtoken::decode::<SessionClaims>(
            token.trim(),
            &self.decoding,
            &self.validation,
        ) {
            Ok(data) => data,
            Err(e) => {
                debug!(error = %e, "session token rejected");
                return None;
            }
        };
        let claims = data.claims;
        if claims.sub.is_empty() {
            return None;
        }
        Some(VerifiedSession {
            identity: ChatIdentity::new(claims.sub),
            provisional: claims.provisional,
            expires_at: Utc.timestamp_opt(claims.exp, 0).single()?,
        })
    }

    /// Verify a token for any operation other than registration.
    /// Provisional tokens are refused.
    pub fn verify_full(&self, token: &str) -> Option<ChatIdentity> {
        match self.verify(token)? {
            VerifiedSession {
                provisional: false,
                identity,
                ..
            } => Some(identity),
            _ => {
                debug!("provisional token refused outside registration");
                None
            }
        }
    }

    /// Verify a token for the registration operation, which accepts
    /// provisional and full tokens alike.
    pub fn verify_for_registration(&self, token: &str) -> Option<ChatIdentity> {
        self.verify(token).map(|s| s.identity)
    }
}
