//! Short-lived OAuth `state` records.
//!
//! A record is created when a login starts and consumed when the identity
//! provider redirects back. Consumption is a destructive read under one
//! lock, so a captured callback cannot be replayed and two racing
//! callbacks with the same `state` cannot both succeed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use mealbot_types::{ChatIdentity, Origin};
use rand::Rng;
use tracing::debug;

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// State carried across the OAuth redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationRecord {
    /// Opaque random token sent to the provider as the OAuth `state`.
    ///
    /// 256 bits from the thread RNG, URL-safe hex encoded.
    pub token: String,
    /// Where the login began; decides where the callback lands afterwards.
    pub origin: Origin,
    /// Chat identity that followed the login link, if the flow began in chat.
    pub chat_identity: Option<ChatIdentity>,
    /// When the login was started.
    pub created_at: DateTime<Utc>,
    /// After this instant the record can no longer be consumed.
    pub expires_at: DateTime<Utc>,
}

impl CorrelationRecord {
    /// Whether `now` is past [`expires_at`](Self::expires_at).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// In-process store of live correlation records.
///
/// Records are keyed by token and never leave the process, so a restart
/// invalidates every login in flight. Expired records are swept whenever a
/// new one is created.
pub struct CorrelationStore {
    records: Mutex<HashMap<String, CorrelationRecord>>,
    ttl: Duration,
}

impl CorrelationStore {
    /// Empty store whose records live for `ttl`.
    ///
    /// A `ttl` too large for chrono falls back to ten minutes.
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::minutes(10)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CorrelationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new record and return its token.
    pub fn create(&self, origin: Origin, chat_identity: Option<ChatIdentity>) -> String {
        self.create_at(origin, chat_identity, Utc::now())
    }

    /// Take the record for `token` if it exists and has not expired.
    ///
    /// The record is removed either way; a second call returns `None`.
    pub fn consume(&self, token: &str) -> Option<CorrelationRecord> {
        self.consume_at(token, Utc::now())
    }

    /// Number of stored records, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn create_at(
        &self,
        origin: Origin,
        chat_identity: Option<ChatIdentity>,
        now: DateTime<Utc>,
    ) -> String {
        let mut records = self.lock();
        // Abandoned logins never come back to consume their record.
        records.retain(|_, r| !r.is_expired(now));

        let token = loop {
            let candidate = generate_token();
            if !records.contains_key(&candidate) {
                break candidate;
            }
        };
        records.insert(
            token.clone(),
            CorrelationRecord {
                token: token.clone(),
                origin,
                chat_identity,
                created_at: now,
                expires_at: now + self.ttl,
            },
        );
        debug!(origin = %origin, live = records.len(), "correlation record created");
        token
    }

    fn consume_at(&self, token: &str, now: DateTime<Utc>) -> Option<CorrelationRecord> {
        let record = self.lock().remove(token)?;
        if record.is_expired(now) {
            debug!("correlation record expired");
            return None;
        }
        Some(record)
    }
}

fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().r#gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
