//! One-time login challenges.
//!
//! A challenge is a 32-byte random token, hex encoded, issued for a single
//! public key. The first attempt that presents it consumes it, whatever the
//! outcome of that attempt. Consumed entries stay in the map until they
//! expire so a replay reports `AlreadyUsed` rather than `NotFound`.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Challenge {
    pub token: String,
    /// Normalized hex key the challenge was issued for.
    pub public_key: String,
    pub issued_at: Instant,
    pub expires_at: Instant,
    /// Wall-clock expiry reported to clients.
    pub expires_at_unix: i64,
    pub consumed: bool,
}

impl Challenge {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("challenge not found")]
    NotFound,

    #[error("challenge expired")]
    Expired,

    #[error("challenge already used")]
    AlreadyUsed,
}

pub struct ChallengeStore {
    challenges: DashMap<String, Challenge>,
    ttl: Duration,
}

impl ChallengeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            challenges: DashMap::new(),
            ttl,
        }
    }

    /// Issue a fresh challenge bound to `public_key`.
    pub fn issue(&self, public_key: &str) -> Challenge {
        let now = Instant::now();
        let challenge = Challenge {
            token: generate_token(),
            public_key: public_key.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
            expires_at_unix: unix_now().saturating_add(self.ttl.as_secs() as i64),
            consumed: false,
        };
        self.challenges
            .insert(challenge.token.clone(), challenge.clone());
        challenge
    }

    /// Atomically mark `token` consumed and return it.
    ///
    /// The check and the flag flip happen under the map's entry lock, so of
    /// any number of concurrent callers exactly one gets `Ok`. An expired
    /// token is consumed too.
    pub fn consume(&self, token: &str) -> Result<Challenge, ChallengeError> {
        let mut entry = self
            .challenges
            .get_mut(token)
            .ok_or(ChallengeError::NotFound)?;

        if entry.consumed {
            return Err(ChallengeError::AlreadyUsed);
        }
        entry.consumed = true;

        if entry.is_expired(Instant::now()) {
            return Err(ChallengeError::Expired);
        }

        Ok(entry.clone())
    }

    /// Drop every expired challenge, consumed or not.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.challenges.retain(|_, c| !c.is_expired(now));
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

/// 256 bits from the thread-local CSPRNG, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const PK: &str = "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";

    #[test]
    fn tokens_are_unique_and_256_bit() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn consume_once() {
        let store = ChallengeStore::new(Duration::from_secs(60));
        let c = store.issue(PK);

        let consumed = store.consume(&c.token).unwrap();
        assert_eq!(consumed.public_key, PK);
        assert!(consumed.consumed);

        assert_eq!(store.consume(&c.token).unwrap_err(), ChallengeError::AlreadyUsed);
    }

    #[test]
    fn unknown_token_is_not_found() {
        let store = ChallengeStore::new(Duration::from_secs(60));
        assert_eq!(store.consume("nope").unwrap_err(), ChallengeError::NotFound);
    }

    #[test]
    fn expired_token_is_rejected_and_burned() {
        let store = ChallengeStore::new(Duration::ZERO);
        let c = store.issue(PK);
        assert_eq!(store.consume(&c.token).unwrap_err(), ChallengeError::Expired);
        assert_eq!(store.consume(&c.token).unwrap_err(), ChallengeError::AlreadyUsed);
    }

    #[test]
    fn concurrent_consume_has_one_winner() {
        let store = Arc::new(ChallengeStore::new(Duration::from_secs(60)));
        let token = store.issue(PK).token;

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                let token = token.clone();
                thread::spawn(move || store.consume(&token))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one concurrent consume should succeed");
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == ChallengeError::AlreadyUsed));
    }

    #[test]
    fn sweep_removes_only_expired() {
        let short = ChallengeStore::new(Duration::ZERO);
        short.issue(PK);
        short.issue(PK);
        short.sweep();
        assert!(short.is_empty());

        let long = ChallengeStore::new(Duration::from_secs(60));
        let c = long.issue(PK);
        long.consume(&c.token).unwrap();
        long.sweep();
        assert_eq!(long.len(), 1);
    }
}
