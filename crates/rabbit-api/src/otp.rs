use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rabbit_types::Username;
use rabbit_types::models::EmailKind;
use rand::Rng;
use thiserror::Error;
use tracing::info;

use crate::auth::AppState;

/// Account details held back until the email address is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRegistration {
    pub username: Username,
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    kind: EmailKind,
    expires_at: Instant,
    registration: Option<PendingRegistration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("no pending code of this type")]
    Missing,
    #[error("code has expired")]
    Expired,
    #[error("code does not match")]
    Mismatch,
}

/// One-time codes keyed by username, each valid for `ttl`.
///
/// At most one code is live per user; issuing a new one replaces the old.
#[derive(Debug)]
pub struct OtpStore {
    entries: Mutex<HashMap<Username, OtpEntry>>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Six-digit code, never starting with zero.
    pub fn generate_code() -> String {
        rand::rng().random_range(100_000..1_000_000).to_string()
    }

    pub fn issue(
        &self,
        username: &Username,
        kind: EmailKind,
        registration: Option<PendingRegistration>,
    ) -> String {
        self.issue_at(username, kind, registration, Instant::now())
    }

    pub fn issue_at(
        &self,
        username: &Username,
        kind: EmailKind,
        registration: Option<PendingRegistration>,
        now: Instant,
    ) -> String {
        let code = Self::generate_code();
        let entry = OtpEntry {
            code: code.clone(),
            kind,
            expires_at: now + self.ttl,
            registration,
        };
        self.lock().insert(username.clone(), entry);
        code
    }

    /// Fresh code for a pending registration, keeping its details.
    pub fn reissue_registration(
        &self,
        username: &Username,
    ) -> Result<(String, PendingRegistration), OtpError> {
        self.reissue_registration_at(username, Instant::now())
    }

    pub fn reissue_registration_at(
        &self,
        username: &Username,
        now: Instant,
    ) -> Result<(String, PendingRegistration), OtpError> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(username)
            .filter(|e| e.kind == EmailKind::Verification)
            .ok_or(OtpError::Missing)?;
        let registration = entry.registration.clone().ok_or(OtpError::Missing)?;
        entry.code = Self::generate_code();
        entry.expires_at = now + self.ttl;
        Ok((entry.code.clone(), registration))
    }

    /// Check a code. A match consumes it; an expired code is dropped.
    pub fn verify(
        &self,
        username: &Username,
        kind: EmailKind,
        code: &str,
    ) -> Result<Option<PendingRegistration>, OtpError> {
        self.verify_at(username, kind, code, Instant::now())
    }

    pub fn verify_at(
        &self,
        username: &Username,
        kind: EmailKind,
        code: &str,
        now: Instant,
    ) -> Result<Option<PendingRegistration>, OtpError> {
        let mut entries = self.lock();
        let entry = entries
            .get(username)
            .filter(|e| e.kind == kind)
            .ok_or(OtpError::Missing)?;

        if now > entry.expires_at {
            entries.remove(username);
            return Err(OtpError::Expired);
        }
        if entry.code != code.trim() {
            return Err(OtpError::Mismatch);
        }

        Ok(entries.remove(username).and_then(|e| e.registration))
    }

    pub fn discard(&self, username: &Username) {
        self.lock().remove(username);
    }

    /// Drop every expired code. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at >= now);
        before - entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Username, OtpEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Background task that drops expired codes on an interval.
pub async fn run_sweep_loop(state: AppState, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        let purged = state.otps.purge_expired(Instant::now());
        if purged > 0 {
            info!("OTP sweep: dropped {} expired codes", purged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Username {
        Username::parse("alice").unwrap()
    }

    fn pending() -> PendingRegistration {
        PendingRegistration {
            username: alice(),
            email: "alice@example.com".into(),
            password_hash: "hash".into(),
            name: "Alice".into(),
        }
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = OtpStore::generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn matching_code_is_consumed() {
        let store = OtpStore::new(Duration::from_secs(600));
        let now = Instant::now();
        let code = store.issue_at(&alice(), EmailKind::Verification, Some(pending()), now);

        assert_eq!(
            store.verify_at(&alice(), EmailKind::Verification, "000000", now),
            Err(OtpError::Mismatch)
        );
        let registration = store.verify_at(&alice(), EmailKind::Verification, &code, now).unwrap();
        assert_eq!(registration, Some(pending()));
        assert_eq!(
            store.verify_at(&alice(), EmailKind::Verification, &code, now),
            Err(OtpError::Missing)
        );
    }

    #[test]
    fn kind_must_match() {
        let store = OtpStore::new(Duration::from_secs(600));
        let now = Instant::now();
        let code = store.issue_at(&alice(), EmailKind::Reset, None, now);
        assert_eq!(
            store.verify_at(&alice(), EmailKind::Verification, &code, now),
            Err(OtpError::Missing)
        );
        assert_eq!(store.verify_at(&alice(), EmailKind::Reset, &code, now), Ok(None));
    }

    #[test]
    fn expired_code_is_rejected_and_dropped() {
        let store = OtpStore::new(Duration::from_secs(60));
        let now = Instant::now();
        let code = store.issue_at(&alice(), EmailKind::Reset, None, now);
        let later = now + Duration::from_secs(61);
        assert_eq!(
            store.verify_at(&alice(), EmailKind::Reset, &code, later),
            Err(OtpError::Expired)
        );
        assert_eq!(store.verify_at(&alice(), EmailKind::Reset, &code, now), Err(OtpError::Missing));
    }

    #[test]
    fn reissue_keeps_registration_and_extends_expiry() {
        let store = OtpStore::new(Duration::from_secs(60));
        let start = Instant::now();
        store.issue_at(&alice(), EmailKind::Verification, Some(pending()), start);

        let later = start + Duration::from_secs(50);
        let (code, registration) = store.reissue_registration_at(&alice(), later).unwrap();
        assert_eq!(registration, pending());

        let after_first_expiry = start + Duration::from_secs(100);
        assert!(store
            .verify_at(&alice(), EmailKind::Verification, &code, after_first_expiry)
            .is_ok());
    }

    #[test]
    fn reissue_requires_pending_registration() {
        let store = OtpStore::new(Duration::from_secs(60));
        assert_eq!(store.reissue_registration(&alice()).unwrap_err(), OtpError::Missing);
        store.issue(&alice(), EmailKind::Reset, None);
        assert_eq!(store.reissue_registration(&alice()).unwrap_err(), OtpError::Missing);
    }

    #[test]
    fn purge_drops_only_expired() {
        let store = OtpStore::new(Duration::from_secs(60));
        let now = Instant::now();
        let bob = Username::parse("bob").unwrap();
        store.issue_at(&alice(), EmailKind::Reset, None, now);
        store.issue_at(&bob, EmailKind::Reset, None, now + Duration::from_secs(30));
        assert_eq!(store.purge_expired(now + Duration::from_secs(70)), 1);
        assert_eq!(store.purge_expired(now + Duration::from_secs(70)), 0);
    }
}
