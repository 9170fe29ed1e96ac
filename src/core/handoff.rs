//! Cross-platform authorization hand-off.
//!
//! An external authorization flow leaves the site and comes back on a
//! callback. [`Handoff::begin`] runs before the redirect: it rotates (or
//! creates) the caller's session and issues a state token carrying the
//! identity. [`Handoff::complete`] runs on the callback: it validates the
//! token, checks that the browser's session still points at the same
//! identity, and rotates the session again.
//!
//! Because both halves go through the same session, a user who authorizes
//! platform A and then platform B (or B then A) ends up with one identity.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::codec::SecretCodec;
use crate::core::constants::STATE_TOKEN_TTL;
use crate::core::session::SessionLinker;
use crate::core::types::IdentityId;
use crate::error::{Result, TokenError};

/// Output of [`Handoff::begin`].
#[derive(Clone)]
pub struct Begin {
    /// Session reference to hand back to the client.
    pub session_ref: String,
    /// State token for the authorization redirect.
    pub state: String,
}

/// Output of [`Handoff::complete`].
#[derive(Clone)]
pub struct Completion {
    /// Rotated session reference to hand back to the client.
    pub session_ref: String,
    /// Identity the completed authorization belongs to.
    pub identity: IdentityId,
}

impl std::fmt::Debug for Begin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Begin")
            .field("session_ref", &"<redacted>")
            .field("state", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("session_ref", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Begins and completes authorization hand-offs.
#[derive(Debug, Clone)]
pub struct Handoff {
    codec: SecretCodec,
    sessions: Arc<SessionLinker>,
    ttl: u64,
}

impl Handoff {
    pub fn new(codec: SecretCodec, sessions: Arc<SessionLinker>) -> Self {
        Self::with_ttl(codec, sessions, STATE_TOKEN_TTL)
    }

    /// Create a hand-off with a custom state token lifetime (seconds).
    pub fn with_ttl(codec: SecretCodec, sessions: Arc<SessionLinker>, ttl: u64) -> Self {
        Self {
            codec,
            sessions,
            ttl,
        }
    }

    /// Rotate or create the session and issue a state token for the redirect.
    pub fn begin(&self, session_ref: Option<&str>) -> Result<Begin> {
        let (session_ref, identity) = self.sessions.get_or_create(session_ref)?;
        let state = self.codec.generate(Some(&identity.to_string()))?;
        debug!(?identity, "hand-off started");
        Ok(Begin { session_ref, state })
    }

    /// Validate the callback's state token against the caller's session.
    ///
    /// # Errors
    ///
    /// - `TokenError::*` if the state token is malformed, expired, forged, or
    ///   carries no identity
    /// - `SessionError::*` if the session is missing, invalid, or belongs to
    ///   a different identity than the token
    pub fn complete(&self, state: &str, session_ref: Option<&str>) -> Result<Completion> {
        let payload = self.codec.validate(state, self.ttl)?;
        let expected: IdentityId = payload
            .as_deref()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| {
                warn!("state token carries no identity");
                TokenError::Malformed
            })?;

        self.sessions.verify(session_ref, Some(&expected))?;
        let (session_ref, identity) = self.sessions.get_or_create(session_ref)?;
        debug!(?identity, "hand-off completed");
        Ok(Completion {
            session_ref,
            identity,
        })
    }

    /// Drop the session once the cross-platform hand-off is finished.
    pub fn consume(&self, session_ref: &str) -> Result<()> {
        self.sessions.clear(session_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cipher::{Aes256, MasterKey};
    use crate::core::clock::ManualClock;
    use crate::core::store::RecordStore;
    use crate::error::{Error, SessionError};

    fn handoff() -> (Handoff, ManualClock) {
        let cipher = Arc::new(Aes256::new(&MasterKey::from_bytes([1u8; 32])));
        let store = Arc::new(RecordStore::in_memory(cipher).unwrap());
        let clock = ManualClock::new(1_700_000_000);
        let sessions = Arc::new(SessionLinker::with_clock(
            store,
            Arc::new(clock.clone()),
            3600,
        ));
        let codec = SecretCodec::with_clock(b"secret", Arc::new(clock.clone()));
        (Handoff::new(codec, sessions), clock)
    }

    #[test]
    fn test_begin_then_complete() {
        let (h, _) = handoff();
        let begin = h.begin(None).unwrap();
        let done = h.complete(&begin.state, Some(&begin.session_ref)).unwrap();
        assert_ne!(done.session_ref, begin.session_ref);

        // A second platform's flow started from the rotated session keeps the identity.
        let begin_b = h.begin(Some(&done.session_ref)).unwrap();
        let done_b = h
            .complete(&begin_b.state, Some(&begin_b.session_ref))
            .unwrap();
        assert_eq!(done.identity, done_b.identity);
    }

    #[test]
    fn test_state_replayed_against_other_session() {
        let (h, _) = handoff();
        let victim = h.begin(None).unwrap();
        let attacker = h.begin(None).unwrap();
        assert!(matches!(
            h.complete(&victim.state, Some(&attacker.session_ref)),
            Err(Error::Session(SessionError::IdentityMismatch))
        ));
    }

    #[test]
    fn test_state_without_identity() {
        let (h, clock) = handoff();
        let begin = h.begin(None).unwrap();
        let codec = SecretCodec::with_clock(b"secret", Arc::new(clock));
        let bare = codec.generate(None).unwrap();
        assert!(matches!(
            h.complete(&bare, Some(&begin.session_ref)),
            Err(Error::Token(TokenError::Malformed))
        ));
    }

    #[test]
    fn test_expired_state() {
        let (h, clock) = handoff();
        let begin = h.begin(None).unwrap();
        clock.advance(301);
        assert!(matches!(
            h.complete(&begin.state, Some(&begin.session_ref)),
            Err(Error::Token(TokenError::Expired))
        ));
    }

    #[test]
    fn test_debug_hides_references() {
        let (h, _) = handoff();
        let begin = h.begin(None).unwrap();
        let shown = format!("{begin:?}");
        assert!(!shown.contains(&begin.session_ref));
        assert!(!shown.contains(&begin.state));

        let done = h.complete(&begin.state, Some(&begin.session_ref)).unwrap();
        assert!(!format!("{done:?}").contains(&done.session_ref));
    }

    #[test]
    fn test_consume() {
        let (h, _) = handoff();
        let begin = h.begin(None).unwrap();
        let done = h.complete(&begin.state, Some(&begin.session_ref)).unwrap();
        h.consume(&done.session_ref).unwrap();
        let begin_again = h.begin(Some(&done.session_ref)).unwrap();
        let again = h
            .complete(&begin_again.state, Some(&begin_again.session_ref))
            .unwrap();
        assert_ne!(again.identity, done.identity);
    }
}
