//! Property-based tests for the session state machine.
//!
//! Arbitrary interleavings of connectivity, restore, verification and
//! credential events must never leave an authenticated user behind an
//! invalid verification.

use proptest::prelude::*;
use roomline_core::{
    Session, SessionAction, SessionEvent, SessionPhase, TokenVerification,
};

fn event_strategy() -> impl Strategy<Value = SessionEvent> {
    prop_oneof![
        2 => Just(SessionEvent::Connected),
        1 => Just(SessionEvent::Reconnected),
        2 => Just(SessionEvent::Disconnected),
        2 => prop::option::of("[a-z0-9]{1,8}").prop_map(SessionEvent::TokenRestored),
        3 => any::<bool>().prop_map(|valid| SessionEvent::TokenVerified(TokenVerification { valid })),
        1 => Just(SessionEvent::VerifyFailed { reason: "timeout".into() }),
        3 => "[a-z]{1,8}".prop_map(|username| SessionEvent::CredentialsFetched { username }),
        1 => Just(SessionEvent::CredentialsFailed { reason: "denied".into() }),
        1 => "[a-z0-9]{1,8}".prop_map(|token| SessionEvent::LoginSucceeded { token }),
        1 => Just(SessionEvent::TokenExpired),
        1 => "[a-z0-9]{1,8}".prop_map(|token| SessionEvent::TokenRefreshed { token }),
    ]
}

fn bootstrapped() -> Session {
    let mut session = Session::new();
    let _ = session.start();
    let _ = session.handle(SessionEvent::ResourcesLoaded);
    session
}

proptest! {
    #[test]
    fn prop_user_requires_valid_verification(events in prop::collection::vec(event_strategy(), 0..60)) {
        let mut session = bootstrapped();

        for event in events {
            let _ = session.handle(event);
            if session.authenticated_user().is_some() {
                prop_assert_eq!(session.verification(), Some(TokenVerification::VALID));
            }
        }
    }

    #[test]
    fn prop_invalidation_clears_user(
        events in prop::collection::vec(event_strategy(), 0..40),
        expire in any::<bool>(),
    ) {
        let mut session = bootstrapped();
        for event in events {
            let _ = session.handle(event);
        }

        let was_logged_in = session.is_logged_in();
        let terminal = if expire {
            SessionEvent::TokenExpired
        } else {
            SessionEvent::TokenVerified(TokenVerification::INVALID)
        };
        let actions = session.handle(terminal);

        prop_assert_eq!(session.authenticated_user(), None);
        prop_assert!(!session.is_logged_in());
        if expire && !was_logged_in {
            // Nothing to expire: no notice, no phase change.
            prop_assert!(actions.is_empty());
        } else {
            prop_assert_eq!(session.phase(), SessionPhase::LoginRequired);
        }
        if expire && was_logged_in {
            prop_assert!(actions.contains(&SessionAction::ClearToken));
            prop_assert_eq!(session.session_token(), None);
        }
    }

    #[test]
    fn prop_verify_always_follows_credential(events in prop::collection::vec(event_strategy(), 0..60)) {
        let mut session = bootstrapped();

        for event in events {
            let actions = session.handle(event);
            if let Some(verify) = actions.iter().position(|a| *a == SessionAction::VerifyToken) {
                let assigned = actions[..verify]
                    .iter()
                    .any(|a| matches!(a, SessionAction::SetCredential { token: Some(_) }));
                prop_assert!(assigned);
            }
        }
    }

    #[test]
    fn prop_bootstrap_is_sticky(events in prop::collection::vec(event_strategy(), 0..60)) {
        let mut session = bootstrapped();
        let mut completed = false;

        for event in events {
            let _ = session.handle(event);
            if completed {
                prop_assert!(session.bootstrap_complete());
            }
            completed = session.bootstrap_complete();
        }
    }

    #[test]
    fn prop_reconnect_never_logs_in(events in prop::collection::vec(event_strategy(), 0..40)) {
        let mut session = bootstrapped();
        for event in events {
            let _ = session.handle(event);
        }

        for event in [SessionEvent::Connected, SessionEvent::Reconnected] {
            let actions = session.handle(event);
            let logs_in = actions.iter().any(|a| matches!(a, SessionAction::Login { .. }));
            prop_assert!(!logs_in);
        }
    }
}
