//! Standard invariant checks.

use std::collections::HashSet;

use roomline_app::MAX_NOTICES;

use super::{Invariant, InvariantResult, SystemSnapshot};

/// A known user implies the last verification was valid.
///
/// Expiry and a failed verification must clear the user. Skipped when the
/// verification outcome is not observable.
pub struct UserRequiresValidToken;

impl Invariant for UserRequiresValidToken {
    fn name(&self) -> &'static str {
        "user_requires_valid_token"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if !state.verification_observed {
            return Ok(());
        }
        if let Some(user) = &state.user
            && !state.verification.is_some_and(|v| v.valid)
        {
            return Err(self.violation(format!(
                "user {user} known with verification {:?}",
                state.verification
            )));
        }
        if state.logged_in && !state.verification.is_some_and(|v| v.valid) {
            return Err(self.violation(format!(
                "chat screen shown with verification {:?}",
                state.verification
            )));
        }
        Ok(())
    }
}

/// The chat room is open exactly while the chat screen is shown.
pub struct RoomFollowsLogin;

impl Invariant for RoomFollowsLogin {
    fn name(&self) -> &'static str {
        "room_follows_login"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.room.is_some() != state.logged_in {
            return Err(self.violation(format!(
                "room open: {}, logged in: {}",
                state.room.is_some(),
                state.logged_in
            )));
        }
        Ok(())
    }
}

/// The chat screen never shows before bootstrap completes.
pub struct BootstrapBeforeChat;

impl Invariant for BootstrapBeforeChat {
    fn name(&self) -> &'static str {
        "bootstrap_before_chat"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.loading && state.logged_in {
            return Err(self.violation("chat screen shown while loading".into()));
        }
        Ok(())
    }
}

/// Messages are sorted by creation time, oldest first.
pub struct MessagesOrdered;

impl Invariant for MessagesOrdered {
    fn name(&self) -> &'static str {
        "messages_ordered"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let Some(room) = &state.room else { return Ok(()) };
        for window in room.messages.windows(2) {
            if window[1].created_at < window[0].created_at {
                return Err(self.violation(format!(
                    "{} ({}) listed after {} ({})",
                    window[1].id, window[1].created_at, window[0].id, window[0].created_at
                )));
            }
        }
        Ok(())
    }
}

/// No message id appears twice in the room.
pub struct MessageIdsUnique;

impl Invariant for MessageIdsUnique {
    fn name(&self) -> &'static str {
        "message_ids_unique"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let Some(room) = &state.room else { return Ok(()) };
        let mut seen = HashSet::with_capacity(room.messages.len());
        for message in &room.messages {
            if !seen.insert(message.id.as_str()) {
                return Err(self.violation(format!("message {} listed twice", message.id)));
            }
        }
        Ok(())
    }
}

/// Undrained notices never exceed [`MAX_NOTICES`].
pub struct NoticesBounded;

impl Invariant for NoticesBounded {
    fn name(&self) -> &'static str {
        "notices_bounded"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.notice_count > MAX_NOTICES {
            return Err(self.violation(format!(
                "{} notices retained, cap is {MAX_NOTICES}",
                state.notice_count
            )));
        }
        Ok(())
    }
}
