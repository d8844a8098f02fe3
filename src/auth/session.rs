//! Session state shared with the UI

use serde::{Deserialize, Serialize};

use super::types::User;

/// Lifecycle of the session context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Constructed, `initialize` not called yet
    Uninitialized,
    /// Reconciling cached state against the backend
    Loading,
    Authenticated,
    Anonymous,
}

/// Authentication state as seen by consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "isAuthenticated")]
    pub is_authenticated: bool,

    pub user: Option<User>,

    /// `true` while a session operation is in flight
    pub loading: bool,

    pub state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            loading: true,
            state: SessionState::Uninitialized,
        }
    }
}

impl Session {
    pub(crate) fn authenticate(&mut self, user: User) {
        self.is_authenticated = true;
        self.user = Some(user);
        self.state = SessionState::Authenticated;
    }

    pub(crate) fn sign_out(&mut self) {
        self.is_authenticated = false;
        self.user = None;
        self.state = SessionState::Anonymous;
    }
}

/// Result of a public session operation.
///
/// Session operations never fail with an error; they report it here instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    pub fn with_user(user: User) -> Self {
        Self {
            success: true,
            user: Some(user),
            ..Default::default()
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
