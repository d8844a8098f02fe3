//! Session context: the authenticated-user state shared across the app
//!
//! Build one [`SessionContext`] at the application root and hand out
//! references (or `Arc`s) to it. Consumers read the current [`Session`] or
//! [`SessionContext::subscribe`] to changes; dropping the context closes every
//! subscription.

mod session;
mod types;

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::watch;

use crate::api::{response_message, AuthApi};
use crate::error::{handle_api_error, Error};
use crate::fetch::ApiResponse;
use crate::storage::{keys, LocalStore};

pub use session::*;
pub use types::*;

/// Keys describing the signed-in user, cleared when the backend rejects the session
const SESSION_KEYS: [&str; 3] = [keys::IS_AUTHENTICATED, keys::USER_DATA, keys::USER_EMAIL];

/// Keys cleared on logout
const LOGOUT_KEYS: [&str; 4] = [
    keys::IS_AUTHENTICATED,
    keys::USER_DATA,
    keys::USER_EMAIL,
    keys::REMEMBER_ME,
];

/// Process-wide authentication state
pub struct SessionContext {
    api: AuthApi,
    store: LocalStore,
    state: watch::Sender<Session>,
    pending: AtomicUsize,
}

/// Keeps `loading` set while at least one operation is in flight
struct LoadingGuard<'a> {
    context: &'a SessionContext,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        // Counter and flag change under the same channel lock
        let pending = &self.context.pending;
        self.context.state.send_modify(|s| {
            if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                s.loading = false;
            }
        });
    }
}

impl SessionContext {
    pub fn new(api: AuthApi, store: LocalStore) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            api,
            store,
            state,
            pending: AtomicUsize::new(0),
        }
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receive every future session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.state.send_modify(|s| {
            self.pending.fetch_add(1, Ordering::SeqCst);
            s.loading = true;
        });
        LoadingGuard { context: self }
    }

    /// Restore the cached session, then reconcile it with `/api/auth/me`.
    ///
    /// The cached state is published immediately. If the backend rejects the
    /// session, or cannot be reached, the cached state is wiped and the user
    /// is signed out.
    pub async fn initialize(&self) {
        let _loading = self.begin_loading();
        self.state.send_modify(|s| s.state = SessionState::Loading);

        if let Some(user) = self.cached_session() {
            debug!("Restored cached session");
            self.state.send_modify(|s| {
                s.is_authenticated = true;
                s.user = user;
            });
        }

        match self.api.current_user().await {
            Ok(response) => match response.data.user {
                Some(user) => {
                    self.persist_user(&user);
                    self.state.send_modify(|s| s.authenticate(user));
                }
                None => self.state.send_modify(|s| {
                    s.state = if s.is_authenticated {
                        SessionState::Authenticated
                    } else {
                        SessionState::Anonymous
                    };
                }),
            },
            Err(e) => {
                debug!("Session verification failed: {}", e);
                self.clear_keys(&SESSION_KEYS);
                self.state.send_modify(Session::sign_out);
            }
        }
    }

    /// `Some(user)` when the store says a user is signed in. The inner value is
    /// `None` if no profile was cached alongside the flag.
    fn cached_session(&self) -> Option<Option<User>> {
        match self.store.get_flag(keys::IS_AUTHENTICATED) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("Cannot read cached authentication flag: {}", e);
                return None;
            }
        }
        match self.store.get_json::<User>(keys::USER_DATA) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Ignoring unreadable cached user: {}", e);
                None
            }
        }
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> Outcome {
        let _loading = self.begin_loading();
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };

        match self.api.login(&credentials).await.and_then(require_user) {
            Ok(user) => {
                info!("Signed in as {}", email);
                self.persist_sign_in(&user, email, remember_me);
                self.state.send_modify(|s| s.authenticate(user.clone()));
                Outcome::with_user(user)
            }
            Err(e) => Outcome::failure(handle_api_error(&e, "Login failed")),
        }
    }

    /// Register a new account and sign in as it
    pub async fn signup(&self, form: &SignupForm) -> Outcome {
        let _loading = self.begin_loading();

        match self.api.register(form).await.and_then(require_user) {
            Ok(user) => {
                info!("Registered {}", form.email);
                self.persist_sign_in(&user, &form.email, false);
                self.state.send_modify(|s| s.authenticate(user.clone()));
                Outcome::with_user(user)
            }
            Err(e) => Outcome::failure(handle_api_error(&e, "Registration failed")),
        }
    }

    /// Sign out. The backend call is best-effort; local state is always cleared.
    pub async fn logout(&self) {
        let _loading = self.begin_loading();

        if let Err(e) = self.api.logout().await {
            warn!("Logout API call failed: {}", e);
        }
        self.clear_keys(&LOGOUT_KEYS);
        self.state.send_modify(Session::sign_out);
    }

    /// Merge `changes` into the current profile and persist it. Local only.
    pub fn update_user(&self, changes: Value) -> Outcome {
        let Value::Object(changes) = changes else {
            return Outcome::failure("User update must be a JSON object");
        };

        let current = self.user().unwrap_or_default();
        let merged = serde_json::to_value(current).map_err(Error::from).and_then(|base| {
            let mut fields = match base {
                Value::Object(fields) => fields,
                _ => Default::default(),
            };
            fields.extend(changes);
            Ok(serde_json::from_value::<User>(Value::Object(fields))?)
        });

        match merged {
            Ok(user) => {
                if let Err(e) = self.store.set_json(keys::USER_DATA, &user) {
                    warn!("Cannot persist user: {}", e);
                }
                self.state.send_modify(|s| s.user = Some(user.clone()));
                Outcome::with_user(user)
            }
            Err(e) => Outcome::failure(handle_api_error(&e, "Failed to update user")),
        }
    }

    /// Ask the backend to send a password reset email
    pub async fn reset_password(&self, email: &str) -> Outcome {
        let _loading = self.begin_loading();

        match self.api.forgot_password(email).await {
            Ok(response) => Outcome::with_message(
                response_message(&response.data)
                    .unwrap_or_else(|| "Password reset email sent".to_string()),
            ),
            Err(e) => Outcome::failure(handle_api_error(&e, "Failed to send reset email")),
        }
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Outcome {
        let _loading = self.begin_loading();
        let change = PasswordChange {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };

        match self.api.change_password(&change).await {
            Ok(response) => Outcome::with_message(
                response_message(&response.data)
                    .unwrap_or_else(|| "Password changed successfully".to_string()),
            ),
            Err(e) => Outcome::failure(handle_api_error(&e, "Failed to change password")),
        }
    }

    fn persist_user(&self, user: &User) {
        let result = self
            .store
            .set_flag(keys::IS_AUTHENTICATED, true)
            .and_then(|_| self.store.set_json(keys::USER_DATA, user));
        if let Err(e) = result {
            warn!("Cannot persist session: {}", e);
        }
    }

    fn persist_sign_in(&self, user: &User, email: &str, remember_me: bool) {
        self.persist_user(user);
        let mut result = self.store.set(keys::USER_EMAIL, email);
        if remember_me {
            result = result.and_then(|_| self.store.set_flag(keys::REMEMBER_ME, true));
        }
        if let Err(e) = result {
            warn!("Cannot persist session: {}", e);
        }
    }

    fn clear_keys(&self, keys: &[&str]) {
        // Keep going past failures so as much as possible is cleared
        for key in keys {
            if let Err(e) = self.store.remove(key) {
                warn!("Cannot clear {}: {}", key, e);
            }
        }
    }
}

/// A sign-in response is only usable when it carries a user
fn require_user(response: ApiResponse<AuthResponse>) -> Result<User, Error> {
    response
        .data
        .user
        .ok_or_else(|| Error::invalid_response("Invalid response from server"))
}
