use thiserror::Error;

use crate::api::entities::User;

use super::AuthState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("You are not logged in. Run `timeflow login` first")]
    NotAuthenticated,
    #[error("Already logged in as {0}. Run `timeflow logout` first")]
    AlreadyAuthenticated(String),
}

/// Commands that talk to protected endpoints go through this first.
pub fn require_auth(state: &AuthState) -> Result<&User, GuardError> {
    match (&state.user, &state.access_token) {
        (Some(user), Some(_)) => Ok(user),
        _ => Err(GuardError::NotAuthenticated),
    }
}

/// Login and registration only make sense without a session.
pub fn require_guest(state: &AuthState) -> Result<(), GuardError> {
    match &state.user {
        Some(user) if state.access_token.is_some() => {
            Err(GuardError::AlreadyAuthenticated(user.email.clone()))
        }
        _ => Ok(()),
    }
}
