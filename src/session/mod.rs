//! Who is logged in. The [AuthStore] is shared by the API client (which reads and rotates
//! tokens) and the commands (which check guards). Anything interested in login/logout subscribes
//! to it.

pub mod guards;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info};

use crate::{api::entities::User, fs::state_file::StateFile};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }
}

pub struct AuthStore {
    state: watch::Sender<AuthState>,
    file: Option<StateFile<AuthState>>,
}

impl AuthStore {
    /// A store that forgets everything when the process exits.
    pub fn in_memory() -> Self {
        Self {
            state: watch::Sender::new(AuthState::default()),
            file: None,
        }
    }

    /// Restores the previous session from `file` and keeps it in sync from now on.
    pub async fn persistent(file: StateFile<AuthState>) -> Result<Self> {
        let initial = file.load().await?.unwrap_or_default();
        Ok(Self {
            state: watch::Sender::new(initial),
            file: Some(file),
        })
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.borrow().refresh_token.clone()
    }

    /// Every change to the state is delivered to the returned receiver.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub async fn sign_in(
        &self,
        user: User,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Result<()> {
        info!("Signed in as {}", user.email);
        self.state.send_modify(|state| {
            state.user = Some(user);
            state.access_token = Some(access_token);
            if refresh_token.is_some() {
                state.refresh_token = refresh_token;
            }
        });
        self.persist().await
    }

    /// Stores rotated tokens. A missing refresh token keeps the current one.
    pub async fn update_tokens(
        &self,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Result<()> {
        self.state.send_modify(|state| {
            state.access_token = Some(access_token);
            if refresh_token.is_some() {
                state.refresh_token = refresh_token;
            }
        });
        self.persist().await
    }

    pub async fn set_user(&self, user: User) -> Result<()> {
        self.state.send_if_modified(|state| {
            let changed = state.user.as_ref() != Some(&user);
            state.user = Some(user);
            changed
        });
        self.persist().await
    }

    pub async fn clear(&self) -> Result<()> {
        info!("Clearing session");
        self.state.send_replace(AuthState::default());
        match &self.file {
            Some(file) => file.remove().await,
            None => Ok(()),
        }
    }

    async fn persist(&self) -> Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let snapshot = self.snapshot();
        file.save(&snapshot)
            .await
            .inspect_err(|e| error!("Failed to persist session {e:?}"))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;
    use uuid::Uuid;

    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            name: Some("Ada".into()),
        }
    }

    #[tokio::test]
    async fn subscribers_see_sign_in_and_clear() -> Result<()> {
        let store = AuthStore::in_memory();
        let mut receiver = store.subscribe();

        store
            .sign_in(user(), "access".into(), Some("refresh".into()))
            .await?;
        assert!(receiver.has_changed()?);
        assert!(receiver.borrow_and_update().is_authenticated());

        store.clear().await?;
        assert!(receiver.has_changed()?);
        assert_eq!(*receiver.borrow_and_update(), AuthState::default());
        Ok(())
    }

    #[tokio::test]
    async fn token_update_keeps_refresh_token_when_not_rotated() -> Result<()> {
        let store = AuthStore::in_memory();
        store
            .sign_in(user(), "a1".into(), Some("r1".into()))
            .await?;
        store.update_tokens("a2".into(), None).await?;
        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));

        store.update_tokens("a3".into(), Some("r2".into())).await?;
        assert_eq!(store.refresh_token().as_deref(), Some("r2"));
        Ok(())
    }

    #[tokio::test]
    async fn setting_same_user_does_not_notify() -> Result<()> {
        let store = AuthStore::in_memory();
        let user = user();
        store.sign_in(user.clone(), "a".into(), None).await?;
        let mut receiver = store.subscribe();
        receiver.borrow_and_update();

        store.set_user(user).await?;
        assert!(!receiver.has_changed()?);
        Ok(())
    }

    #[tokio::test]
    async fn session_survives_restart_until_cleared() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");

        let store = AuthStore::persistent(StateFile::new(path.clone())).await?;
        store
            .sign_in(user(), "access".into(), Some("refresh".into()))
            .await?;

        let restored = AuthStore::persistent(StateFile::new(path.clone())).await?;
        assert!(restored.snapshot().is_authenticated());
        assert_eq!(restored.refresh_token().as_deref(), Some("refresh"));

        restored.clear().await?;
        let after_logout = AuthStore::persistent(StateFile::new(path)).await?;
        assert_eq!(after_logout.snapshot(), AuthState::default());
        Ok(())
    }
}
