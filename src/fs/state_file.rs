use std::{io::ErrorKind, marker::PhantomData, path::PathBuf};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, warn};

/// A single JSON document on disk. This is the terminal equivalent of a browser local storage
/// slot: the session and the pomodoro tracker each own one.
///
/// Reads take a shared lock, writes an exclusive one, so two `timeflow` processes never observe a
/// half-written document.
pub struct StateFile<T> {
    path: PathBuf,
    _value: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> StateFile<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _value: PhantomData,
        }
    }

    /// Returns `None` when the file does not exist or holds something that isn't a valid `T`.
    /// A broken file is treated like a missing one since it's only ever a cache of remote state.
    pub async fn load(&self) -> Result<Option<T>> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };
        file.lock_shared()?;
        let mut content = String::new();
        let read = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        read?;

        debug!("Loaded state from {:?}", self.path);
        match serde_json::from_str::<T>(&content) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                warn!("Ignoring illegal state in {:?}: {e}", self.path);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(value)?;

        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;
        file.lock_exclusive()?;
        let result = Self::overwrite(&mut file, &content).await;
        file.unlock_async().await?;
        debug!("Saved state to {:?}", self.path);
        result
    }

    async fn overwrite(file: &mut File, content: &[u8]) -> Result<()> {
        file.set_len(0).await?;
        file.rewind().await?;
        file.write_all(content).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
