use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

/// Resolves the default application directory and makes sure it exists. Session, pomodoro state,
/// config and logs all live there.
pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        cfg_if::cfg_if! {
            if #[cfg(windows)] {
                let mut path = PathBuf::from(
                    env::var("APPDATA").map_err(|_| anyhow!("APPDATA should be present on Windows"))?,
                );
                path.push("timeflow");
                path
            } else {
                let mut path = env::var("XDG_STATE_HOME")
                    .map(PathBuf::from)
                    .or_else(|_| {
                        env::var("HOME").map(|home| {
                            let mut path = PathBuf::from(home);
                            path.push(".local/state");
                            path
                        })
                    })
                    .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
                path.push("timeflow");
                path
            }
        }
    };

    ensure_dir(path)
}

pub fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}
