use anyhow::Result;

use crate::fs::state_file::StateFile;

use super::{PomodoroSettings, PomodoroState, PomodoroTracker};

/// Keeps the tracker in `pomodoro.json` so the cycle carries over between invocations.
pub struct PomodoroStore {
    file: StateFile<PomodoroState>,
    settings: PomodoroSettings,
}

impl PomodoroStore {
    pub fn new(file: StateFile<PomodoroState>, settings: PomodoroSettings) -> Self {
        Self { file, settings }
    }

    pub async fn load(&self) -> Result<PomodoroTracker> {
        let state = self.file.load().await?.unwrap_or_default();
        Ok(PomodoroTracker::new(self.settings, state))
    }

    pub async fn save(&self, tracker: &PomodoroTracker) -> Result<()> {
        self.file.save(tracker.state()).await
    }
}
