//! Work/break cycle tracker. The tracker is a pure state machine over explicit timestamps, the
//! caller feeds it `now` and persists [PomodoroState] between invocations.

pub mod store;

use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Work => write!(f, "work"),
            Phase::ShortBreak => write!(f, "short break"),
            Phase::LongBreak => write!(f, "long break"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PomodoroSettings {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    /// A long break follows every n-th completed work session.
    pub long_break_interval: u32,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_interval: 4,
        }
    }
}

impl PomodoroSettings {
    pub fn duration_of(&self, phase: Phase) -> Duration {
        let minutes = match phase {
            Phase::Work => self.work_minutes,
            Phase::ShortBreak => self.short_break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        };
        Duration::minutes(minutes.max(1) as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Status {
    Idle,
    Running { ends_at: DateTime<Utc> },
    Paused { remaining_seconds: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroState {
    pub phase: Phase,
    pub completed_sessions: u32,
    pub status: Status,
}

impl Default for PomodoroState {
    fn default() -> Self {
        Self {
            phase: Phase::Work,
            completed_sessions: 0,
            status: Status::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    pub completed_sessions: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PomodoroError {
    #[error("The {0} phase is already running")]
    AlreadyRunning(Phase),
    #[error("Nothing is running")]
    NotRunning,
    #[error("The timer isn't paused")]
    NotPaused,
}

pub struct PomodoroTracker {
    settings: PomodoroSettings,
    state: PomodoroState,
}

impl PomodoroTracker {
    pub fn new(settings: PomodoroSettings, state: PomodoroState) -> Self {
        Self { settings, state }
    }

    pub fn state(&self) -> &PomodoroState {
        &self.state
    }

    pub fn settings(&self) -> &PomodoroSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state.status, Status::Running { .. })
    }

    /// Time left in the current phase. An idle phase has its full length left.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.state.status {
            Status::Idle => self.settings.duration_of(self.state.phase),
            Status::Running { ends_at } => (ends_at - now).max(Duration::zero()),
            Status::Paused { remaining_seconds } => Duration::seconds(remaining_seconds.max(0)),
        }
    }

    /// Starts the current phase. A paused phase continues where it stopped.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), PomodoroError> {
        match self.state.status {
            Status::Running { .. } => Err(PomodoroError::AlreadyRunning(self.state.phase)),
            Status::Paused { .. } => self.resume(now),
            Status::Idle => {
                self.state.status = Status::Running {
                    ends_at: now + self.settings.duration_of(self.state.phase),
                };
                info!("Started {} phase", self.state.phase);
                Ok(())
            }
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), PomodoroError> {
        match self.state.status {
            Status::Running { .. } => {
                self.state.status = Status::Paused {
                    remaining_seconds: self.remaining(now).num_seconds(),
                };
                Ok(())
            }
            _ => Err(PomodoroError::NotRunning),
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), PomodoroError> {
        match self.state.status {
            Status::Paused { remaining_seconds } => {
                self.state.status = Status::Running {
                    ends_at: now + Duration::seconds(remaining_seconds.max(0)),
                };
                Ok(())
            }
            _ => Err(PomodoroError::NotPaused),
        }
    }

    /// Ends the current phase immediately. Skipping a work phase still counts it as completed.
    pub fn skip(&mut self) -> Transition {
        self.advance()
    }

    pub fn reset(&mut self) {
        self.state = PomodoroState::default();
    }

    /// Completes the running phase once its time is up. The next phase waits for `start`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        match self.state.status {
            Status::Running { ends_at } if now >= ends_at => Some(self.advance()),
            _ => None,
        }
    }

    fn advance(&mut self) -> Transition {
        let from = self.state.phase;
        let to = match from {
            Phase::Work => {
                self.state.completed_sessions += 1;
                let interval = self.settings.long_break_interval.max(1);
                if self.state.completed_sessions % interval == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
        };
        self.state.phase = to;
        self.state.status = Status::Idle;
        info!("Pomodoro moved from {from} to {to}");
        Transition {
            from,
            to,
            completed_sessions: self.state.completed_sessions,
        }
    }
}
