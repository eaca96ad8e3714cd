//! Terminal client for a personal time tracking service. Track time on activities, annotate the
//! sessions, run pomodoro cycles and look at totals, streaks and a heatmap of your days.
//!

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod fs;
pub mod pomodoro;
pub mod query;
pub mod session;
pub mod utils;
pub mod validation;
