use std::{io::Write, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Subcommand;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    fs::state_file::StateFile,
    pomodoro::{store::PomodoroStore, PomodoroTracker, Status, Transition},
    utils::{clock::Clock, shutdown::detect_shutdown, time::format_clock},
};

use super::Context;

#[derive(Debug, Subcommand)]
pub enum PomodoroCommand {
    #[command(about = "Show the current phase and the time left")]
    Status,
    #[command(about = "Start the current phase, or continue a paused one")]
    Start,
    #[command(about = "Freeze the time left")]
    Pause,
    #[command(about = "Continue a paused phase")]
    Resume,
    #[command(about = "End the current phase now")]
    Skip,
    #[command(about = "Back to an idle work phase with no completed sessions")]
    Reset,
    #[command(about = "Run a live countdown until Ctrl-C")]
    Run {
        #[arg(long, help = "Start the next phase automatically when one ends")]
        cycle: bool,
    },
}

fn status_line(tracker: &PomodoroTracker, now: chrono::DateTime<chrono::Utc>) -> String {
    let state = tracker.state();
    let status = match state.status {
        Status::Idle => "idle",
        Status::Running { .. } => "running",
        Status::Paused { .. } => "paused",
    };
    format!(
        "{}\t{}\t{}\tcompleted {}",
        tracker.phase(),
        status,
        format_clock(tracker.remaining(now)),
        state.completed_sessions
    )
}

fn transition_line(transition: &Transition) -> String {
    format!(
        "\x07{} finished, next up {} ({} completed)",
        transition.from, transition.to, transition.completed_sessions
    )
}

/// The tracker runs offline, it only needs the local state file.
pub async fn process_pomodoro_command(context: &Context, command: PomodoroCommand) -> Result<()> {
    let store = PomodoroStore::new(
        StateFile::new(context.config.pomodoro_path()),
        context.config.pomodoro,
    );
    let clock = context.clock.clone();
    let mut tracker = store.load().await?;
    let now = clock.time();
    if let Some(transition) = tracker.tick(now) {
        println!("{}", transition_line(&transition));
    }

    match command {
        PomodoroCommand::Status => {}
        PomodoroCommand::Start => tracker.start(now)?,
        PomodoroCommand::Pause => tracker.pause(now)?,
        PomodoroCommand::Resume => tracker.resume(now)?,
        PomodoroCommand::Skip => println!("{}", transition_line(&tracker.skip())),
        PomodoroCommand::Reset => tracker.reset(),
        PomodoroCommand::Run { cycle } => {
            let cancelation = CancellationToken::new();
            let view = async {
                let result =
                    run_countdown(&mut tracker, &store, clock.clone(), cancelation.clone(), cycle)
                        .await;
                cancelation.cancel();
                result
            };
            let ((), result) = tokio::join!(detect_shutdown(cancelation.clone()), view);
            println!();
            result?;
        }
    }
    store.save(&tracker).await?;
    println!("{}", status_line(&tracker, clock.time()));
    Ok(())
}

/// Ticks once per second, redrawing the countdown in place. Every finished phase is saved right
/// away. Returns after the first finished phase unless `cycle` is set, or when `cancelation` fires.
async fn run_countdown(
    tracker: &mut PomodoroTracker,
    store: &PomodoroStore,
    clock: Arc<dyn Clock>,
    cancelation: CancellationToken,
    cycle: bool,
) -> Result<()> {
    if !tracker.is_running() {
        tracker.start(clock.time())?;
        store.save(tracker).await?;
    }
    loop {
        let now = clock.time();
        if let Some(transition) = tracker.tick(now) {
            println!("\r\x1b[2K{}", transition_line(&transition));
            if cycle {
                tracker.start(now)?;
            }
            store.save(tracker).await?;
            if !cycle {
                return Ok(());
            }
        }
        print!("\r\x1b[2K{}", status_line(tracker, now));
        std::io::stdout().flush()?;
        select! {
            biased;
            _ = cancelation.cancelled() => {
                debug!("Pomodoro countdown cancelled");
                return Ok(());
            },
            _ = clock.sleep(Duration::from_secs(1)) => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;
    use crate::{
        pomodoro::{Phase, PomodoroSettings, PomodoroState},
        utils::{clock::test_clock::ManualClock, logging::TEST_LOGGING},
    };

    fn settings() -> PomodoroSettings {
        PomodoroSettings {
            work_minutes: 1,
            short_break_minutes: 1,
            long_break_minutes: 1,
            long_break_interval: 2,
        }
    }

    #[tokio::test]
    async fn countdown_stops_after_the_phase_ends() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = PomodoroStore::new(StateFile::new(dir.path().join("pomodoro.json")), settings());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        ));
        let mut tracker = store.load().await?;

        run_countdown(&mut tracker, &store, clock, CancellationToken::new(), false).await?;

        assert_eq!(tracker.phase(), Phase::ShortBreak);
        assert_eq!(tracker.state().status, Status::Idle);
        let saved = store.load().await?;
        assert_eq!(saved.state().completed_sessions, 1);
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_countdown_leaves_the_phase_running() -> Result<()> {
        let dir = tempdir()?;
        let store = PomodoroStore::new(StateFile::new(dir.path().join("pomodoro.json")), settings());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        ));
        let mut tracker = PomodoroTracker::new(settings(), PomodoroState::default());
        let cancelation = CancellationToken::new();
        cancelation.cancel();

        run_countdown(&mut tracker, &store, clock, cancelation, true).await?;

        assert_eq!(tracker.phase(), Phase::Work);
        assert!(tracker.is_running());
        let saved = store.load().await?;
        assert!(saved.is_running());
        Ok(())
    }
}
