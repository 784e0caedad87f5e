use clap::Subcommand;
use studyflow_core::{SessionMode, StopRequest, TaskId};

use super::{print_json, with_workspace};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a study session on a task
    Start {
        /// Task ID
        task_id: TaskId,
        /// Plan a pomodoro; minutes default to timer.pomodoro_minutes
        #[arg(long, num_args = 0..=1)]
        pomodoro: Option<Option<u32>>,
    },
    /// Print current timer state as JSON
    Status,
    /// Print elapsed seconds of the running session
    Elapsed,
    /// Stop the running session and record it
    Stop {
        /// Concentration rating (1-10)
        #[arg(long)]
        rating: Option<u8>,
        /// Free-form memo
        #[arg(long)]
        memo: Option<String>,
    },
    /// Drop a session whose task no longer exists
    DiscardOrphan,
}

pub fn run(user: Option<String>, action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Start { task_id, pomodoro } => {
            let event = with_workspace(user, |ws, config| {
                let mode = match pomodoro {
                    None => SessionMode::Open,
                    Some(minutes) => {
                        SessionMode::pomodoro(minutes.unwrap_or(config.timer.pomodoro_minutes))
                    }
                };
                ws.start(task_id, mode)
            })?;
            print_json(&event)?;
        }
        TimerAction::Status => {
            let event = with_workspace(user, |ws, _| ws.status())?;
            print_json(&event)?;
        }
        TimerAction::Elapsed => {
            let secs = with_workspace(user, |ws, _| ws.elapsed())?;
            print_json(&serde_json::json!({ "elapsed_secs": secs }))?;
        }
        TimerAction::Stop { rating, memo } => {
            let completion = with_workspace(user, |ws, _| {
                ws.stop(StopRequest {
                    concentration: rating,
                    memo,
                })
            })?;
            print_json(&completion.event())?;
        }
        TimerAction::DiscardOrphan => {
            let event = with_workspace(user, |ws, _| ws.discard_orphan())?;
            print_json(&event)?;
        }
    }
    Ok(())
}
