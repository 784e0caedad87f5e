use clap::Subcommand;

use super::{print_json, with_workspace};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Set goals; an empty string clears one
    Set {
        /// Long-term goal
        #[arg(long)]
        long: Option<String>,
        /// Short-term goal
        #[arg(long)]
        short: Option<String>,
    },
    /// Print current goals
    Show,
}

pub fn run(user: Option<String>, action: GoalAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        GoalAction::Set { long, short } => {
            let goals =
                with_workspace(user, |ws, _| ws.set_goals(long.as_deref(), short.as_deref()))?;
            print_json(&goals)?;
        }
        GoalAction::Show => {
            let goals = with_workspace(user, |ws, _| ws.goals())?;
            print_json(&goals)?;
        }
    }
    Ok(())
}
