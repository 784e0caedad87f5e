use clap::Subcommand;
use studyflow_core::StudyAnalyzer;

use super::{print_json, with_workspace};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Print study analytics as JSON
    Show {
        /// Override the UTC offset (minutes) used for per-day buckets
        #[arg(long, allow_hyphen_values = true)]
        utc_offset: Option<i32>,
    },
}

pub fn run(user: Option<String>, action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        StatsAction::Show { utc_offset } => {
            let report = with_workspace(user, |ws, config| {
                let analyzer = match utc_offset {
                    Some(minutes) => StudyAnalyzer::with_offset_minutes(minutes)?,
                    None => config.analyzer()?,
                };
                ws.analytics(&analyzer)
            })?;
            print_json(&report)?;
        }
    }
    Ok(())
}
