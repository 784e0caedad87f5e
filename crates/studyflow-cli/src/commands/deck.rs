use clap::Subcommand;

use super::{print_json, with_workspace};

#[derive(Subcommand)]
pub enum DeckAction {
    /// Register a deck (study material)
    Add {
        /// Deck name
        name: String,
        /// Total page count
        #[arg(long)]
        pages: u32,
    },
    /// List registered decks
    List,
}

pub fn run(user: Option<String>, action: DeckAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DeckAction::Add { name, pages } => {
            let deck = with_workspace(user, |ws, _| ws.add_deck(&name, pages))?;
            print_json(&deck)?;
        }
        DeckAction::List => {
            let decks = with_workspace(user, |ws, _| ws.decks())?;
            print_json(&decks)?;
        }
    }
    Ok(())
}
