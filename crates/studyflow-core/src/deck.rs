//! Deck registry: the reference catalog of study materials.
//!
//! A deck is a name plus a page extent. Tasks point at a deck by name and
//! their page ranges are bounded by its `total_pages`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    pub total_pages: u32,
}

/// Decks owned by one user, kept in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckRegistry {
    decks: Vec<Deck>,
}

impl DeckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new deck. Names are trimmed and must be unique.
    pub fn add(&mut self, name: &str, total_pages: u32) -> Result<Deck> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "deck name" }.into());
        }
        if total_pages == 0 {
            return Err(ValidationError::OutOfRange {
                field: "total_pages",
                value: 0,
                min: 1,
                max: u32::MAX as i64,
            }
            .into());
        }
        if self.get(name).is_some() {
            return Err(CoreError::conflict(format!("deck '{name}' already exists")));
        }

        let deck = Deck {
            name: name.to_string(),
            total_pages,
        };
        self.decks.push(deck.clone());
        Ok(deck)
    }

    pub fn get(&self, name: &str) -> Option<&Deck> {
        self.decks.iter().find(|d| d.name == name)
    }

    /// Like [`get`](Self::get) but missing decks are an error.
    pub fn require(&self, name: &str) -> Result<&Deck> {
        self.get(name.trim())
            .ok_or_else(|| CoreError::not_found("Deck", name.trim()))
    }

    pub fn list(&self) -> &[Deck] {
        &self.decks
    }

    pub fn len(&self) -> usize {
        self.decks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_lookup() {
        let mut decks = DeckRegistry::new();
        let added = decks.add("  Chart式 数学I  ", 320).unwrap();
        assert_eq!(added.name, "Chart式 数学I");
        let deck = decks.require("Chart式 数学I").unwrap();
        assert_eq!(deck, &added);
    }

    #[test]
    fn duplicate_name_conflicts() {
        let mut decks = DeckRegistry::new();
        decks.add("英単語ターゲット", 400).unwrap();
        let err = decks.add("英単語ターゲット", 200).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(decks.len(), 1);
    }

    #[test]
    fn rejects_blank_name_and_zero_pages() {
        let mut decks = DeckRegistry::new();
        assert!(matches!(
            decks.add("   ", 10),
            Err(CoreError::Validation(ValidationError::Empty { .. }))
        ));
        assert!(matches!(
            decks.add("Physics", 0),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(decks.is_empty());
    }

    #[test]
    fn missing_deck_is_not_found() {
        let decks = DeckRegistry::new();
        assert!(matches!(
            decks.require("nope"),
            Err(CoreError::NotFound { kind: "Deck", .. })
        ));
    }
}
