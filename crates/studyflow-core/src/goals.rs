//! Long-term and short-term study goals.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    /// e.g. "Pass the entrance exam"
    pub long_term: Option<String>,
    /// e.g. "Finish the basic math workbook this month"
    pub short_term: Option<String>,
}

impl Goals {
    /// Update the provided fields; a blank value clears that goal.
    pub fn update(&mut self, long_term: Option<&str>, short_term: Option<&str>) {
        if let Some(text) = long_term {
            self.long_term = non_blank(text);
        }
        if let Some(text) = short_term {
            self.short_term = non_blank(text);
        }
    }
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_only_touches_given_fields() {
        let mut goals = Goals::default();
        goals.update(Some("〇〇大学合格！"), None);
        goals.update(None, Some("今月中に数学の基礎問題集を終わらせる"));
        assert_eq!(goals.long_term.as_deref(), Some("〇〇大学合格！"));
        assert!(goals.short_term.is_some());

        goals.update(None, Some("  "));
        assert_eq!(goals.short_term, None);
        assert!(goals.long_term.is_some());
    }
}
