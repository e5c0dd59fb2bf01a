/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub max_rounds: u32,
    pub drawn: u32,
    pub answered: u32,
    pub remaining_rounds: u32,
    pub cards_left: usize,
    pub awaiting_answer: bool,
    pub is_ended: bool,
}

impl SessionProgress {
    /// Rounds that can still be played with the cards left in the deck.
    #[must_use]
    pub fn playable_rounds(&self) -> u32 {
        let cards_left = u32::try_from(self.cards_left).unwrap_or(u32::MAX);
        self.remaining_rounds.min(cards_left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playable_rounds_is_bounded_by_cards_left() {
        let progress = SessionProgress {
            max_rounds: 10,
            drawn: 2,
            answered: 2,
            remaining_rounds: 8,
            cards_left: 3,
            awaiting_answer: false,
            is_ended: false,
        };
        assert_eq!(progress.playable_rounds(), 3);

        let progress = SessionProgress {
            cards_left: 20,
            ..progress
        };
        assert_eq!(progress.playable_rounds(), 8);
    }
}
