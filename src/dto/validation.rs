//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::game::history::GameHistory;

/// Number of characters in a player tag.
pub const INITIALS_LEN: usize = 3;

/// Validates that player initials are exactly three ASCII letters.
///
/// # Examples
///
/// ```ignore
/// validate_initials("ABC") // Ok
/// validate_initials("abc") // Ok, stored upper-case
/// validate_initials("AB")  // Err - too short
/// validate_initials("A1C") // Err - digit
/// ```
pub fn validate_initials(initials: &str) -> Result<(), ValidationError> {
    if initials.chars().count() != INITIALS_LEN {
        let mut err = ValidationError::new("initials_length");
        err.message = Some(
            format!(
                "Initials must be exactly {INITIALS_LEN} letters (got {})",
                initials.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    if !initials.chars().all(|c| c.is_ascii_alphabetic()) {
        let mut err = ValidationError::new("initials_format");
        err.message = Some("Initials must contain only letters A-Z".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that every entry of a letter sequence is one letter A-Z.
pub fn validate_sequence_letters(letters: &[String]) -> Result<(), ValidationError> {
    if let Some(bad) = letters.iter().find(|entry| {
        let mut chars = entry.chars();
        !matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
    }) {
        let mut err = ValidationError::new("sequence_letter");
        err.message = Some(format!("`{bad}` is not a single letter A-Z").into());
        return Err(err);
    }
    Ok(())
}

/// Validates that the category totals of a history agree with its events.
pub fn validate_history(history: &GameHistory) -> Result<(), ValidationError> {
    if history.is_consistent() {
        Ok(())
    } else {
        let mut err = ValidationError::new("history_totals");
        err.message = Some("History totals do not match its events".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use crate::game::history::HistoryEvent;

    use super::*;

    #[test]
    fn test_validate_initials_valid() {
        assert!(validate_initials("ABC").is_ok());
        assert!(validate_initials("xyz").is_ok());
    }

    #[test]
    fn test_validate_initials_invalid() {
        assert!(validate_initials("AB").is_err()); // too short
        assert!(validate_initials("ABCD").is_err()); // too long
        assert!(validate_initials("A1C").is_err()); // digit
        assert!(validate_initials("A C").is_err()); // space
        assert!(validate_initials("ÀBC").is_err()); // not ASCII
    }

    #[test]
    fn test_validate_sequence_letters() {
        let good: Vec<String> = "HELLO".chars().map(String::from).collect();
        assert!(validate_sequence_letters(&good).is_ok());

        let bad = vec!["A".to_owned(), "BC".to_owned()];
        assert!(validate_sequence_letters(&bad).is_err());
        let bad = vec!["A".to_owned(), "".to_owned()];
        assert!(validate_sequence_letters(&bad).is_err());
        let bad = vec!["7".to_owned()];
        assert!(validate_sequence_letters(&bad).is_err());
    }

    #[test]
    fn test_validate_history() {
        let mut history = GameHistory::new();
        history.record(HistoryEvent::Invalid {
            word: "QQQ".into(),
            points: -30,
        });
        assert!(validate_history(&history).is_ok());
    }
}
