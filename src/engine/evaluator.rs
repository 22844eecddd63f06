//! Answer correctness check.

use crate::models::AnswerKey;

/// Returns whether `submitted` matches the question's correct marker.
///
/// Both sides are compared in canonical form (see [`AnswerKey::canonical`]).
/// A missing submission is always wrong.
pub fn evaluate(submitted: Option<&AnswerKey>, marker: &AnswerKey) -> bool {
    match submitted {
        Some(choice) => {
            let choice = choice.canonical();
            !choice.is_empty() && choice == marker.canonical()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(submitted: impl Into<AnswerKey>, marker: impl Into<AnswerKey>) -> bool {
        evaluate(Some(&submitted.into()), &marker.into())
    }

    #[test]
    fn test_case_and_format_insensitive() {
        assert!(check("A", "a"));
        assert!(check(1u32, "1"));
        assert!(check("alt2", "ALT2"));
        assert!(check(" 3 ", 3usize));
        assert!(check("alt1", 1u64));
    }

    #[test]
    fn test_mismatch_is_incorrect() {
        assert!(!check("a", "b"));
        assert!(!check("2", "alt3"));
    }

    #[test]
    fn test_missing_or_blank_submission_is_incorrect() {
        assert!(!evaluate(None, &"1".into()));
        assert!(!check("   ", ""));
    }

    #[test]
    fn test_unknown_key_is_incorrect() {
        assert!(!check("z", "4"));
    }
}
