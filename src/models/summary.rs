use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AnswerKey, QuestionId};

/// Points awarded per correct answer when reporting to the scoring service.
pub const POINTS_PER_CORRECT: u32 = 100;

/// Per-question answers collected during a session.
///
/// Entries are only ever appended, once per resolved question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answers: BTreeMap<QuestionId, AnswerKey>,
    pub correctness: BTreeMap<QuestionId, bool>,
}

impl AnswerRecord {
    /// Record the outcome of a question. Returns false if the question was
    /// already recorded, leaving the existing entry untouched.
    pub fn append(&mut self, id: QuestionId, choice: Option<AnswerKey>, correct: bool) -> bool {
        if self.correctness.contains_key(&id) {
            return false;
        }
        if let Some(choice) = choice {
            self.answers.insert(id.clone(), choice);
        }
        self.correctness.insert(id, correct);
        true
    }

    pub fn len(&self) -> usize {
        self.correctness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.correctness.is_empty()
    }
}

/// Finalized outcome of a session, as read by the results screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub correct: u32,
    pub total: u32,
    pub answers: BTreeMap<QuestionId, AnswerKey>,
    pub correctness: BTreeMap<QuestionId, bool>,
}

/// Verbal grade shown next to the percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Excellent,
    VeryGood,
    Good,
    KeepPracticing,
}

impl Rating {
    pub fn label(self) -> &'static str {
        match self {
            Rating::Excellent => "Excellent!",
            Rating::VeryGood => "Very good!",
            Rating::Good => "Good job!",
            Rating::KeepPracticing => "Keep practicing!",
        }
    }
}

impl Summary {
    pub fn new(correct: u32, total: u32, record: AnswerRecord) -> Self {
        Self {
            correct,
            total,
            answers: record.answers,
            correctness: record.correctness,
        }
    }

    /// Rounded percentage of correct answers; 0 for an empty quiz.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((f64::from(self.correct) / f64::from(self.total)) * 100.0).round() as u32
    }

    pub fn rating(&self) -> Rating {
        match self.percentage() {
            90.. => Rating::Excellent,
            70..=89 => Rating::VeryGood,
            50..=69 => Rating::Good,
            _ => Rating::KeepPracticing,
        }
    }

    /// Value sent to the remote scoring service.
    pub fn score_points(&self) -> u32 {
        self.correct.saturating_mul(POINTS_PER_CORRECT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_is_write_once() {
        let mut record = AnswerRecord::default();
        assert!(record.append("q1".into(), Some("2".into()), true));
        assert!(!record.append("q1".into(), Some("3".into()), false));
        assert_eq!(record.answers.get(&QuestionId::from("q1")), Some(&AnswerKey::from("2")));
        assert_eq!(record.correctness.get(&QuestionId::from("q1")), Some(&true));
    }

    #[test]
    fn test_unanswered_question_has_no_answer_entry() {
        let mut record = AnswerRecord::default();
        record.append("q2".into(), None, false);
        assert!(record.answers.is_empty());
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_percentage_and_rating() {
        let summary = Summary::new(2, 3, AnswerRecord::default());
        assert_eq!(summary.percentage(), 67);
        assert_eq!(summary.rating(), Rating::Good);
        assert_eq!(summary.score_points(), 200);

        assert_eq!(Summary::new(0, 0, AnswerRecord::default()).percentage(), 0);
        assert_eq!(Summary::new(9, 10, AnswerRecord::default()).rating(), Rating::Excellent);
        assert_eq!(Summary::new(1, 4, AnswerRecord::default()).rating(), Rating::KeepPracticing);
    }

    #[test]
    fn test_summary_json_shape() {
        let mut record = AnswerRecord::default();
        record.append("7".into(), Some("alt1".into()), true);
        let summary = Summary::new(1, 1, record);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["correct"], 1);
        assert_eq!(json["total"], 1);
        assert_eq!(json["answers"]["7"], "alt1");
        assert_eq!(json["correctness"]["7"], true);
    }
}
