use serde::Deserialize;

use crate::de;
use crate::model::{CardId, FlashQuestion, OptionId, QuestionId};
use crate::progress::{self, ProgressInputs};

/// Aggregate counters the server reports with answers and results.
///
/// None of these are trusted: `progress_percent` may be a 0..1 fraction or a
/// 0..100 value, and the counts may disagree with it. Deserialization is
/// deliberately loose; [`SessionStats::display_percent`] reconciles.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    #[serde(default, deserialize_with = "de::option_f64")]
    total_answered: Option<f64>,
    #[serde(default, deserialize_with = "de::option_f64")]
    correct_count: Option<f64>,
    #[serde(default, deserialize_with = "de::option_f64")]
    progress_percent: Option<f64>,
}

impl SessionStats {
    #[must_use]
    pub fn total_answered(&self) -> Option<f64> {
        self.total_answered
    }

    #[must_use]
    pub fn correct_count(&self) -> Option<f64> {
        self.correct_count
    }

    #[must_use]
    pub fn progress_percent(&self) -> Option<f64> {
        self.progress_percent
    }

    #[must_use]
    pub fn progress_inputs(&self) -> ProgressInputs {
        ProgressInputs {
            progress_percent: self.progress_percent,
            correct: self.correct_count,
            total: self.total_answered,
        }
    }

    /// One trustworthy percentage for the UI, reconciled from the three
    /// untrusted fields.
    #[must_use]
    pub fn display_percent(&self) -> u8 {
        progress::compute(self.progress_inputs())
    }
}

/// One judged answer inside a TEST result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAnswerRecord {
    question_id: QuestionId,
    #[serde(default)]
    is_correct: Option<bool>,
    #[serde(default)]
    selected_option_ids: Option<Vec<OptionId>>,
    #[serde(default)]
    answer_text: Option<String>,
}

impl TestAnswerRecord {
    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }

    #[must_use]
    pub fn selected_option_ids(&self) -> Option<&[OptionId]> {
        self.selected_option_ids.as_deref()
    }

    #[must_use]
    pub fn answer_text(&self) -> Option<&str> {
        self.answer_text.as_deref()
    }
}

// Backends disagree on where the judged answers live: most nest them under
// `session.testAnswers`, some put `testAnswers` at the top level.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestResultSession {
    #[serde(default)]
    test_answers: Option<Vec<TestAnswerRecord>>,
}

/// Terminal snapshot of a TEST session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    #[serde(default)]
    session: Option<TestResultSession>,
    #[serde(default)]
    test_answers: Option<Vec<TestAnswerRecord>>,
    #[serde(default)]
    stats: Option<SessionStats>,
}

impl TestResult {
    /// Judged answers, wherever the backend put them.
    #[must_use]
    pub fn answers(&self) -> &[TestAnswerRecord] {
        self.session
            .as_ref()
            .and_then(|session| session.test_answers.as_deref())
            .or(self.test_answers.as_deref())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn stats(&self) -> Option<&SessionStats> {
        self.stats.as_ref()
    }
}

/// One judged item inside a TEST_FLASH result. `selected_option == None`
/// means the server has not seen an answer for this card yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashResultItem {
    card_id: CardId,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_option: Option<String>,
    #[serde(default)]
    selected_option: Option<String>,
    #[serde(default)]
    is_correct: bool,
}

impl FlashResultItem {
    #[must_use]
    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> Option<&str> {
        self.correct_option.as_deref()
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<&str> {
        self.selected_option.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    /// Rebuild the presentable flash question for this item. Used to recover
    /// the current step after an ambiguous submit failure.
    #[must_use]
    pub fn to_flash_question(&self) -> FlashQuestion {
        FlashQuestion::new(self.card_id.clone(), self.prompt.clone(), self.options.clone())
    }
}

/// Terminal snapshot of a TEST_FLASH session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashResult {
    #[serde(default)]
    stats: Option<SessionStats>,
    #[serde(default)]
    items: Vec<FlashResultItem>,
}

impl FlashResult {
    #[must_use]
    pub fn stats(&self) -> Option<&SessionStats> {
        self.stats.as_ref()
    }

    #[must_use]
    pub fn items(&self) -> &[FlashResultItem] {
        &self.items
    }
}

/// Result snapshot for a finished (or in-flight) session, tagged by mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mode")]
pub enum SessionResult {
    #[serde(rename = "TEST")]
    Test(TestResult),
    #[serde(rename = "TEST_FLASH")]
    Flash(FlashResult),
}

impl SessionResult {
    #[must_use]
    pub fn stats(&self) -> Option<&SessionStats> {
        match self {
            SessionResult::Test(result) => result.stats(),
            SessionResult::Flash(result) => result.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_survive_mixed_number_and_string_fields() {
        let stats: SessionStats = serde_json::from_str(
            r#"{"totalAnswered": "10", "correctCount": 5, "progressPercent": "0.5"}"#,
        )
        .unwrap();
        assert_eq!(stats.total_answered(), Some(10.0));
        assert_eq!(stats.correct_count(), Some(5.0));
        assert_eq!(stats.display_percent(), 50);
    }

    #[test]
    fn test_result_prefers_answers_nested_in_session() {
        let result: SessionResult = serde_json::from_str(
            r#"{
                "mode": "TEST",
                "session": {"testAnswers": [{"questionId": "Q1", "isCorrect": true}]},
                "testAnswers": [{"questionId": "IGNORED"}],
                "stats": {"totalAnswered": 1, "correctCount": 1, "progressPercent": 100}
            }"#,
        )
        .unwrap();
        let SessionResult::Test(test) = result else {
            panic!("expected TEST result");
        };
        assert_eq!(test.answers().len(), 1);
        assert_eq!(test.answers()[0].question_id().as_str(), "Q1");
    }

    #[test]
    fn test_result_falls_back_to_top_level_answers() {
        let test: TestResult = serde_json::from_str(
            r#"{"testAnswers": [{"questionId": 7}, {"questionId": 8}]}"#,
        )
        .unwrap();
        assert_eq!(test.answers().len(), 2);
        assert_eq!(test.answers()[0].question_id().as_str(), "7");
    }

    #[test]
    fn flash_result_keeps_unanswered_items_visible() {
        let result: SessionResult = serde_json::from_str(
            r#"{
                "mode": "TEST_FLASH",
                "stats": {"totalAnswered": 1, "correctCount": 0, "progressPercent": 0},
                "items": [
                    {"cardId": 41, "prompt": "p1", "options": ["a", "b"], "selectedOption": "a", "isCorrect": false},
                    {"cardId": 42, "prompt": "p2", "options": ["c", "d"], "selectedOption": null, "isCorrect": false}
                ]
            }"#,
        )
        .unwrap();
        let SessionResult::Flash(flash) = result else {
            panic!("expected TEST_FLASH result");
        };
        assert_eq!(flash.items()[0].selected_option(), Some("a"));
        assert!(flash.items()[1].selected_option().is_none());

        let question = flash.items()[1].to_flash_question();
        assert_eq!(question.card_id().as_str(), "42");
        assert_eq!(question.options(), ["c", "d"]);
    }
}
