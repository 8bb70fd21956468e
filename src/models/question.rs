use serde::{Deserialize, Serialize};

pub const OPTIONS_PER_QUESTION: usize = 4;
pub const QUESTIONS_PER_CATEGORY: usize = 5;
pub const QUIZ_LENGTH: usize = QUESTIONS_PER_CATEGORY * QuestionCategory::ALL.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    LogicalReasoning,
    QuantitativeAptitude,
    VerbalAbility,
    DomainKnowledge,
}

impl QuestionCategory {
    pub const ALL: [QuestionCategory; 4] = [
        QuestionCategory::LogicalReasoning,
        QuestionCategory::QuantitativeAptitude,
        QuestionCategory::VerbalAbility,
        QuestionCategory::DomainKnowledge,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QuestionCategory::LogicalReasoning => "logical reasoning",
            QuestionCategory::QuantitativeAptitude => "quantitative aptitude",
            QuestionCategory::VerbalAbility => "verbal ability",
            QuestionCategory::DomainKnowledge => "domain knowledge",
        }
    }

    /// Accepts the spellings models tend to produce ("Logical Reasoning",
    /// "quantitative", "domain-knowledge", ...).
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
            .collect();
        let first = normalized.split_whitespace().next()?;
        match first {
            "logical" | "logic" | "reasoning" => Some(QuestionCategory::LogicalReasoning),
            "quantitative" | "quant" | "numerical" | "math" | "mathematics" => {
                Some(QuestionCategory::QuantitativeAptitude)
            }
            "verbal" | "language" | "english" => Some(QuestionCategory::VerbalAbility),
            "domain" | "technical" | "role" => Some(QuestionCategory::DomainKnowledge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: u32,
    pub category: QuestionCategory,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: u8,
}

/// Correct answers per category in a graded exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: QuestionCategory,
    pub correct: usize,
    pub total: usize,
}

/// A candidate's response to one question. `Unanswered` is explicit so that
/// grading never depends on a failed lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "option", rename_all = "snake_case")]
pub enum Answer {
    #[default]
    Unanswered,
    Selected(u8),
}

impl Answer {
    pub fn is_answered(&self) -> bool {
        matches!(self, Answer::Selected(_))
    }
}
