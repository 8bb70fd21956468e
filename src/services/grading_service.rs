use crate::models::question::{Answer, CategoryBreakdown, QuestionCategory, QuizQuestion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    pub correct: usize,
    pub total: usize,
    pub score_percent: i32,
    pub by_category: Vec<CategoryBreakdown>,
}

pub struct GradingService;

impl GradingService {
    /// Rounded percentage, half up. An empty quiz scores 0.
    pub fn percent(correct: usize, total: usize) -> i32 {
        if total == 0 {
            return 0;
        }
        ((correct * 100 + total / 2) / total) as i32
    }

    fn is_correct(question: &QuizQuestion, answer: Option<&Answer>) -> bool {
        matches!(answer, Some(Answer::Selected(choice)) if *choice == question.correct_index)
    }

    /// Answers are positional. A missing entry counts as unanswered.
    pub fn grade(quiz: &[QuizQuestion], answers: &[Answer]) -> GradeReport {
        let mut by_category: Vec<CategoryBreakdown> = QuestionCategory::ALL
            .iter()
            .map(|category| CategoryBreakdown {
                category: *category,
                correct: 0,
                total: 0,
            })
            .collect();

        let mut correct = 0;
        for (idx, question) in quiz.iter().enumerate() {
            let hit = Self::is_correct(question, answers.get(idx));
            if hit {
                correct += 1;
            }
            if let Some(bucket) = by_category.iter_mut().find(|b| b.category == question.category) {
                bucket.total += 1;
                if hit {
                    bucket.correct += 1;
                }
            }
        }
        by_category.retain(|b| b.total > 0);

        GradeReport {
            correct,
            total: quiz.len(),
            score_percent: Self::percent(correct, quiz.len()),
            by_category,
        }
    }
}
