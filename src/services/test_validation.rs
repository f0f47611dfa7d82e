//! Whole-tree validation for test submissions.
//!
//! Every level is checked before a single row is written: parent fields,
//! the post-deletion question count, each surviving question, the fixed
//! four-answer arity and the one-correct-answer rule per group. The
//! resulting error set addresses each failure to the node it belongs to,
//! so the caller can re-render the form with errors in place.

use serde::Serialize;

use crate::dto::test_dto::TestSubmission;

pub const MIN_QUESTIONS: usize = 5;
pub const ANSWERS_PER_QUESTION: usize = 4;
pub const LETTERS: [&str; ANSWERS_PER_QUESTION] = ["A", "B", "C", "D"];

const REQUIRED_MESSAGE: &str = "This field is required.";

/// Where in the tree a validation failure belongs. Collection-level
/// failures (`Questions`, `AnswerGroup`) are attributable to a whole
/// sibling group, not to one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum ErrorNode {
    Test,
    Questions,
    Question { index: usize },
    AnswerGroup { question: usize },
    Answer { question: usize, answer: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeError {
    #[serde(flatten)]
    pub node: ErrorNode,
    pub message: String,
}

impl TreeError {
    fn new(node: ErrorNode, message: impl Into<String>) -> Self {
        Self {
            node,
            message: message.into(),
        }
    }
}

/// Validates the full tree against the post-deletion view of the
/// submission. Pure: identical input yields the identical error set, and
/// an empty result is the only path into the commit phase.
pub fn validate_submission(submission: &TestSubmission) -> Vec<TreeError> {
    let mut errors = Vec::new();

    if submission.name.trim().is_empty() {
        errors.push(TreeError::new(ErrorNode::Test, REQUIRED_MESSAGE));
    }

    let surviving = submission.questions.iter().filter(|q| !q.delete).count();
    if surviving < MIN_QUESTIONS {
        errors.push(TreeError::new(
            ErrorNode::Questions,
            too_few_questions_message(MIN_QUESTIONS),
        ));
    }

    for (index, question) in submission.questions.iter().enumerate() {
        if question.delete {
            // Marked-for-deletion questions are exempt from all validation.
            continue;
        }

        if question.text.trim().is_empty() {
            errors.push(TreeError::new(ErrorNode::Question { index }, REQUIRED_MESSAGE));
        }

        if question.answers.len() != ANSWERS_PER_QUESTION {
            errors.push(TreeError::new(
                ErrorNode::AnswerGroup { question: index },
                format!("Please submit exactly {} answers.", ANSWERS_PER_QUESTION),
            ));
            // The group is structurally broken; per-answer checks and the
            // correctness count would only produce misleading noise.
            continue;
        }

        for (answer_index, answer) in question.answers.iter().enumerate() {
            if answer.text.trim().is_empty() {
                errors.push(TreeError::new(
                    ErrorNode::Answer {
                        question: index,
                        answer: answer_index,
                    },
                    REQUIRED_MESSAGE,
                ));
            }
        }

        let correct = question.answers.iter().filter(|a| a.is_correct).count();
        if correct == 0 {
            errors.push(TreeError::new(
                ErrorNode::AnswerGroup { question: index },
                "At least one answer must be correct",
            ));
        } else if correct > 1 {
            errors.push(TreeError::new(
                ErrorNode::AnswerGroup { question: index },
                "Only one answer can be correct",
            ));
        }
    }

    errors
}

fn too_few_questions_message(min: usize) -> String {
    if min == 1 {
        format!("Please submit at least {} question.", min)
    } else {
        format!("Please submit at least {} questions.", min)
    }
}
