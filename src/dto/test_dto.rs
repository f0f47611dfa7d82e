use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::answer::Answer;
use crate::models::question::Question;
use crate::models::test::Test;
use crate::services::test_validation::TreeError;

/// One test submitted as a whole tree: parent fields plus the full ordered
/// set of questions, each carrying its four answers. This is the normalized
/// form the web layer hands to the validator; raw form decoding happens
/// before this point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSubmission {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionSubmission>,
}

/// `id` is set when the question maps to an existing row (edit flow) and
/// absent for questions added in this submission. A question flagged
/// `delete` is removed on commit and skips all validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSubmission {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub text: String,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub answers: Vec<AnswerSubmission>,
}

/// Answers carry no identifier: arity is fixed at four and letters are
/// assigned from the slot index, so (question, letter) already names the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub passes_number: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestListResponse {
    pub items: Vec<TestResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TestListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub owner_id: Option<Uuid>,
}

/// Full tree as persisted, correctness flags included. Returned to the
/// owner for the edit screen and as the commit confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct TestTreeResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub passes_number: i64,
    pub questions: Vec<QuestionTreeView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionTreeView {
    pub id: Uuid,
    pub text: String,
    pub answers: Vec<AnswerTreeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerTreeView {
    pub id: Uuid,
    pub letter: String,
    pub text: String,
    pub is_correct: bool,
}

/// The tree as shown to a taker: no correctness flags.
#[derive(Debug, Clone, Serialize)]
pub struct TestTakeResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub passes_number: i64,
    pub questions: Vec<QuestionTakeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionTakeView {
    pub id: Uuid,
    pub text: String,
    pub answers: Vec<AnswerTakeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerTakeView {
    pub id: Uuid,
    pub letter: String,
    pub text: String,
}

/// 422 body for a rejected tree: the submission exactly as it came in, so
/// the client can re-render the form without losing input, plus every
/// validation failure addressed to its node.
#[derive(Debug, Clone, Serialize)]
pub struct TreeRejection {
    pub values: TestSubmission,
    pub errors: Vec<TreeError>,
}

impl From<Test> for TestResponse {
    fn from(value: Test) -> Self {
        Self {
            id: value.id,
            owner_id: value.owner_id,
            name: value.name,
            description: value.description,
            passes_number: value.passes_number,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl TestTreeResponse {
    pub fn assemble(test: Test, questions: Vec<Question>, answers: Vec<Answer>) -> Self {
        let questions = questions
            .into_iter()
            .map(|question| QuestionTreeView {
                answers: answers
                    .iter()
                    .filter(|a| a.question_id == question.id)
                    .map(|a| AnswerTreeView {
                        id: a.id,
                        letter: a.letter.clone(),
                        text: a.text.clone(),
                        is_correct: a.is_correct,
                    })
                    .collect(),
                id: question.id,
                text: question.text,
            })
            .collect();

        Self {
            id: test.id,
            owner_id: test.owner_id,
            name: test.name,
            description: test.description,
            passes_number: test.passes_number,
            questions,
            created_at: test.created_at,
            updated_at: test.updated_at,
        }
    }
}

impl From<TestTreeResponse> for TestTakeResponse {
    fn from(value: TestTreeResponse) -> Self {
        Self {
            id: value.id,
            owner_id: value.owner_id,
            name: value.name,
            description: value.description,
            passes_number: value.passes_number,
            questions: value
                .questions
                .into_iter()
                .map(|q| QuestionTakeView {
                    id: q.id,
                    text: q.text,
                    answers: q
                        .answers
                        .into_iter()
                        .map(|a| AnswerTakeView {
                            id: a.id,
                            letter: a.letter,
                            text: a.text,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
