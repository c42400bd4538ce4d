// src/models/survey.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Question type. Choice types carry an option list; text and scale do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    Text,
    Scale,
}

impl QuestionType {
    pub fn is_choice(self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultiChoice)
    }
}

/// Represents the 'surveys' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Survey {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'questions' table in the database.
/// `position` defines the display order, unique per survey.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub survey_id: i64,
    pub text: String,
    pub question_type: QuestionType,
    pub options: Json<Vec<String>>,
    pub position: i64,
}

/// One question inside a create/update survey request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 1000, message = "Question text must not be empty."))]
    pub text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
}

impl QuestionInput {
    /// Options trimmed and stripped of blanks. Choice questions must keep at
    /// least one; for text/scale questions any options are dropped.
    pub fn normalized_options(&self) -> Result<Vec<String>, String> {
        if !self.question_type.is_choice() {
            return Ok(Vec::new());
        }
        let options: Vec<String> = self
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if options.is_empty() {
            return Err(format!(
                "Choice question '{}' needs at least one non-empty option.",
                self.text
            ));
        }
        Ok(options)
    }
}

/// DTO for creating a survey together with its ordered question list.
/// The same shape is used for full-replace updates.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSurveyRequest {
    #[validate(length(min = 1, max = 200, message = "Title must not be empty."))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "A survey needs at least one question."), nested)]
    pub questions: Vec<QuestionInput>,
}

/// List entry for the admin survey overview, including the unread badge count.
#[derive(Debug, Serialize, FromRow)]
pub struct SurveyListItem {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub question_count: i64,
    pub assignment_count: i64,
    pub unread_comments: i64,
}

/// Full survey detail: the survey, its ordered questions and who it was
/// assigned to.
#[derive(Debug, Serialize)]
pub struct SurveyDetail {
    #[serde(flatten)]
    pub survey: Survey,
    pub questions: Vec<Question>,
    pub assignments: Vec<crate::models::assignment::AssignmentOverview>,
}
