// src/models/assignment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Assignment lifecycle. `Completed` is terminal; there is no path back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Completed,
}

/// Represents the 'assignments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub survey_id: i64,
    pub user_id: i64,
    pub status: AssignmentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for handing a survey to a user.
#[derive(Debug, Deserialize)]
pub struct AssignSurveyRequest {
    pub survey_id: i64,
    pub user_id: i64,
}

/// List entry for the user's dashboard, including the unread badge count.
#[derive(Debug, Serialize, FromRow)]
pub struct AssignmentListItem {
    pub id: i64,
    pub survey_id: i64,
    pub survey_title: String,
    pub status: AssignmentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub unread_comments: i64,
}

/// Per-assignee line in the admin survey detail.
#[derive(Debug, Serialize, FromRow)]
pub struct AssignmentOverview {
    pub id: i64,
    pub user_id: i64,
    pub user_email: String,
    pub status: AssignmentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The user-facing view of one assignment: the survey and its questions,
/// ready to be answered.
#[derive(Debug, Serialize)]
pub struct AssignmentDetail {
    pub id: i64,
    pub survey_id: i64,
    pub survey_title: String,
    pub survey_description: Option<String>,
    pub status: AssignmentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub questions: Vec<crate::models::survey::Question>,
}
