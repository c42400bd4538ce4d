// src/handlers/result.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::types::Json as SqlJson;

use crate::{
    error::AppError,
    handlers::comment::fetch_comment_rows,
    models::{
        assignment::{Assignment, AssignmentStatus},
        comment::CommentResponse,
        result::{SubmitResultRequest, SurveyResult, normalize_answers},
        survey::Question,
        user::Role,
    },
    utils::jwt::Claims,
};

/// Submits answers for one of the caller's pending assignments.
///
/// Result insert and the pending -> completed flip happen in one
/// transaction; a repeat submit fails with 409 and never creates a
/// second result row.
pub async fn submit_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(assignment_id): Path<i64>,
    Json(payload): Json<SubmitResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    // Ownership is re-derived from the session; a foreign assignment id
    // answers 404 rather than 403.
    let assignment = sqlx::query_as::<_, Assignment>(
        "SELECT id, survey_id, user_id, status, created_at FROM assignments WHERE id = $1 AND user_id = $2",
    )
    .bind(assignment_id)
    .bind(claims.user_id())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Assignment not found".to_string()))?;

    if assignment.status != AssignmentStatus::Pending {
        return Err(AppError::Conflict("Survey already completed".to_string()));
    }

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, survey_id, text, question_type, options, position
        FROM questions
        WHERE survey_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(assignment.survey_id)
    .fetch_all(&mut *tx)
    .await?;

    let answers = normalize_answers(&questions, &payload.answers).map_err(AppError::BadRequest)?;

    let result_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO results (assignment_id, answers, completed_at)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(assignment.id)
    .bind(SqlJson(&answers))
    .bind(chrono::Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store result: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    sqlx::query("UPDATE assignments SET status = $1 WHERE id = $2")
        .bind(AssignmentStatus::Completed)
        .bind(assignment.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": result_id }))))
}

/// A result with its answers and comment thread.
#[derive(Debug, Serialize)]
pub struct ResultDetail {
    #[serde(flatten)]
    pub result: SurveyResult,
    pub survey_id: i64,
    pub comments: Vec<CommentResponse>,
}

/// Fetches one result with its comment thread.
/// Visible to admins and the user owning the assignment behind it.
pub async fn get_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(result_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row: Option<(i64, i64, SqlJson<std::collections::HashMap<i64, serde_json::Value>>, chrono::DateTime<chrono::Utc>, i64, i64)> =
        sqlx::query_as(
            r#"
            SELECT r.id, r.assignment_id, r.answers, r.completed_at, a.user_id, a.survey_id
            FROM results r
            JOIN assignments a ON r.assignment_id = a.id
            WHERE r.id = $1
            "#,
        )
        .bind(result_id)
        .fetch_optional(&pool)
        .await?;

    let (id, assignment_id, answers, completed_at, owner_id, survey_id) =
        row.ok_or(AppError::NotFound("Result not found".to_string()))?;

    let viewer_is_admin = claims.role == Role::Admin;
    if !viewer_is_admin && owner_id != claims.user_id() {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    let comments = fetch_comment_rows(&pool, result_id)
        .await?
        .into_iter()
        .map(|row| row.into_response(viewer_is_admin))
        .collect();

    Ok(Json(ResultDetail {
        result: SurveyResult {
            id,
            assignment_id,
            answers,
            completed_at,
        },
        survey_id,
        comments,
    }))
}
