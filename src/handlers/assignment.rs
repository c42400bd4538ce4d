// src/handlers/assignment.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        assignment::{Assignment, AssignmentDetail, AssignmentListItem, AssignSurveyRequest},
        survey::Question,
        user::Role,
    },
    utils::jwt::Claims,
};

/// Hands a survey to a user as a pending assignment.
/// Admin only. A user can hold at most one open assignment per survey;
/// re-administering is possible once the previous one is completed.
pub async fn assign_survey(
    State(pool): State<SqlitePool>,
    Json(payload): Json<AssignSurveyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let survey_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM surveys WHERE id = $1")
        .bind(payload.survey_id)
        .fetch_optional(&pool)
        .await?;
    if survey_exists.is_none() {
        return Err(AppError::NotFound("Survey not found".to_string()));
    }

    let target_role: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(payload.user_id)
        .fetch_optional(&pool)
        .await?;
    match target_role {
        None => return Err(AppError::NotFound("User not found".to_string())),
        Some(Role::Guest) => {
            return Err(AppError::BadRequest(
                "Guests have no dashboard and cannot receive surveys".to_string(),
            ));
        }
        Some(_) => {}
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO assignments (survey_id, user_id, status, created_at)
        VALUES ($1, $2, 'pending', $3)
        RETURNING id
        "#,
    )
    .bind(payload.survey_id)
    .bind(payload.user_id)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict("User already has an open assignment for this survey".to_string())
        } else {
            tracing::error!("Failed to assign survey: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Lists the current user's assignments with survey titles and the
/// unread-comment badge.
pub async fn list_my_assignments(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let assignments = sqlx::query_as::<_, AssignmentListItem>(
        r#"
        SELECT
            a.id, a.survey_id, s.title AS survey_title, a.status, a.created_at,
            (SELECT COUNT(*)
               FROM comments c
               JOIN results r ON c.result_id = r.id
              WHERE r.assignment_id = a.id AND c.is_read_by_user = 0) AS unread_comments
        FROM assignments a
        JOIN surveys s ON a.survey_id = s.id
        WHERE a.user_id = $1
        ORDER BY a.created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list assignments: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(assignments))
}

/// Fetches one of the current user's assignments with the survey's ordered
/// questions, ready to be answered. Foreign ids answer 404 so existence of
/// other users' assignments is never leaked.
pub async fn get_my_assignment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = sqlx::query_as::<_, Assignment>(
        "SELECT id, survey_id, user_id, status, created_at FROM assignments WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Assignment not found".to_string()))?;

    let (survey_title, survey_description): (String, Option<String>) =
        sqlx::query_as("SELECT title, description FROM surveys WHERE id = $1")
            .bind(assignment.survey_id)
            .fetch_one(&pool)
            .await?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, survey_id, text, question_type, options, position
        FROM questions
        WHERE survey_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(assignment.survey_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(AssignmentDetail {
        id: assignment.id,
        survey_id: assignment.survey_id,
        survey_title,
        survey_description,
        status: assignment.status,
        created_at: assignment.created_at,
        questions,
    }))
}
