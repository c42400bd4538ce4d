// src/handlers/survey.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use sqlx::types::Json as SqlJson;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        assignment::AssignmentOverview,
        survey::{CreateSurveyRequest, Question, Survey, SurveyDetail, SurveyListItem},
    },
    utils::jwt::Claims,
};

/// Creates a survey together with its ordered question list.
/// Admin only. Survey and questions are written in one transaction.
pub async fn create_survey(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSurveyRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    // Cross-field check the derive cannot express: choice questions need options.
    let mut option_lists = Vec::with_capacity(payload.questions.len());
    for question in &payload.questions {
        option_lists.push(question.normalized_options().map_err(AppError::BadRequest)?);
    }

    let mut tx = pool.begin().await?;

    let survey_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO surveys (title, description, created_by, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(claims.user_id())
    .bind(chrono::Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create survey: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    insert_questions(&mut tx, survey_id, &payload, &option_lists).await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": survey_id }))))
}

/// Updates a survey and replaces its full question list.
///
/// Delete-and-reinsert inside one transaction, so reordering can never
/// collide on the per-survey position uniqueness.
pub async fn update_survey(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateSurveyRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut option_lists = Vec::with_capacity(payload.questions.len());
    for question in &payload.questions {
        option_lists.push(question.normalized_options().map_err(AppError::BadRequest)?);
    }

    let mut tx = pool.begin().await?;

    let result = sqlx::query("UPDATE surveys SET title = $1, description = $2 WHERE id = $3")
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Survey not found".to_string()));
    }

    sqlx::query("DELETE FROM questions WHERE survey_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    insert_questions(&mut tx, id, &payload, &option_lists).await?;

    tx.commit().await?;

    Ok(StatusCode::OK)
}

async fn insert_questions(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    survey_id: i64,
    payload: &CreateSurveyRequest,
    option_lists: &[Vec<String>],
) -> Result<(), AppError> {
    for (position, (question, options)) in payload.questions.iter().zip(option_lists).enumerate() {
        sqlx::query(
            r#"
            INSERT INTO questions (survey_id, text, question_type, options, position)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(survey_id)
        .bind(question.text.trim())
        .bind(question.question_type)
        .bind(SqlJson(options))
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Deletes a survey. Cascades to questions, assignments, results and comments.
/// Admin only.
pub async fn delete_survey(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM surveys WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete survey: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Survey not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists all surveys with question/assignment counts and the unread comment
/// badge. Admin only.
pub async fn list_surveys(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let surveys = sqlx::query_as::<_, SurveyListItem>(
        r#"
        SELECT
            s.id, s.title, s.description, s.created_at,
            (SELECT COUNT(*) FROM questions q WHERE q.survey_id = s.id) AS question_count,
            (SELECT COUNT(*) FROM assignments a WHERE a.survey_id = s.id) AS assignment_count,
            (SELECT COUNT(*)
               FROM comments c
               JOIN results r ON c.result_id = r.id
               JOIN assignments a2 ON r.assignment_id = a2.id
              WHERE a2.survey_id = s.id AND c.is_read_by_admin = 0) AS unread_comments
        FROM surveys s
        ORDER BY s.created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list surveys: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(surveys))
}

/// Fetches one survey with its ordered questions and assignment overview.
/// Admin only.
pub async fn get_survey(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let survey = sqlx::query_as::<_, Survey>(
        "SELECT id, title, description, created_by, created_at FROM surveys WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Survey not found".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, survey_id, text, question_type, options, position
        FROM questions
        WHERE survey_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let assignments = sqlx::query_as::<_, AssignmentOverview>(
        r#"
        SELECT a.id, a.user_id, u.email AS user_email, a.status, a.created_at
        FROM assignments a
        JOIN users u ON a.user_id = u.id
        WHERE a.survey_id = $1
        ORDER BY a.created_at DESC
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(SurveyDetail {
        survey,
        questions,
        assignments,
    }))
}
