// src/handlers/comment.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        comment::{CommentRow, CreateCommentRequest},
        user::Role,
    },
    utils::{html::clean_html, jwt::Claims},
};

/// The comment thread of a result in creation order, with author names.
pub(crate) async fn fetch_comment_rows(
    pool: &SqlitePool,
    result_id: i64,
) -> Result<Vec<CommentRow>, AppError> {
    let rows = sqlx::query_as::<_, CommentRow>(
        r#"
        SELECT
            c.id, c.result_id, c.author_id,
            COALESCE(u.name, u.email) AS author_name,
            c.text, c.is_read_by_admin, c.is_read_by_user, c.created_at
        FROM comments c
        JOIN users u ON c.author_id = u.id
        WHERE c.result_id = $1
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(result_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The owning user of the assignment behind a result, if the result exists.
async fn result_owner(pool: &SqlitePool, result_id: i64) -> Result<Option<i64>, AppError> {
    let owner: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT a.user_id
        FROM results r
        JOIN assignments a ON r.assignment_id = a.id
        WHERE r.id = $1
        "#,
    )
    .bind(result_id)
    .fetch_optional(pool)
    .await?;

    Ok(owner)
}

async fn insert_comment(
    pool: &SqlitePool,
    result_id: i64,
    author_id: i64,
    text: &str,
    read_by_admin: bool,
    read_by_user: bool,
) -> Result<i64, AppError> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO comments (result_id, author_id, text, is_read_by_admin, is_read_by_user, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(result_id)
    .bind(author_id)
    .bind(clean_html(text))
    .bind(read_by_admin)
    .bind(read_by_user)
    .bind(chrono::Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert comment: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(id)
}

/// Posts a comment as the user owning the result's assignment.
/// The author's own side is already read: is_read_by_user starts true,
/// is_read_by_admin false.
pub async fn add_user_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(result_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let owner = result_owner(&pool, result_id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    if owner != claims.user_id() {
        // Do not reveal whether the result exists.
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    let id = insert_comment(&pool, result_id, claims.user_id(), &payload.text, false, true).await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Posts a comment as an admin. Inverse read-flag defaults.
pub async fn add_admin_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(result_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if result_owner(&pool, result_id).await?.is_none() {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    let id = insert_comment(&pool, result_id, claims.user_id(), &payload.text, true, false).await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Lists the comment thread of a result.
/// Visible to admins and the owning user; `is_new` is computed against the
/// caller's role.
pub async fn list_comments(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(result_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let owner = result_owner(&pool, result_id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    let viewer_is_admin = claims.role == Role::Admin;
    if !viewer_is_admin && owner != claims.user_id() {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    let comments: Vec<_> = fetch_comment_rows(&pool, result_id)
        .await?
        .into_iter()
        .map(|row| row.into_response(viewer_is_admin))
        .collect();

    Ok(Json(comments))
}

/// Removes every comment of a result.
/// Admin only; individual comment deletion is deliberately not exposed.
pub async fn clear_comments(
    State(pool): State<SqlitePool>,
    Path(result_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if result_owner(&pool, result_id).await?.is_none() {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    let result = sqlx::query("DELETE FROM comments WHERE result_id = $1")
        .bind(result_id)
        .execute(&pool)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": result.rows_affected() })))
}

/// Bulk-marks every comment under a survey as read by the admin side.
/// Idempotent: rows already read are untouched, so repeated calls from the
/// client's visibility observer are harmless.
pub async fn mark_read_by_admin(
    State(pool): State<SqlitePool>,
    Path(survey_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let survey_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM surveys WHERE id = $1")
        .bind(survey_id)
        .fetch_optional(&pool)
        .await?;
    if survey_exists.is_none() {
        return Err(AppError::NotFound("Survey not found".to_string()));
    }

    let result = sqlx::query(
        r#"
        UPDATE comments
        SET is_read_by_admin = 1
        WHERE is_read_by_admin = 0
          AND result_id IN (
              SELECT r.id
              FROM results r
              JOIN assignments a ON r.assignment_id = a.id
              WHERE a.survey_id = $1
          )
        "#,
    )
    .bind(survey_id)
    .execute(&pool)
    .await?;

    Ok(Json(serde_json::json!({ "marked": result.rows_affected() })))
}

/// Bulk-marks every comment of one result as read by the owning user.
/// Idempotent, same as the admin-side variant.
pub async fn mark_read_by_user(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(result_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let owner = result_owner(&pool, result_id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    if owner != claims.user_id() {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    let result = sqlx::query(
        "UPDATE comments SET is_read_by_user = 1 WHERE result_id = $1 AND is_read_by_user = 0",
    )
    .bind(result_id)
    .execute(&pool)
    .await?;

    Ok(Json(serde_json::json!({ "marked": result.rows_affected() })))
}

/// Number of distinct surveys carrying at least one comment the admin side
/// has not read yet. Drives the admin badge.
pub async fn unread_survey_count(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT a.survey_id)
        FROM comments c
        JOIN results r ON c.result_id = r.id
        JOIN assignments a ON r.assignment_id = a.id
        WHERE c.is_read_by_admin = 0
        "#,
    )
    .fetch_one(&pool)
    .await?;

    Ok(Json(serde_json::json!({ "unread_surveys": count })))
}
