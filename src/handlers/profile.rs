// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{MeResponse, UpdatePreferencesRequest, User},
    utils::jwt::Claims,
};

/// Get current user's profile and dashboard statistics.
/// Open to guests, whose assignment counts are simply zero.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, password, role, language, theme, last_seen, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let pending_assignments: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assignments WHERE user_id = $1 AND status = 'pending'",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let completed_assignments: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assignments WHERE user_id = $1 AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
        language: user.language,
        theme: user.theme,
        created_at: user.created_at,
        pending_assignments,
        completed_assignments,
    }))
}

/// Update the current user's language and/or theme preference.
pub async fn update_preferences(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();

    if let Some(language) = payload.language {
        sqlx::query("UPDATE users SET language = $1 WHERE id = $2")
            .bind(language)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(theme) = payload.theme {
        sqlx::query("UPDATE users SET theme = $1 WHERE id = $2")
            .bind(theme)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    Ok(StatusCode::OK)
}
