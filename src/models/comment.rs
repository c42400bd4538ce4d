// src/models/comment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'comments' table in the database.
///
/// The two read flags are independent; each defaults opposite to the
/// author's own role, since a comment is implicitly read by its author.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub result_id: i64,
    pub author_id: i64,
    pub text: String,
    pub is_read_by_admin: bool,
    pub is_read_by_user: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for posting a comment on a result.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Comment must be between 1 and 2000 characters."
    ))]
    pub text: String,
}

/// Raw comment row joined with author info.
#[derive(Debug, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub result_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub text: String,
    pub is_read_by_admin: bool,
    pub is_read_by_user: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for displaying a comment. `is_new` is computed against the caller's
/// role so the client can seed its highlight state from it.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub result_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub text: String,
    pub is_read_by_admin: bool,
    pub is_read_by_user: bool,
    pub is_new: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl CommentRow {
    /// Marks the comment as "new" when the viewing side has not read it yet.
    pub fn into_response(self, viewer_is_admin: bool) -> CommentResponse {
        let is_new = if viewer_is_admin {
            !self.is_read_by_admin
        } else {
            !self.is_read_by_user
        };
        CommentResponse {
            id: self.id,
            result_id: self.result_id,
            author_id: self.author_id,
            author_name: self.author_name,
            text: self.text,
            is_read_by_admin: self.is_read_by_admin,
            is_read_by_user: self.is_read_by_user,
            is_new,
            created_at: self.created_at,
        }
    }
}
