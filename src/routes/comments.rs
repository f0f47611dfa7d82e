use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::comment_dto::{CommentListResponse, CommentResponse, CreateCommentPayload},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[axum::debug_handler]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let comments = state.comment_service.list_for_test(test_id).await?;
    Ok(Json(CommentListResponse {
        items: comments.into_iter().map(CommentResponse::from).collect(),
    }))
}

#[axum::debug_handler]
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let comment = state
        .comment_service
        .create(test_id, claims.user_id()?, payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}
