//! `/api/comments`: comment threads under posts.
//!
//! Routes carry the acting user's id in the path. It has to match the
//! bearer token, so a caller can never speak for someone else.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use domains::{Actor, AppError, Comment, CommentView};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    extract::{AuthUser, FormInput},
    response::ApiResponse,
    AppState,
};

pub fn routes() -> Router<AppState> {
    // The router needs one parameter name per position, so the first segment
    // is `{id}` (post for listing, user otherwise) and the second `{target_id}`
    // (post for create, comment for delete). Handlers extract by position.
    Router::new()
        .route("/{id}", get(list_comments))
        .route("/{id}/{target_id}", post(create_comment).delete(delete_comment))
        .route("/{id}/{target_id}/{comment_id}", put(update_comment))
}

#[derive(Debug, Default, Deserialize)]
struct CommentRequest {
    text: Option<String>,
}

fn ensure_same_actor(actor: &Actor, path_user: Uuid) -> Result<(), ApiError> {
    if actor.id != path_user {
        tracing::warn!(actor = %actor.id, %path_user, "comment route user mismatch");
        return Err(AppError::forbidden("Access denied.").into());
    }
    Ok(())
}

async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CommentView>>>, ApiError> {
    Ok(Json(ApiResponse::data(state.comments.list_comments(post_id).await?)))
}

async fn create_comment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((user_id, post_id)): Path<(Uuid, Uuid)>,
    form: FormInput,
) -> Result<(StatusCode, Json<ApiResponse<Comment>>), ApiError> {
    ensure_same_actor(&actor, user_id)?;
    let request: CommentRequest = form.parse()?;
    let comment = state.comments.create_comment(&actor, post_id, request.text).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(comment, "Comment created successfully."))))
}

async fn update_comment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((user_id, post_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
    form: FormInput,
) -> Result<Json<ApiResponse<Comment>>, ApiError> {
    ensure_same_actor(&actor, user_id)?;
    let request: CommentRequest = form.parse()?;
    let comment = state
        .comments
        .update_comment(&actor, post_id, comment_id, request.text)
        .await?;
    Ok(Json(ApiResponse::with_message(comment, "Comment updated successfully.")))
}

async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((user_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    ensure_same_actor(&actor, user_id)?;
    state.comments.delete_comment(&actor, comment_id).await?;
    Ok(Json(ApiResponse::ok("Comment deleted successfully.")))
}
