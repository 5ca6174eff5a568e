//! `/api/feed`: posts and likes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use domains::{Post, PostPatch, PostView};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    extract::{AuthUser, FormInput},
    response::ApiResponse,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/post", post(create_post))
        .route("/posts/like/{post_id}", post(toggle_like))
        .route("/{post_id}", get(get_post))
        .route("/{post_id}/edit", put(update_post))
        .route("/{post_id}/delete", delete(delete_post))
}

#[derive(Debug, Default, Deserialize)]
struct NewPostRequest {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct LikeResponse {
    success: bool,
    message: &'static str,
    likes: Vec<Uuid>,
}

async fn list_posts(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<PostView>>>, ApiError> {
    Ok(Json(ApiResponse::data(state.posts.list_posts().await?)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<ApiResponse<PostView>>, ApiError> {
    Ok(Json(ApiResponse::data(state.posts.get_post(post_id).await?)))
}

async fn create_post(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    mut form: FormInput,
) -> Result<(StatusCode, Json<ApiResponse<Post>>), ApiError> {
    let request: NewPostRequest = form.parse()?;
    let image = form.take_file("image");
    let post = state
        .posts
        .create_post(&actor, request.title, request.description, image)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(post, "Post created successfully."))))
}

async fn update_post(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(post_id): Path<Uuid>,
    mut form: FormInput,
) -> Result<Json<ApiResponse<Post>>, ApiError> {
    let patch: PostPatch = form.parse()?;
    let image = form.take_file("image");
    let post = state.posts.update_post(&actor, post_id, patch, image).await?;
    Ok(Json(ApiResponse::with_message(post, "Post updated successfully.")))
}

async fn delete_post(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.posts.delete_post(&actor, post_id).await?;
    Ok(Json(ApiResponse::ok("Post deleted successfully.")))
}

/// The liker is always the authenticated caller; any id in the body is ignored.
async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<LikeResponse>, ApiError> {
    let likes = state.posts.toggle_like(post_id, actor.id).await?;
    Ok(Json(LikeResponse { success: true, message: "Like status updated.", likes }))
}
