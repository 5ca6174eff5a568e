//! `/api/auth`: accounts, sessions and password recovery.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use domains::{Registration, User, UserPatch};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::ApiError,
    extract::{AuthUser, FormInput},
    response::ApiResponse,
    AppState,
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/check-auth", get(check_auth))
        .route("/users", get(list_users))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/{id}", get(get_user))
        .route("/{id}/edit", put(update_user))
        .route("/{id}/delete", delete(delete_user))
}

#[derive(Debug, Default, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ForgotPasswordRequest {
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    email: Option<String>,
    /// JSON clients often send the code as a number.
    otp: Option<Value>,
    new_password: Option<String>,
}

impl ResetPasswordRequest {
    fn otp(&self) -> String {
        match &self.otp {
            Some(Value::String(code)) => code.clone(),
            Some(Value::Number(code)) => code.to_string(),
            _ => String::new(),
        }
    }
}

async fn register(
    State(state): State<AppState>,
    mut form: FormInput,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    let registration: Registration = form.parse()?;
    let proof = form.take_file("proofImage");
    let session = state.identity.register(registration, proof).await?;

    let message = format!("{} registered successfully.", session.user.role.label());
    let body = ApiResponse::with_message(session.user, message).with_token(session.token);
    Ok((StatusCode::CREATED, Json(body)))
}

async fn login(State(state): State<AppState>, form: FormInput) -> ApiResult<User> {
    let request: LoginRequest = form.parse()?;
    let session = state
        .identity
        .login(
            request.email.as_deref().unwrap_or_default(),
            request.password.as_deref().unwrap_or_default(),
        )
        .await?;

    let message = format!("{} logged in successfully.", session.user.role.label());
    Ok(Json(ApiResponse::with_message(session.user, message).with_token(session.token)))
}

async fn check_auth(State(state): State<AppState>, AuthUser(actor): AuthUser) -> ApiResult<User> {
    let user = state.identity.current_user(&actor).await?;
    Ok(Json(ApiResponse::with_message(user, "Authenticated user.")))
}

async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    Ok(Json(ApiResponse::data(state.identity.list_users().await?)))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<User> {
    Ok(Json(ApiResponse::data(state.identity.get_user(id).await?)))
}

async fn update_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    mut form: FormInput,
) -> ApiResult<User> {
    let patch: UserPatch = form.parse()?;
    let proof = form.take_file("proofImage");
    let user = state.identity.update(&actor, id, patch, proof).await?;
    Ok(Json(ApiResponse::with_message(user, "Profile updated successfully.")))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let user = state.identity.remove(&actor, id).await?;
    Ok(Json(ApiResponse::ok(format!("{} deleted successfully.", user.role.label()))))
}

async fn forgot_password(State(state): State<AppState>, form: FormInput) -> ApiResult<()> {
    let request: ForgotPasswordRequest = form.parse()?;
    state.identity.forgot_password(request.email.as_deref().unwrap_or_default()).await?;
    Ok(Json(ApiResponse::ok("OTP sent to your email address.")))
}

async fn reset_password(State(state): State<AppState>, form: FormInput) -> ApiResult<()> {
    let request: ResetPasswordRequest = form.parse()?;
    state
        .identity
        .reset_password(
            request.email.as_deref().unwrap_or_default(),
            &request.otp(),
            request.new_password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(ApiResponse::ok("Password reset successfully.")))
}
