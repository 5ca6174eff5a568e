//! Request extractors: bearer authentication and form bodies that may carry
//! an image file.

use std::collections::HashMap;

use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::{header, request::Parts},
    Json,
};
use domains::{Actor, AppError, ImageUpload};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{error::ApiError, AppState};

/// The verified caller of an authenticated route.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Authentication token is missing.".into()))?;
        let actor = state.credentials.verify_token(token)?;
        Ok(AuthUser(actor))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Text fields plus uploaded files, from either `multipart/form-data` or a
/// JSON object body. An empty body yields an empty form so handlers report
/// missing fields themselves.
#[derive(Debug, Default)]
pub struct FormInput {
    fields: Map<String, Value>,
    files: HashMap<String, ImageUpload>,
}

impl FormInput {
    /// Deserializes the text fields into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| AppError::validation(format!("Invalid request body: {e}")).into())
    }

    pub fn take_file(&mut self, name: &str) -> Option<ImageUpload> {
        self.files.remove(name)
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();
            if field.file_name().is_some() {
                let content_type = field
                    .content_type()
                    .and_then(|ct| ct.parse::<mime::Mime>().ok())
                    .unwrap_or(mime::APPLICATION_OCTET_STREAM);
                let bytes = field.bytes().await.map_err(malformed)?;
                // browsers send an empty part for an untouched file input
                if !bytes.is_empty() {
                    form.files.insert(name, ImageUpload::new(bytes, content_type));
                }
            } else {
                let text = field.text().await.map_err(malformed)?;
                let value = text_field_value(&name, text);
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }
}

/// Nested objects arrive as JSON strings inside multipart bodies.
fn text_field_value(name: &str, text: String) -> Value {
    if name == "accountDetails" {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text) {
            return value;
        }
    }
    Value::String(text)
}

fn malformed(err: impl std::fmt::Display) -> ApiError {
    AppError::validation(format!("Malformed request body: {err}")).into()
}

impl<S: Send + Sync> FromRequest<S> for FormInput {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| malformed(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(fields) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|e| malformed(e.body_text()))?;
            Ok(Self { fields, files: HashMap::new() })
        } else {
            Ok(Self::default())
        }
    }
}
