//! Shared fixtures: a fully wired application over in-memory adapters, a
//! local image host in a temp dir and a mail transport that keeps what it
//! was asked to send.

#![cfg(feature = "web-axum")]

use std::sync::{Arc, Mutex};

use api_adapters::{metrics::Metrics, router, AppState, RouterConfig};
use async_trait::async_trait;
use auth_adapters::JwtCredentialStore;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use domains::{ImageUpload, MailMessage, MailTransport, Registration, Result, Role};
use serde_json::Value;
use services::{
    AccessPolicy, AuthSession, CommentService, IdentityService, PolicyConfig, PostService,
};
use storage_adapters::{
    LocalImageHost, MemoryCommentRepository, MemoryOtpLedger, MemoryPostRepository,
    MemoryUserRepository, DEFAULT_MAX_IMAGE_BYTES,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"integration-test-secret";

/// PNG signature bytes, enough for format sniffing.
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

pub fn png_upload() -> ImageUpload {
    ImageUpload::new(PNG.to_vec(), mime::IMAGE_PNG)
}

/// Keeps every message instead of delivering it.
#[derive(Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl CapturingMailer {
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// The six-digit code from the latest message to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == email)
            .and_then(|m| m.body.rsplit(' ').next())
            .map(str::to_string)
    }
}

#[async_trait]
impl MailTransport for CapturingMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub struct TestApp {
    pub identity: Arc<IdentityService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub users: Arc<MemoryUserRepository>,
    pub otp: Arc<MemoryOtpLedger>,
    pub mailer: Arc<CapturingMailer>,
    pub credentials: Arc<JwtCredentialStore>,
    pub media: TempDir,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(PolicyConfig::default(), domains::default_otp_ttl())
    }

    pub fn with_policy(policy: PolicyConfig) -> Self {
        Self::build(policy, domains::default_otp_ttl())
    }

    pub fn with_otp_ttl(ttl: chrono::Duration) -> Self {
        Self::build(PolicyConfig::default(), ttl)
    }

    fn build(policy: PolicyConfig, otp_ttl: chrono::Duration) -> Self {
        let media = tempfile::tempdir().unwrap();
        let users = Arc::new(MemoryUserRepository::new());
        let posts = Arc::new(MemoryPostRepository::new());
        let comments = Arc::new(MemoryCommentRepository::new());
        let otp = Arc::new(MemoryOtpLedger::new(otp_ttl));
        let mailer = Arc::new(CapturingMailer::default());
        let credentials = Arc::new(JwtCredentialStore::with_default_ttl(JWT_SECRET));
        let images = Arc::new(LocalImageHost::new(
            media.path().to_path_buf(),
            "/media",
            DEFAULT_MAX_IMAGE_BYTES,
        ));
        let policy = AccessPolicy::new(policy);

        let identity = Arc::new(IdentityService::new(
            users.clone(),
            credentials.clone(),
            otp.clone(),
            images.clone(),
            mailer.clone(),
            policy,
        ));
        let post_service = Arc::new(PostService::new(posts.clone(), users.clone(), images, policy));
        let comment_service =
            Arc::new(CommentService::new(comments, posts, users.clone(), policy));

        let state = AppState {
            identity: identity.clone(),
            posts: post_service.clone(),
            comments: comment_service.clone(),
            credentials: credentials.clone(),
            metrics: Arc::new(Metrics::new()),
        };
        let config = RouterConfig {
            media: Some(("/media".to_string(), media.path().to_path_buf())),
            ..RouterConfig::default()
        };

        Self {
            identity,
            posts: post_service,
            comments: comment_service,
            users,
            otp,
            mailer,
            credentials,
            media,
            router: router(state, &config),
        }
    }

    /// Registers through the service. Organizations get a description and
    /// a proof image.
    pub async fn register(&self, role: Role, name: &str, email: &str) -> AuthSession {
        let organization = role == Role::Organization;
        let registration = Registration {
            role: Some(role.as_str().to_string()),
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some("password123".to_string()),
            description: organization.then(|| format!("{name} helps people")),
        };
        let proof = organization.then(png_upload);
        self.identity.register(registration, proof).await.unwrap()
    }

    /// Sends `request` through the router and decodes the JSON answer
    /// (`Value::Null` for an empty or non-JSON body).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(request.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn authed(&self, method: &str, uri: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn multipart(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        form: &Multipart,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, form.content_type());
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(request.body(Body::from(form.body())).unwrap()).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal `multipart/form-data` body builder.
#[derive(Default)]
pub struct Multipart {
    body: Vec<u8>,
}

const BOUNDARY: &str = "goodfeed-test-boundary";

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    pub fn body(&self) -> bytes::Bytes {
        let mut body = self.body.clone();
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        bytes::Bytes::from(body)
    }
}
