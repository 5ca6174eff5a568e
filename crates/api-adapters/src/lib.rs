//! # api-adapters
//!
//! Inbound HTTP surface for goodfeed. With `web-axum` enabled this crate
//! exposes [`router`], which mounts:
//!
//! - `/api/auth`      accounts, sessions, password recovery
//! - `/api/feed`      posts and likes
//! - `/api/comments`  comment threads
//! - `/health`, `/metrics`
//! - the local media directory, when one is configured
//!
//! Every JSON answer uses the `{success, message, data, token}` envelope.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod middleware;
pub mod response;
#[cfg(feature = "web-axum")]
pub mod routes;

#[cfg(feature = "web-axum")]
pub use axum_app::*;

#[cfg(feature = "web-axum")]
mod axum_app {
    use std::{path::PathBuf, sync::Arc};

    use axum::{extract::DefaultBodyLimit, middleware::from_fn_with_state, routing::get, Json, Router};
    use domains::CredentialStore;
    use services::{CommentService, IdentityService, PostService};
    use tower::ServiceBuilder;
    use tower_http::services::ServeDir;

    use crate::{metrics, metrics::Metrics, middleware, response::ApiResponse, routes};

    /// Shared handles every handler can reach.
    #[derive(Clone)]
    pub struct AppState {
        pub identity: Arc<IdentityService>,
        pub posts: Arc<PostService>,
        pub comments: Arc<CommentService>,
        pub credentials: Arc<dyn CredentialStore>,
        pub metrics: Arc<Metrics>,
    }

    /// Knobs for the HTTP layer that are not service concerns.
    #[derive(Debug, Clone)]
    pub struct RouterConfig {
        pub cors_origins: Vec<String>,
        /// Request body ceiling; must leave room for an image plus form fields.
        pub body_limit: usize,
        /// `(url_prefix, directory)` to serve uploaded images from.
        pub media: Option<(String, PathBuf)>,
    }

    impl Default for RouterConfig {
        fn default() -> Self {
            Self { cors_origins: Vec::new(), body_limit: 6 * 1024 * 1024, media: None }
        }
    }

    pub fn router(state: AppState, config: &RouterConfig) -> Router {
        let mut app = Router::new()
            .nest("/api/auth", routes::users::routes())
            .nest("/api/feed", routes::posts::routes())
            .nest("/api/comments", routes::comments::routes())
            .route("/health", get(health))
            .route("/metrics", get(metrics::export));

        if let Some((prefix, dir)) = &config.media {
            app = app.nest_service(prefix, ServeDir::new(dir));
        }

        // Outermost first: request id, trace, CORS, metrics, body limit.
        app.layer(DefaultBodyLimit::max(config.body_limit))
            .layer(from_fn_with_state(state.clone(), metrics::track))
            .layer(
                ServiceBuilder::new()
                    .layer(middleware::set_request_id())
                    .layer(middleware::trace_layer())
                    .layer(middleware::propagate_request_id())
                    .layer(middleware::cors_policy(&config.cors_origins)),
            )
            .with_state(state)
    }

    async fn health() -> Json<ApiResponse<()>> {
        Json(ApiResponse::ok("ok"))
    }
}
