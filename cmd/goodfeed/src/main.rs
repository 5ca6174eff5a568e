//! # goodfeed server
//!
//! Assembles the application from the adapters selected at compile time.
//! Without `db-postgres`, `redis` or `mail-http` the matching in-process
//! fallback is used, which is enough for local development. The server stops
//! gracefully on Ctrl+C or SIGTERM.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use api_adapters::{metrics::Metrics, router, AppState, RouterConfig};
use auth_adapters::JwtCredentialStore;
use configs::{LogSettings, Settings};
use domains::{CommentRepository, ImageHost, MailTransport, OtpLedger, PostRepository, UserRepository};
use secrecy::ExposeSecret;
use services::{AccessPolicy, CommentService, IdentityService, PostService};
use storage_adapters::LocalImageHost;
use tracing_subscriber::EnvFilter;

struct Repositories {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    init_tracing(&settings.log);

    // 1. Persistence
    let repos = repositories(&settings).await?;

    // 2. Password reset ledger
    let otp = otp_ledger(&settings)?;

    // 3. Credentials
    let secret = settings
        .auth
        .jwt_secret
        .as_ref()
        .context("auth.jwt_secret is not set")?;
    let credentials = Arc::new(JwtCredentialStore::new(
        secret.expose_secret().as_bytes(),
        chrono::Duration::seconds(settings.auth.token_ttl_secs),
    ));

    // 4. Media and mail
    let media_root = PathBuf::from(&settings.media.root);
    let images: Arc<dyn ImageHost> = Arc::new(LocalImageHost::new(
        media_root.clone(),
        settings.media.url_prefix.clone(),
        settings.media.max_bytes,
    ));
    let mail = mail_transport(&settings);

    // 5. Services
    let policy = AccessPolicy::new(settings.policy);
    let state = AppState {
        identity: Arc::new(IdentityService::new(
            repos.users.clone(),
            credentials.clone(),
            otp,
            images.clone(),
            mail,
            policy,
        )),
        posts: Arc::new(PostService::new(
            repos.posts.clone(),
            repos.users.clone(),
            images,
            policy,
        )),
        comments: Arc::new(CommentService::new(repos.comments, repos.posts, repos.users, policy)),
        credentials,
        metrics: Arc::new(Metrics::new()),
    };

    // 6. HTTP
    let app = router(
        state,
        &RouterConfig {
            cors_origins: settings.server.cors_origins.clone(),
            // an image at the size limit plus the surrounding form fields
            body_limit: settings.media.max_bytes + 64 * 1024,
            // absolute URL prefixes point at an external host
            media: settings
                .media
                .url_prefix
                .starts_with('/')
                .then(|| (settings.media.url_prefix.clone(), media_root)),
        },
    );

    let addr = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "goodfeed listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("goodfeed stopped");
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "db-postgres")]
async fn repositories(settings: &Settings) -> anyhow::Result<Repositories> {
    use storage_adapters::postgres::{connect, PgCommentRepository, PgPostRepository, PgUserRepository};

    let db = settings.database.as_ref().context("database.url is not set")?;
    let pool = connect(db.url.expose_secret(), db.max_connections)
        .await
        .context("failed to connect to postgres")?;
    tracing::info!("using postgres repositories");
    Ok(Repositories {
        users: Arc::new(PgUserRepository::new(pool.clone())),
        posts: Arc::new(PgPostRepository::new(pool.clone())),
        comments: Arc::new(PgCommentRepository::new(pool)),
    })
}

#[cfg(not(feature = "db-postgres"))]
async fn repositories(_settings: &Settings) -> anyhow::Result<Repositories> {
    use storage_adapters::{MemoryCommentRepository, MemoryPostRepository, MemoryUserRepository};

    tracing::warn!("db-postgres disabled; data lives in memory and is lost on exit");
    Ok(Repositories {
        users: Arc::new(MemoryUserRepository::new()),
        posts: Arc::new(MemoryPostRepository::new()),
        comments: Arc::new(MemoryCommentRepository::new()),
    })
}

#[cfg(feature = "redis")]
fn otp_ledger(settings: &Settings) -> anyhow::Result<Arc<dyn OtpLedger>> {
    use deadpool_redis::{Config, Runtime};
    use storage_adapters::otp::RedisOtpLedger;

    let redis = settings.redis.as_ref().context("redis.url is not set")?;
    let pool = Config::from_url(redis.url.clone())
        .create_pool(Some(Runtime::Tokio1))
        .context("failed to create redis pool")?;
    let ttl = u64::try_from(settings.otp.ttl_secs).context("otp.ttl_secs must be positive")?;
    Ok(Arc::new(RedisOtpLedger::new(pool, ttl)))
}

#[cfg(not(feature = "redis"))]
fn otp_ledger(settings: &Settings) -> anyhow::Result<Arc<dyn OtpLedger>> {
    use storage_adapters::MemoryOtpLedger;

    let ledger = Arc::new(MemoryOtpLedger::new(chrono::Duration::seconds(settings.otp.ttl_secs)));

    // Unredeemed codes would otherwise sit in memory forever.
    let sweeper = ledger.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            tick.tick().await;
            let purged = sweeper.purge_expired(chrono::Utc::now());
            if purged > 0 {
                tracing::debug!(purged, "expired reset codes dropped");
            }
        }
    });
    Ok(ledger)
}

#[cfg(feature = "mail-http")]
fn mail_transport(settings: &Settings) -> Arc<dyn MailTransport> {
    use storage_adapters::mail::HttpMailer;

    match (&settings.mail.api_url, &settings.mail.api_key) {
        (Some(url), Some(key)) => Arc::new(HttpMailer::new(
            url.clone(),
            key.expose_secret().to_string(),
            settings.mail.from.clone(),
        )),
        _ => {
            tracing::warn!("mail api not configured; reset codes will only be logged as sent");
            Arc::new(storage_adapters::LogMailer)
        }
    }
}

#[cfg(not(feature = "mail-http"))]
fn mail_transport(_settings: &Settings) -> Arc<dyn MailTransport> {
    tracing::warn!("mail-http disabled; reset codes are not delivered");
    Arc::new(storage_adapters::LogMailer)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
