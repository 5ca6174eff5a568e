//! # seed
//!
//! Creates the first administrator in the configured Postgres database.
//! Admin accounts are not meant to come from public registration.
//!
//! ```text
//! SEED_ADMIN_EMAIL=root@example.org SEED_ADMIN_PASSWORD=... cargo run -p seed
//! ```
//!
//! Only the `database` settings section is read. `SEED_ADMIN_NAME` defaults
//! to `admin`. Running it twice is harmless.

use anyhow::Context;
use auth_adapters::Argon2Hasher;
use chrono::Utc;
use configs::DatabaseSettings;
use domains::{Role, User, UserRepository};
use secrecy::ExposeSecret;
use storage_adapters::postgres::{connect, PgUserRepository};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let db = DatabaseSettings::load().context("failed to load database settings")?;
    let name = std::env::var("SEED_ADMIN_NAME").unwrap_or_else(|_| "admin".to_string());
    let email = std::env::var("SEED_ADMIN_EMAIL").context("SEED_ADMIN_EMAIL is not set")?;
    let password = std::env::var("SEED_ADMIN_PASSWORD").context("SEED_ADMIN_PASSWORD is not set")?;
    anyhow::ensure!(!password.is_empty(), "SEED_ADMIN_PASSWORD is empty");

    let pool = connect(db.url.expose_secret(), 1)
        .await
        .context("failed to connect to postgres")?;
    let users = PgUserRepository::new(pool);

    if let Some(existing) = users.find_by_email(&email).await? {
        tracing::info!(user_id = %existing.id, role = %existing.role, "account already exists, nothing to do");
        return Ok(());
    }

    let now = Utc::now();
    let admin = User {
        id: Uuid::now_v7(),
        name,
        email,
        password: Argon2Hasher::new().hash(&password)?,
        role: Role::Admin,
        description: None,
        proof_image: None,
        is_verified: true,
        verification_date: Some(now),
        account_details: Default::default(),
        created_at: now,
    };
    admin.validate()?;
    let admin = users.create(admin).await?;

    tracing::info!(user_id = %admin.id, "administrator created");
    Ok(())
}
