//! # Postgres repositories
//!
//! This module implements the data mapping between the relational schema in
//! `migrations/` and the `domains` models. The database's unique indexes are
//! the source of truth for duplicate names and emails; a violation surfaces
//! as `AppError::Conflict`.

use std::collections::HashMap;

use async_trait::async_trait;
use domains::{
    AccountDetails, AppError, Comment, CommentRepository, PasswordHash, Post, PostRepository,
    Result, Role, User, UserRepository,
};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Postgres, Row, Transaction,
};
use uuid::Uuid;

/// Opens a pool and applies pending migrations.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(db_error)?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::internal(format!("migration failed: {e}")))?;
    Ok(pool)
}

fn db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("users_email_key") => AppError::Conflict("Email already exists.".into()),
                Some("users_name_key") => AppError::Conflict("Name already exists.".into()),
                _ => AppError::Conflict("Record already exists.".into()),
            };
        }
    }
    AppError::internal(err)
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, description, proof_image, \
     is_verified, verification_date, account_number, account_title, bank_name, created_at";

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role").map_err(db_error)?;
    let role: Role = role
        .parse()
        .map_err(|_| AppError::internal(format!("unknown role `{role}` in users table")))?;
    Ok(User {
        id: row.try_get("id").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
        email: row.try_get("email").map_err(db_error)?,
        password: PasswordHash::from_phc(row.try_get::<String, _>("password_hash").map_err(db_error)?),
        role,
        description: row.try_get("description").map_err(db_error)?,
        proof_image: row.try_get("proof_image").map_err(db_error)?,
        is_verified: row.try_get("is_verified").map_err(db_error)?,
        verification_date: row.try_get("verification_date").map_err(db_error)?,
        account_details: AccountDetails {
            account_number: row.try_get("account_number").map_err(db_error)?,
            account_title: row.try_get("account_title").map_err(db_error)?,
            bank_name: row.try_get("bank_name").map_err(db_error)?,
        },
        created_at: row.try_get("created_at").map_err(db_error)?,
    })
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_many(&self, ids: Vec<Uuid>) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(user_from_row)
            .collect()
    }

    async fn list(&self) -> Result<Vec<User>> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(user_from_row)
            .collect()
    }

    async fn create(&self, user: User) -> Result<User> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.password.as_str())
        .bind(user.role.as_str())
        .bind(&user.description)
        .bind(&user.proof_image)
        .bind(user.is_verified)
        .bind(user.verification_date)
        .bind(&user.account_details.account_number)
        .bind(&user.account_details.account_title)
        .bind(&user.account_details.bank_name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(user)
    }

    /// Writes the stored hash back verbatim; id, role and created_at are
    /// never updated.
    async fn save(&self, user: User) -> Result<User> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, description = $5, \
             proof_image = $6, is_verified = $7, verification_date = $8, account_number = $9, \
             account_title = $10, bank_name = $11 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.password.as_str())
        .bind(&user.description)
        .bind(&user.proof_image)
        .bind(user.is_verified)
        .bind(user.verification_date)
        .bind(&user.account_details.account_number)
        .bind(&user.account_details.account_title)
        .bind(&user.account_details.bank_name)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(user_from_row).transpose()
    }
}

fn post_from_row(row: &PgRow, likes: Vec<Uuid>) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id").map_err(db_error)?,
        title: row.try_get("title").map_err(db_error)?,
        description: row.try_get("description").map_err(db_error)?,
        image: row.try_get("image").map_err(db_error)?,
        created_by: row.try_get("created_by").map_err(db_error)?,
        likes,
        created_at: row.try_get("created_at").map_err(db_error)?,
    })
}

#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replaces the like set, keeping insertion order in `position`.
    async fn write_likes(tx: &mut Transaction<'_, Postgres>, post: &Post) -> Result<()> {
        sqlx::query("DELETE FROM post_likes WHERE post_id = $1")
            .bind(post.id)
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;
        if post.likes.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO post_likes (post_id, user_id, position) \
             SELECT $1, liked.user_id, liked.ord FROM unnest($2::uuid[]) WITH ORDINALITY AS liked(user_id, ord)",
        )
        .bind(post.id)
        .bind(&post.likes)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let Some(row) = sqlx::query("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let likes: Vec<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM post_likes WHERE post_id = $1 ORDER BY position")
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;
        post_from_row(&row, likes).map(Some)
    }

    async fn list(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query("SELECT * FROM posts ORDER BY created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let mut likes: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in sqlx::query("SELECT post_id, user_id FROM post_likes ORDER BY post_id, position")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
        {
            let post_id: Uuid = row.try_get("post_id").map_err(db_error)?;
            let user_id: Uuid = row.try_get("user_id").map_err(db_error)?;
            likes.entry(post_id).or_default().push(user_id);
        }

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id").map_err(db_error)?;
                post_from_row(row, likes.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn create(&self, post: Post) -> Result<Post> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query(
            "INSERT INTO posts (id, title, description, image, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.image)
        .bind(post.created_by)
        .bind(post.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        Self::write_likes(&mut tx, &post).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(post)
    }

    /// Post row and like set change together or not at all.
    async fn save(&self, post: Post) -> Result<Post> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let result = sqlx::query(
            "UPDATE posts SET title = $2, description = $3, image = $4 WHERE id = $1",
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.image)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Post"));
        }
        Self::write_likes(&mut tx, &post).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

fn comment_from_row(row: &PgRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id").map_err(db_error)?,
        text: row.try_get("text").map_err(db_error)?,
        post: row.try_get("post_id").map_err(db_error)?,
        user: row.try_get("user_id").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
    })
}

#[derive(Clone)]
pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(comment_from_row).transpose()
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        sqlx::query("SELECT * FROM comments WHERE post_id = $1 ORDER BY created_at ASC, id ASC")
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(comment_from_row)
            .collect()
    }

    async fn create(&self, comment: Comment) -> Result<Comment> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, user_id, text, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(comment.id)
        .bind(comment.post)
        .bind(comment.user)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(comment)
    }

    async fn save(&self, comment: Comment) -> Result<Comment> {
        let result = sqlx::query("UPDATE comments SET text = $2 WHERE id = $1")
            .bind(comment.id)
            .bind(&comment.text)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Comment"));
        }
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
