//! # Feed Models
//!
//! Posts published by an account, plus the comments attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserSummary;

/// A feed entry. `created_by` and `created_at` never change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Image URL, empty when the post has none
    pub image: String,
    pub created_by: Uuid,
    /// Users who liked the post; each id appears at most once
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(title: String, description: String, image: String, created_by: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            title,
            description,
            image,
            created_by,
            likes: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds `user_id` to the likes if absent, removes it otherwise.
    /// Returns whether the user likes the post afterwards.
    pub fn toggle_like(&mut self, user_id: Uuid) -> bool {
        if let Some(idx) = self.likes.iter().position(|id| *id == user_id) {
            self.likes.remove(idx);
            false
        } else {
            self.likes.push(user_id);
            true
        }
    }
}

/// Owner-editable post fields. The image only changes through an upload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl PostPatch {
    pub fn apply(self, post: &mut Post) -> crate::Result<()> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err(AppError::validation("Title cannot be empty."));
            }
            post.title = title;
        }
        if let Some(description) = self.description {
            if description.trim().is_empty() {
                return Err(AppError::validation("Description cannot be empty."));
            }
            post.description = description;
        }
        Ok(())
    }
}

/// Post with its creator resolved, as returned by the feed listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: String,
    /// `None` when the creator account has since been deleted
    pub created_by: Option<UserSummary>,
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PostView {
    pub fn new(post: Post, created_by: Option<UserSummary>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            description: post.description,
            image: post.image,
            created_by,
            likes: post.likes,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    pub post: Uuid,
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post: Uuid, user: Uuid, text: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            text,
            post,
            user,
            created_at: Utc::now(),
        }
    }
}

/// Comment with the author's name resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub text: String,
    pub post: Uuid,
    pub user: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    pub fn new(comment: Comment, user: Option<UserSummary>) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            post: comment.post,
            user,
            created_at: comment.created_at,
        }
    }
}
