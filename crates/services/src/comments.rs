//! # Comment Lifecycle

use std::collections::HashMap;
use std::sync::Arc;

use domains::{
    Actor, AppError, Comment, CommentRepository, CommentView, PostRepository, Result,
    UserRepository, UserSummary,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::policy::AccessPolicy;

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    policy: AccessPolicy,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        policy: AccessPolicy,
    ) -> Self {
        Self { comments, posts, users, policy }
    }

    pub async fn create_comment(
        &self,
        actor: &Actor,
        post_id: Uuid,
        text: Option<String>,
    ) -> Result<Comment> {
        let text = required_text(text)?;
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(AppError::not_found("Post"));
        }

        let comment = self.comments.create(Comment::new(post_id, actor.id, text)).await?;
        info!(comment_id = %comment.id, %post_id, "comment created");
        Ok(comment)
    }

    /// Every comment on `post_id` with its author's name. Public.
    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>> {
        let comments = self.comments.list_for_post(post_id).await?;

        let mut author_ids: Vec<Uuid> = comments.iter().map(|c| c.user).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<Uuid, String> = self
            .users
            .find_many(author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = authors.get(&comment.user).map(|name| UserSummary {
                    id: comment.user,
                    name: name.clone(),
                    email: None,
                });
                CommentView::new(comment, author)
            })
            .collect())
    }

    /// `post_id` must be the post the comment was made on.
    pub async fn update_comment(
        &self,
        actor: &Actor,
        post_id: Uuid,
        comment_id: Uuid,
        text: Option<String>,
    ) -> Result<Comment> {
        let mut comment = self.load(comment_id).await?;
        if comment.post != post_id {
            return Err(AppError::Conflict("Comment does not belong to this post".into()));
        }
        if !self.policy.can_mutate_comment(actor, &comment) {
            warn!(actor = %actor.id, %comment_id, "comment update denied");
            return Err(AppError::forbidden("Access denied."));
        }

        comment.text = required_text(text)?;
        self.comments.save(comment).await
    }

    pub async fn delete_comment(&self, actor: &Actor, comment_id: Uuid) -> Result<()> {
        let comment = self.load(comment_id).await?;
        if !self.policy.can_mutate_comment(actor, &comment) {
            warn!(actor = %actor.id, %comment_id, "comment deletion denied");
            return Err(AppError::forbidden("Access denied."));
        }

        if !self.comments.delete(comment_id).await? {
            return Err(AppError::not_found("Comment"));
        }
        info!(%comment_id, "comment deleted");
        Ok(())
    }

    async fn load(&self, comment_id: Uuid) -> Result<Comment> {
        self.comments
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))
    }
}

fn required_text(text: Option<String>) -> Result<String> {
    text.filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::validation("Comment text is required."))
}
