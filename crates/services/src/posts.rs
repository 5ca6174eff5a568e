//! # Post Lifecycle
//!
//! Creation, owner-only mutation and deletion of feed posts, plus like
//! toggling and the public feed reads.

use std::collections::HashMap;
use std::sync::Arc;

use domains::{
    Actor, AppError, ImageHost, ImageUpload, Post, PostPatch, PostRepository, PostView, Result,
    User, UserRepository, UserSummary,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::policy::AccessPolicy;

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    images: Arc<dyn ImageHost>,
    policy: AccessPolicy,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        images: Arc<dyn ImageHost>,
        policy: AccessPolicy,
    ) -> Self {
        Self { posts, users, images, policy }
    }

    pub async fn create_post(
        &self,
        actor: &Actor,
        title: Option<String>,
        description: Option<String>,
        image: Option<ImageUpload>,
    ) -> Result<Post> {
        let title = title.filter(|t| !t.trim().is_empty());
        let description = description.filter(|d| !d.trim().is_empty());
        let (Some(title), Some(description)) = (title, description) else {
            return Err(AppError::validation("Missing fields."));
        };

        let image = match image {
            Some(upload) => self.images.upload(upload).await?,
            None => String::new(),
        };

        let post = self.posts.create(Post::new(title, description, image, actor.id)).await?;
        info!(post_id = %post.id, created_by = %actor.id, "post created");
        Ok(post)
    }

    pub async fn update_post(
        &self,
        actor: &Actor,
        post_id: Uuid,
        patch: PostPatch,
        image: Option<ImageUpload>,
    ) -> Result<Post> {
        let mut post = self.load(post_id).await?;
        if !self.policy.can_mutate_post(actor, &post) {
            warn!(actor = %actor.id, %post_id, "post update denied");
            return Err(AppError::forbidden("You are not authorized to update this post."));
        }

        patch.apply(&mut post)?;
        if let Some(upload) = image {
            post.image = self.images.upload(upload).await?;
        }

        self.posts.save(post).await
    }

    pub async fn delete_post(&self, actor: &Actor, post_id: Uuid) -> Result<()> {
        let post = self.load(post_id).await?;
        if !self.policy.can_mutate_post(actor, &post) {
            warn!(actor = %actor.id, %post_id, "post deletion denied");
            return Err(AppError::forbidden("Access denied."));
        }

        if !self.posts.delete(post_id).await? {
            return Err(AppError::not_found("Post"));
        }
        info!(%post_id, "post deleted");
        Ok(())
    }

    /// Flips `user_id`'s membership in the like set and returns the new set.
    pub async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Vec<Uuid>> {
        let mut post = self.load(post_id).await?;
        post.toggle_like(user_id);
        let post = self.posts.save(post).await?;
        Ok(post.likes)
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostView> {
        let post = self.load(post_id).await?;
        let creator = self.users.find_by_id(post.created_by).await?;
        Ok(PostView::new(post, creator.map(summary)))
    }

    pub async fn list_posts(&self) -> Result<Vec<PostView>> {
        let posts = self.posts.list().await?;

        let mut creator_ids: Vec<Uuid> = posts.iter().map(|p| p.created_by).collect();
        creator_ids.sort_unstable();
        creator_ids.dedup();
        let creators: HashMap<Uuid, User> = self
            .users
            .find_many(creator_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(posts
            .into_iter()
            .map(|post| {
                let creator = creators.get(&post.created_by).cloned().map(summary);
                PostView::new(post, creator)
            })
            .collect())
    }

    async fn load(&self, post_id: Uuid) -> Result<Post> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))
    }
}

fn summary(user: User) -> UserSummary {
    UserSummary { id: user.id, name: user.name, email: Some(user.email) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockImageHost, MockPostRepository, MockUserRepository, Role};
    use mockall::predicate::eq;

    fn service(posts: MockPostRepository, images: MockImageHost) -> PostService {
        PostService::new(
            Arc::new(posts),
            Arc::new(MockUserRepository::new()),
            Arc::new(images),
            AccessPolicy::default(),
        )
    }

    fn owned_post(owner: Uuid) -> Post {
        Post::new("Harvest drive".into(), "Bring cans".into(), String::new(), owner)
    }

    #[tokio::test]
    async fn create_requires_title_and_description() {
        let mut posts = MockPostRepository::new();
        posts.expect_create().never();
        let actor = Actor::new(Uuid::now_v7(), Role::Organization);

        let err = service(posts, MockImageHost::new())
            .create_post(&actor, Some("title".into()), Some("  ".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_records_actor_as_owner_and_uploads_image() {
        let mut posts = MockPostRepository::new();
        posts.expect_create().returning(|p| Ok(p));
        let mut images = MockImageHost::new();
        images.expect_upload().returning(|_| Ok("/media/x.png".into()));
        let actor = Actor::new(Uuid::now_v7(), Role::Organization);
        let upload = ImageUpload::new(vec![1, 2, 3], mime::IMAGE_PNG);

        let post = service(posts, images)
            .create_post(&actor, Some("t".into()), Some("d".into()), Some(upload))
            .await
            .unwrap();
        assert_eq!(post.created_by, actor.id);
        assert_eq!(post.image, "/media/x.png");
        assert!(post.likes.is_empty());
    }

    #[tokio::test]
    async fn non_owner_cannot_delete() {
        let owner = Uuid::now_v7();
        let post = owned_post(owner);
        let id = post.id;
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().returning(move |_| Ok(Some(post.clone())));
        posts.expect_delete().never();
        let intruder = Actor::new(Uuid::now_v7(), Role::User);

        let err = service(posts, MockImageHost::new())
            .delete_post(&intruder, id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn missing_post_is_not_found_not_forbidden() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().returning(|_| Ok(None));
        let actor = Actor::new(Uuid::now_v7(), Role::User);

        let err = service(posts, MockImageHost::new())
            .update_post(&actor, Uuid::now_v7(), PostPatch::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn owner_update_keeps_owner_and_likes() {
        let owner = Uuid::now_v7();
        let mut post = owned_post(owner);
        let fan = Uuid::now_v7();
        post.likes.push(fan);
        let id = post.id;
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().with(eq(id)).returning(move |_| Ok(Some(post.clone())));
        posts.expect_save().returning(|p| Ok(p));
        let patch = PostPatch { title: Some("New title".into()), description: None };

        let updated = service(posts, MockImageHost::new())
            .update_post(&Actor::new(owner, Role::Organization), id, patch, None)
            .await
            .unwrap();
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.created_by, owner);
        assert_eq!(updated.likes, vec![fan]);
    }

    #[tokio::test]
    async fn like_toggle_adds_then_removes() {
        let post = owned_post(Uuid::now_v7());
        let id = post.id;
        let fan = Uuid::now_v7();
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().returning(move |_| Ok(Some(post.clone())));
        posts.expect_save().returning(|p| Ok(p));

        let likes = service(posts, MockImageHost::new()).toggle_like(id, fan).await.unwrap();
        assert_eq!(likes, vec![fan]);
    }
}
