//! # In-memory repositories
//!
//! `DashMap`-backed implementations of the repository ports. Used for local
//! development and the test suites. Unique indexes on user email and name
//! are claimed through the map's entry API, so two concurrent registrations
//! with the same email cannot both succeed.

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use domains::{
    AppError, Comment, CommentRepository, Post, PostRepository, Result, User, UserRepository,
};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryUserRepository {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
    names: DashMap<String, Uuid>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Reserves `key` for `id`. Re-claiming one's own key is a no-op.
fn claim(index: &DashMap<String, Uuid>, key: &str, id: Uuid, conflict: &str) -> Result<()> {
    match index.entry(key.to_string()) {
        Entry::Occupied(e) if *e.get() != id => Err(AppError::Conflict(conflict.to_string())),
        Entry::Occupied(_) => Ok(()),
        Entry::Vacant(e) => {
            e.insert(id);
            Ok(())
        }
    }
}

fn release(index: &DashMap<String, Uuid>, key: &str, id: Uuid) {
    index.remove_if(key, |_, owner| *owner == id);
}

const EMAIL_TAKEN: &str = "Email already exists.";
const NAME_TAKEN: &str = "Name already exists.";

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let Some(id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn find_many(&self, ids: Vec<Uuid>) -> Result<Vec<User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.clone()))
            .collect())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn create(&self, user: User) -> Result<User> {
        if self.users.contains_key(&user.id) {
            return Err(AppError::Conflict("User id already exists.".into()));
        }
        claim(&self.emails, &user.email, user.id, EMAIL_TAKEN)?;
        if let Err(e) = claim(&self.names, &user.name, user.id, NAME_TAKEN) {
            release(&self.emails, &user.email, user.id);
            return Err(e);
        }
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, user: User) -> Result<User> {
        // The slot stays locked until the write lands; a racing delete either
        // runs first (NotFound) or after (record gone), never in between.
        let mut slot = self.users.get_mut(&user.id).ok_or_else(|| AppError::not_found("User"))?;
        let (old_email, old_name) = (slot.email.clone(), slot.name.clone());

        if old_email != user.email {
            claim(&self.emails, &user.email, user.id, EMAIL_TAKEN)?;
        }
        if old_name != user.name {
            if let Err(e) = claim(&self.names, &user.name, user.id, NAME_TAKEN) {
                if old_email != user.email {
                    release(&self.emails, &user.email, user.id);
                }
                return Err(e);
            }
        }

        *slot = user.clone();
        drop(slot);
        if old_email != user.email {
            release(&self.emails, &old_email, user.id);
        }
        if old_name != user.name {
            release(&self.names, &old_name, user.id);
        }
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>> {
        let Some((_, user)) = self.users.remove(&id) else {
            return Ok(None);
        };
        release(&self.emails, &user.email, id);
        release(&self.names, &user.name, id);
        Ok(Some(user))
    }
}

#[derive(Default)]
pub struct MemoryPostRepository {
    posts: DashMap<Uuid, Post>,
}

impl MemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn list(&self) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.posts.iter().map(|p| p.clone()).collect();
        posts.sort_by_key(|p| (p.created_at, p.id));
        Ok(posts)
    }

    async fn create(&self, post: Post) -> Result<Post> {
        match self.posts.entry(post.id) {
            Entry::Occupied(_) => Err(AppError::Conflict("Post id already exists.".into())),
            Entry::Vacant(e) => {
                e.insert(post.clone());
                Ok(post)
            }
        }
    }

    async fn save(&self, post: Post) -> Result<Post> {
        match self.posts.get_mut(&post.id) {
            Some(mut slot) => {
                *slot = post.clone();
                Ok(post)
            }
            None => Err(AppError::not_found("Post")),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.posts.remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct MemoryCommentRepository {
    comments: DashMap<Uuid, Comment>,
}

impl MemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentRepository for MemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.clone()))
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.post == post_id)
            .map(|c| c.clone())
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn create(&self, comment: Comment) -> Result<Comment> {
        self.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn save(&self, comment: Comment) -> Result<Comment> {
        match self.comments.get_mut(&comment.id) {
            Some(mut slot) => {
                *slot = comment.clone();
                Ok(comment)
            }
            None => Err(AppError::not_found("Comment")),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.comments.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use chrono::Utc;
    use domains::{PasswordHash, Role};

    fn user(name: &str, email: &str) -> User {
        User {
            id: Uuid::now_v7(),
            name: name.into(),
            email: email.into(),
            password: PasswordHash::from_phc("$argon2id$v=19$stub"),
            role: Role::User,
            description: None,
            proof_image: None,
            is_verified: false,
            verification_date: None,
            account_details: Default::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_and_leaves_no_record() {
        let repo = MemoryUserRepository::new();
        repo.create(user("a", "x@y.com")).await.unwrap();

        let err = repo.create(user("b", "x@y.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(repo.len(), 1);
        // The failed attempt must not have reserved its name either.
        repo.create(user("b", "b@y.com")).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_name_releases_the_email_claim() {
        let repo = MemoryUserRepository::new();
        repo.create(user("taken", "one@y.com")).await.unwrap();

        assert!(repo.create(user("taken", "two@y.com")).await.is_err());
        repo.create(user("fresh", "two@y.com")).await.unwrap();
    }

    #[tokio::test]
    async fn resaving_does_not_touch_the_hash() {
        let repo = MemoryUserRepository::new();
        let created = repo.create(user("a", "a@y.com")).await.unwrap();
        let original = created.password.clone();

        let first = repo.save(created.clone()).await.unwrap();
        let second = repo.save(first).await.unwrap();
        let stored = repo.find_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(second.password, original);
        assert_eq!(stored.password, original);
    }

    #[tokio::test]
    async fn changing_email_moves_the_index() {
        let repo = MemoryUserRepository::new();
        let mut a = repo.create(user("a", "old@y.com")).await.unwrap();
        a.email = "new@y.com".into();
        repo.save(a).await.unwrap();

        assert!(repo.find_by_email("old@y.com").await.unwrap().is_none());
        assert!(repo.find_by_email("new@y.com").await.unwrap().is_some());
        // The old address is free again.
        repo.create(user("b", "old@y.com")).await.unwrap();
    }

    #[tokio::test]
    async fn save_into_a_taken_email_is_a_conflict() {
        let repo = MemoryUserRepository::new();
        repo.create(user("a", "a@y.com")).await.unwrap();
        let mut b = repo.create(user("b", "b@y.com")).await.unwrap();
        b.email = "a@y.com".into();

        assert!(matches!(repo.save(b.clone()).await, Err(AppError::Conflict(_))));
        assert_eq!(repo.find_by_email("b@y.com").await.unwrap().unwrap().id, b.id);
    }

    #[tokio::test]
    async fn delete_frees_unique_keys() {
        let repo = MemoryUserRepository::new();
        let a = repo.create(user("a", "a@y.com")).await.unwrap();
        assert!(repo.delete(a.id).await.unwrap().is_some());
        assert!(repo.delete(a.id).await.unwrap().is_none());
        repo.create(user("a", "a@y.com")).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn save_racing_delete_never_resurrects_the_account() {
        let repo = Arc::new(MemoryUserRepository::new());
        for round in 0..200 {
            let created = repo
                .create(user(&format!("u{round}"), &format!("u{round}@y.com")))
                .await
                .unwrap();
            let id = created.id;
            let (saver_repo, deleter_repo) = (repo.clone(), repo.clone());

            let saver = tokio::spawn(async move { saver_repo.save(created).await });
            let deleter = tokio::spawn(async move { deleter_repo.delete(id).await });

            let saved = saver.await.unwrap();
            assert!(deleter.await.unwrap().unwrap().is_some());
            assert!(saved.is_ok() || matches!(saved, Err(AppError::NotFound(_))));
            assert!(repo.find_by_id(id).await.unwrap().is_none());
            assert!(repo.find_by_email(&format!("u{round}@y.com")).await.unwrap().is_none());
        }
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn comments_are_listed_per_post() {
        let repo = MemoryCommentRepository::new();
        let (p1, p2, author) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        repo.create(Comment::new(p1, author, "one".into())).await.unwrap();
        repo.create(Comment::new(p2, author, "two".into())).await.unwrap();
        repo.create(Comment::new(p1, author, "three".into())).await.unwrap();

        let texts: Vec<String> = repo
            .list_for_post(p1)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["one", "three"]);
    }

    #[tokio::test]
    async fn saving_a_deleted_post_is_not_found() {
        let repo = MemoryPostRepository::new();
        let post = repo
            .create(Post::new("t".into(), "d".into(), String::new(), Uuid::now_v7()))
            .await
            .unwrap();
        assert!(repo.delete(post.id).await.unwrap());
        assert!(matches!(repo.save(post).await, Err(AppError::NotFound(_))));
    }
}
