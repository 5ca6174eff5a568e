//! # Access Policy
//!
//! Pure authorization decisions: given an actor and a loaded target, may the
//! actor mutate it? No I/O happens here; loading the target (and reporting
//! `NotFound` when it is missing) is the caller's job.

use domains::{Actor, Comment, Post, Role};
use serde::Deserialize;
use uuid::Uuid;

/// Switches for the rules whose intent is still a product decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Admins may edit or delete any post, not only their own.
    pub admin_overrides_post_ownership: bool,
    /// Reject self-registration with `role = admin`.
    pub forbid_admin_self_registration: bool,
    /// Only the account holder (or an admin) may update or delete a user.
    /// When off, any authenticated caller may.
    pub self_service_user_mutation: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            admin_overrides_post_ownership: false,
            forbid_admin_self_registration: false,
            self_service_user_mutation: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    config: PolicyConfig,
}

impl AccessPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> PolicyConfig {
        self.config
    }

    /// Owner only, plus admins when the override is switched on.
    pub fn can_mutate_post(&self, actor: &Actor, post: &Post) -> bool {
        match actor.role {
            Role::Admin if self.config.admin_overrides_post_ownership => true,
            Role::User | Role::Organization | Role::Admin => actor.id == post.created_by,
        }
    }

    /// Author or any admin.
    pub fn can_mutate_comment(&self, actor: &Actor, comment: &Comment) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::User | Role::Organization => actor.id == comment.user,
        }
    }

    /// Update/delete of the account `target`.
    pub fn can_manage_user(&self, actor: &Actor, target: Uuid) -> bool {
        if !self.config.self_service_user_mutation {
            return true;
        }
        match actor.role {
            Role::Admin => true,
            Role::User | Role::Organization => actor.id == target,
        }
    }

    pub fn can_register_as(&self, role: Role) -> bool {
        match role {
            Role::Admin => !self.config.forbid_admin_self_registration,
            Role::User | Role::Organization => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_by(owner: Uuid) -> Post {
        Post::new("title".into(), "body".into(), String::new(), owner)
    }

    #[test]
    fn post_mutation_is_owner_only_by_default() {
        let policy = AccessPolicy::default();
        let owner = Actor::new(Uuid::now_v7(), Role::Organization);
        let admin = Actor::new(Uuid::now_v7(), Role::Admin);
        let post = post_by(owner.id);

        assert!(policy.can_mutate_post(&owner, &post));
        assert!(!policy.can_mutate_post(&admin, &post));
    }

    #[test]
    fn admin_override_for_posts_is_opt_in() {
        let policy = AccessPolicy::new(PolicyConfig {
            admin_overrides_post_ownership: true,
            ..PolicyConfig::default()
        });
        let admin = Actor::new(Uuid::now_v7(), Role::Admin);
        let stranger = Actor::new(Uuid::now_v7(), Role::User);
        let post = post_by(Uuid::now_v7());

        assert!(policy.can_mutate_post(&admin, &post));
        assert!(!policy.can_mutate_post(&stranger, &post));
    }

    #[test]
    fn comment_mutation_allows_author_or_admin() {
        let policy = AccessPolicy::default();
        let author = Actor::new(Uuid::now_v7(), Role::User);
        let comment = Comment::new(Uuid::now_v7(), author.id, "nice".into());

        assert!(policy.can_mutate_comment(&author, &comment));
        assert!(policy.can_mutate_comment(&Actor::new(Uuid::now_v7(), Role::Admin), &comment));
        assert!(!policy.can_mutate_comment(&Actor::new(Uuid::now_v7(), Role::User), &comment));
        assert!(!policy.can_mutate_comment(&Actor::new(Uuid::now_v7(), Role::Organization), &comment));
    }

    #[test]
    fn user_management_is_self_or_admin() {
        let policy = AccessPolicy::default();
        let me = Actor::new(Uuid::now_v7(), Role::User);
        let other = Uuid::now_v7();

        assert!(policy.can_manage_user(&me, me.id));
        assert!(!policy.can_manage_user(&me, other));
        assert!(policy.can_manage_user(&Actor::new(Uuid::now_v7(), Role::Admin), other));

        let open = AccessPolicy::new(PolicyConfig {
            self_service_user_mutation: false,
            ..PolicyConfig::default()
        });
        assert!(open.can_manage_user(&me, other));
    }

    #[test]
    fn admin_registration_can_be_closed() {
        assert!(AccessPolicy::default().can_register_as(Role::Admin));
        let closed = AccessPolicy::new(PolicyConfig {
            forbid_admin_self_registration: true,
            ..PolicyConfig::default()
        });
        assert!(!closed.can_register_as(Role::Admin));
        assert!(closed.can_register_as(Role::Organization));
    }
}
