//! # Identity Lifecycle
//!
//! Registration, login, profile maintenance, deletion and OTP-based password
//! recovery. Orchestrates the credential store, the OTP ledger, the image
//! host, the mail transport and the user repository.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    normalize_email, Actor, AppError, CredentialStore, ImageHost, ImageUpload, MailMessage,
    MailTransport, OtpCode, OtpLedger, Registration, Result, Role, User, UserPatch, UserRepository,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::policy::AccessPolicy;

/// A freshly authenticated account and its bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialStore>,
    otp: Arc<dyn OtpLedger>,
    images: Arc<dyn ImageHost>,
    mail: Arc<dyn MailTransport>,
    policy: AccessPolicy,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        credentials: Arc<dyn CredentialStore>,
        otp: Arc<dyn OtpLedger>,
        images: Arc<dyn ImageHost>,
        mail: Arc<dyn MailTransport>,
        policy: AccessPolicy,
    ) -> Self {
        Self { users, credentials, otp, images, mail, policy }
    }

    /// Creates an account and signs the caller in.
    ///
    /// The email pre-check only saves a round trip; the repository's unique
    /// index is what actually rejects a duplicate.
    pub async fn register(
        &self,
        registration: Registration,
        proof: Option<ImageUpload>,
    ) -> Result<AuthSession> {
        let Registration { role, name, email, password, description } = registration;

        // 1. Required for every role
        let (Some(role), Some(email), Some(password)) = (
            non_blank(role),
            email.map(|e| normalize_email(&e).to_string()).filter(|e| !e.is_empty()),
            password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AppError::validation("Role, email, and password are required."));
        };
        let role: Role = role.parse()?;

        if !self.policy.can_register_as(role) {
            warn!(%role, "self-registration rejected by policy");
            return Err(AppError::forbidden("Registration with this role is not allowed."));
        }

        // 2. Organization vetting material
        let name = non_blank(name);
        let description = non_blank(description);
        let (description, proof) = match role {
            Role::Organization => {
                if name.is_none() || description.is_none() || proof.is_none() {
                    return Err(AppError::validation(
                        "Name, description, and proof image are required for organizations.",
                    ));
                }
                (description, proof)
            }
            Role::User | Role::Admin => (None, None),
        };
        let Some(name) = name else {
            return Err(AppError::validation("Name is required."));
        };

        // 3. Cheap duplicate check
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists.".into()));
        }

        // 4. Proof image
        let proof_image = match proof {
            Some(upload) => Some(self.images.upload(upload).await?),
            None => None,
        };

        // 5. Persist
        let user = User {
            id: Uuid::now_v7(),
            name,
            email,
            password: self.credentials.hash_password(&password)?,
            role,
            description,
            proof_image,
            is_verified: false,
            verification_date: None,
            account_details: Default::default(),
            created_at: Utc::now(),
        };
        user.validate()?;
        let user = self.users.create(user).await?;

        let token = self.credentials.issue_token(user.actor())?;
        info!(user_id = %user.id, role = %user.role, "account registered");
        Ok(AuthSession { user, token })
    }

    /// Unknown email and wrong password are reported identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation("Email and password are required."));
        }

        let user = match self.users.find_by_email(email).await? {
            Some(user) if self.credentials.verify_password(password, &user.password) => user,
            _ => {
                debug!("login rejected");
                return Err(AppError::Unauthorized("Invalid email or password.".into()));
            }
        };

        let token = self.credentials.issue_token(user.actor())?;
        info!(user_id = %user.id, "logged in");
        Ok(AuthSession { user, token })
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User or organization"))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.users.list().await
    }

    /// The account behind a verified token.
    pub async fn current_user(&self, actor: &Actor) -> Result<User> {
        self.users
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// Applies the allow-listed `patch` fields. A new proof image is only
    /// taken for organizations.
    pub async fn update(
        &self,
        actor: &Actor,
        target: Uuid,
        patch: UserPatch,
        proof: Option<ImageUpload>,
    ) -> Result<User> {
        let mut user = self.get_user(target).await?;

        if !self.policy.can_manage_user(actor, target) {
            warn!(actor = %actor.id, %target, "user update denied");
            return Err(AppError::forbidden("You are not authorized to update this account."));
        }

        let new_password = patch.password.clone();
        patch.apply(&mut user)?;
        if let Some(password) = new_password {
            if password.is_empty() {
                return Err(AppError::validation("Password cannot be empty."));
            }
            user.password = self.credentials.hash_password(&password)?;
        }

        match proof {
            Some(upload) if user.is_organization() => {
                user.proof_image = Some(self.images.upload(upload).await?);
            }
            Some(_) => debug!(user_id = %user.id, "ignoring proof image for non-organization"),
            None => {}
        }

        let user = self.users.save(user).await?;
        info!(user_id = %user.id, "account updated");
        Ok(user)
    }

    /// Hard delete. Posts and comments by the account are left in place.
    pub async fn remove(&self, actor: &Actor, target: Uuid) -> Result<User> {
        // Existence first so a missing account is never reported as forbidden.
        self.get_user(target).await?;

        if !self.policy.can_manage_user(actor, target) {
            warn!(actor = %actor.id, %target, "user deletion denied");
            return Err(AppError::forbidden("You are not authorized to delete this account."));
        }

        let removed = self
            .users
            .delete(target)
            .await?
            .ok_or_else(|| AppError::not_found("User or organization"))?;
        info!(user_id = %removed.id, "account deleted");
        Ok(removed)
    }

    /// Issues a reset code and mails it. An unknown email is reported as
    /// `NotFound`.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::validation("Email is required."));
        }
        if self.users.find_by_email(email).await?.is_none() {
            return Err(AppError::not_found("User with this email"));
        }

        let code = self.otp.issue(email).await?;
        let message = MailMessage {
            to: email.to_string(),
            subject: "Password Reset OTP".to_string(),
            body: format!("Your OTP for password reset is: {}", code.as_str()),
        };
        self.mail.send(message).await.map_err(|e| match e {
            AppError::MailDelivery(_) => e,
            other => AppError::MailDelivery(other.to_string()),
        })?;

        info!("password reset code dispatched");
        Ok(())
    }

    /// Redeems the code (single use) and stores the new password.
    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<()> {
        let email = normalize_email(email);
        if email.is_empty() || code.trim().is_empty() || new_password.is_empty() {
            return Err(AppError::validation("Email, OTP, and new password are required."));
        }

        if !self.otp.consume(email, &OtpCode::from_input(code.trim())).await? {
            return Err(AppError::InvalidOrExpiredOtp);
        }

        let mut user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found("User with this email"))?;
        user.password = self.credentials.hash_password(new_password)?;
        let user = self.users.save(user).await?;

        info!(user_id = %user.id, "password reset");
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
