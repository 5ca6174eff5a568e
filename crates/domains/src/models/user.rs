//! # Identity Models
//!
//! Users, organizations and admins share one record; `role` decides which
//! fields are meaningful and what the holder may do.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Closed set of account kinds. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Organization,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Organization => "organization",
            Role::Admin => "admin",
        }
    }

    /// Capitalised form used in response messages ("Organization registered successfully.")
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Organization => "Organization",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "organization" => Ok(Role::Organization),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::validation(format!("unknown role `{other}`"))),
        }
    }
}

/// The authenticated identity performing an operation, as carried by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A one-way password hash in PHC string form.
///
/// Only the credential store produces these, so a `User` can be saved any
/// number of times without its hash ever being recomputed.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wraps an already-hashed PHC string (credential store or database row).
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Payout metadata for organizations. Free-form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountDetails {
    pub account_number: String,
    pub account_title: String,
    pub bank_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: PasswordHash,
    pub role: Role,
    /// Present iff `role == Organization`
    pub description: Option<String>,
    /// Present iff `role == Organization`
    pub proof_image: Option<String>,
    pub is_verified: bool,
    pub verification_date: Option<DateTime<Utc>>,
    pub account_details: AccountDetails,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }

    pub fn is_organization(&self) -> bool {
        self.role == Role::Organization
    }

    /// Checks the role-dependent field invariants.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Name is required."));
        }
        if self.email.trim().is_empty() {
            return Err(AppError::validation("Email is required."));
        }
        let has_description = self.description.as_deref().is_some_and(|d| !d.trim().is_empty());
        let has_proof = self.proof_image.as_deref().is_some_and(|p| !p.is_empty());
        match self.role {
            Role::Organization if !(has_description && has_proof) => Err(AppError::validation(
                "Name, description, and proof image are required for organizations.",
            )),
            Role::User | Role::Admin if self.description.is_some() || self.proof_image.is_some() => {
                Err(AppError::validation(
                    "Description and proof image are only accepted for organizations.",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Input for a new account, before hashing and persistence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub role: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub description: Option<String>,
}

/// Self-service profile changes. Anything not listed here (role,
/// verification state, id, creation time) cannot be changed by a patch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub description: Option<String>,
    pub account_details: Option<AccountDetails>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.description.is_none()
            && self.account_details.is_none()
    }

    /// Merges the allowed fields onto `user`. The password is applied by the
    /// caller because it has to go through the credential store first.
    pub fn apply(self, user: &mut User) -> crate::Result<()> {
        if let Some(name) = self.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("Name cannot be empty."));
            }
            user.name = name;
        }
        if let Some(email) = self.email {
            let email = normalize_email(&email);
            if email.is_empty() {
                return Err(AppError::validation("Email cannot be empty."));
            }
            user.email = email.to_string();
        }
        if let Some(description) = self.description {
            if user.is_organization() {
                user.description = Some(description);
            }
        }
        if let Some(details) = self.account_details {
            user.account_details = details;
        }
        user.validate()
    }
}

/// The lookup key an email is stored and searched under.
pub fn normalize_email(email: &str) -> &str {
    email.trim()
}

/// Public projection used where a post or comment names its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
