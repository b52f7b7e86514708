//! User shapes for persistence, the API, and incoming payloads.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::{roles, ApiResult, FieldErrors};

/// A user as the store keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Primary key.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Unique contact address.
    pub email: String,
    /// Granted roles.
    pub roles: BTreeSet<String>,
    /// Creation time.
    pub date_created: DateTime<Utc>,
    /// Last modification time.
    pub date_updated: DateTime<Utc>,
}

/// A user as the API returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Granted roles.
    pub roles: Vec<String>,
    /// Creation time.
    pub date_created: DateTime<Utc>,
    /// Last modification time.
    pub date_updated: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.user_id,
            name: record.name,
            email: record.email,
            roles: record.roles.into_iter().collect(),
            date_created: record.date_created,
            date_updated: record.date_updated,
        }
    }
}

/// Payload for creating a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    /// Display name; required.
    #[serde(default)]
    pub name: String,
    /// Contact address; must look like an email.
    #[serde(default)]
    pub email: String,
    /// Roles to grant; at least one, all known.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Password; required.
    #[serde(default)]
    pub password: String,
    /// Must equal `password`.
    #[serde(default)]
    pub password_confirm: String,
}

impl NewUser {
    /// Checks every field and reports all failures at once.
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();

        if self.name.trim().is_empty() {
            errors.add("name", "name is a required field");
        }
        if let Err(msg) = check_email(&self.email) {
            errors.add("email", msg);
        }
        if let Err(msg) = check_roles(&self.roles) {
            errors.add("roles", msg);
        }
        if self.password.is_empty() {
            errors.add("password", "password is a required field");
        }
        if self.password_confirm != self.password {
            errors.add("password_confirm", "password_confirm must be equal to password");
        }

        errors.into_result()
    }
}

/// Payload for a partial user update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    /// New display name.
    pub name: Option<String>,
    /// New contact address.
    pub email: Option<String>,
    /// Replacement role set.
    pub roles: Option<Vec<String>>,
    /// New password.
    pub password: Option<String>,
    /// Must equal `password` when that is set.
    pub password_confirm: Option<String>,
}

impl UpdateUser {
    /// Checks the fields that are present.
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();

        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            errors.add("name", "name must not be empty");
        }
        if let Some(Err(msg)) = self.email.as_deref().map(check_email) {
            errors.add("email", msg);
        }
        if let Some(Err(msg)) = self.roles.as_deref().map(check_roles) {
            errors.add("roles", msg);
        }
        if let Some(password) = &self.password {
            if password.is_empty() {
                errors.add("password", "password must not be empty");
            }
            if self.password_confirm.as_ref() != Some(password) {
                errors.add("password_confirm", "password_confirm must be equal to password");
            }
        }

        errors.into_result()
    }
}

fn check_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("email is a required field");
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err("email must be a valid email address")
    }
}

fn check_roles(requested: &[String]) -> Result<(), &'static str> {
    if requested.is_empty() {
        return Err("roles is a required field");
    }
    if requested.iter().any(|r| !roles::ALL.contains(&r.as_str())) {
        return Err("roles must only contain ADMIN or USER");
    }
    Ok(())
}
