//! User persistence.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use super::model::{NewUser, UpdateUser, UserRecord};

/// Store failures the handlers map to client errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No user has this id.
    #[error("user not found")]
    NotFound,

    /// Another user already has this email.
    #[error("email is not unique")]
    DuplicateEmail,
}

/// Persistence for users.
pub trait UserStore: Send + Sync + 'static {
    /// Inserts a user built from `new` and returns it.
    fn create(&self, new: NewUser, now: DateTime<Utc>) -> Result<UserRecord, StoreError>;

    /// Applies the fields present in `update`.
    fn update(&self, id: Uuid, update: UpdateUser, now: DateTime<Utc>) -> Result<UserRecord, StoreError>;

    /// Removes a user.
    fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Returns one page of users ordered by creation time. Pages start at 1.
    fn query(&self, page: usize, rows_per_page: usize) -> Vec<UserRecord>;

    /// Looks up one user.
    fn query_by_id(&self, id: Uuid) -> Result<UserRecord, StoreError>;
}

/// A [`UserStore`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record as-is, replacing any record with the same id.
    pub fn insert(&self, record: UserRecord) {
        self.users.write().insert(record.user_id, record);
    }

    /// Returns the number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

fn email_taken(users: &HashMap<Uuid, UserRecord>, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| Some(u.user_id) != except && u.email.eq_ignore_ascii_case(email))
}

impl UserStore for MemoryUserStore {
    fn create(&self, new: NewUser, now: DateTime<Utc>) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write();
        if email_taken(&users, &new.email, None) {
            return Err(StoreError::DuplicateEmail);
        }

        let record = UserRecord {
            user_id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            roles: new.roles.into_iter().collect(),
            date_created: now,
            date_updated: now,
        };
        users.insert(record.user_id, record.clone());
        Ok(record)
    }

    fn update(&self, id: Uuid, update: UpdateUser, now: DateTime<Utc>) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write();
        if let Some(email) = &update.email {
            if email_taken(&users, email, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }

        let record = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(email) = update.email {
            record.email = email;
        }
        if let Some(roles) = update.roles {
            record.roles = roles.into_iter().collect::<BTreeSet<_>>();
        }
        record.date_updated = now;
        Ok(record.clone())
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.users.write().remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    fn query(&self, page: usize, rows_per_page: usize) -> Vec<UserRecord> {
        let mut users: Vec<UserRecord> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.date_created.cmp(&b.date_created).then(a.user_id.cmp(&b.user_id)));

        let offset = page.saturating_sub(1).saturating_mul(rows_per_page);
        users.into_iter().skip(offset).take(rows_per_page).collect()
    }

    fn query_by_id(&self, id: Uuid) -> Result<UserRecord, StoreError> {
        self.users.read().get(&id).cloned().ok_or(StoreError::NotFound)
    }
}
