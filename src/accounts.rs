//! Account store collaborator.
//!
//! The relay only needs to read and write ratings; accounts themselves are
//! created elsewhere. `InMemoryAccountStore` backs the standalone binary and
//! the tests.

use std::collections::HashMap;

use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::game::DEFAULT_RATING;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub rating: i32,
}

impl Account {
    /// A fresh account with the default rating.
    pub fn new(id: &str, username: &str, email: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            display_name: username.to_string(),
            rating: DEFAULT_RATING,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("account not found: {0}")]
    NotFound(String),
}

/// Blocking account repository. Callers on the actor system run it off the
/// arbiter thread.
pub trait AccountStore: Send + Sync {
    fn get_by_id(&self, id: &str) -> Result<Account, StoreError>;
    fn get_by_username(&self, username: &str) -> Result<Account, StoreError>;
    fn get_by_email(&self, email: &str) -> Result<Account, StoreError>;
    fn update(&self, account: &Account) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account.
    pub fn insert(&self, account: Account) {
        debug!("[Accounts] Stored account id={} rating={}", account.id, account.rating);
        self.accounts.write().insert(account.id.clone(), account);
    }

    fn find(&self, what: &str, pred: impl Fn(&Account) -> bool) -> Result<Account, StoreError> {
        self.accounts
            .read()
            .values()
            .find(|a| pred(a))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(what.to_string()))
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get_by_id(&self, id: &str) -> Result<Account, StoreError> {
        self.accounts
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn get_by_username(&self, username: &str) -> Result<Account, StoreError> {
        self.find(username, |a| a.username == username)
    }

    fn get_by_email(&self, email: &str) -> Result<Account, StoreError> {
        self.find(email, |a| a.email.eq_ignore_ascii_case(email))
    }

    fn update(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write();
        match accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(account.id.clone())),
        }
    }
}
