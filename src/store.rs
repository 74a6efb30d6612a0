//! Identity Store: account records keyed by email.
//!
//! All writes go through one `RwLock`, so a duplicate check and the insert
//! that follows it are a single step, and readers always see a consistent
//! snapshot of every account's approval state.

use crate::errors::ApiError;
use crate::models::{normalize_email, Account, AccountDetails, ApprovalState, Profile, Role};
use chrono::Utc;
use log::{debug, error, info};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub(crate) struct Registry {
    accounts: BTreeMap<i64, Account>,
    by_email: HashMap<String, i64>,
    next_id: i64,
}

impl Registry {
    pub(crate) fn get(&self, id: i64) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: i64) -> Option<&mut Account> {
        self.accounts.get_mut(&id)
    }

    pub(crate) fn by_email(&self, email: &str) -> Option<&Account> {
        self.by_email.get(email).and_then(|id| self.accounts.get(id))
    }

    /// Accounts in registration order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    fn insert(
        &mut self,
        email: String,
        password_hash: String,
        details: AccountDetails,
        approval_state: ApprovalState,
    ) -> Result<Account, ApiError> {
        if self.by_email.contains_key(&email) {
            debug!("Rejected duplicate registration for {}", email);
            return Err(ApiError::DuplicateEmail);
        }

        self.next_id += 1;
        let account = Account {
            id: self.next_id,
            email: email.clone(),
            password_hash,
            role: details.role,
            display_name: details.display_name,
            phone: details.phone,
            address: details.address,
            profile: details.profile,
            approval_state,
            registered_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        };

        self.by_email.insert(email, account.id);
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }
}

#[derive(Debug, Default)]
pub struct IdentityStore {
    registry: RwLock<Registry>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Public self-service registration. Restaurants and couriers start out
    /// pending, customers are approved on creation. Administrators can only
    /// be created through [`IdentityStore::provision_admin`].
    pub fn register(
        &self,
        email: &str,
        password_hash: String,
        details: AccountDetails,
    ) -> Result<Account, ApiError> {
        let state = match (details.role, &details.profile) {
            (Role::Customer, Profile::Basic) => ApprovalState::Approved,
            (Role::Restaurant, Profile::Restaurant(_)) | (Role::Courier, Profile::Courier(_)) => {
                ApprovalState::Pending
            }
            (Role::Admin, _) => {
                return Err(ApiError::invalid("administrators cannot self-register"));
            }
            (role, _) => {
                return Err(ApiError::invalid(format!("profile does not match role {}", role)));
            }
        };

        let account = self
            .write()?
            .insert(normalize_email(email), password_hash, details, state)?;
        info!(
            "Registered {} account {} ({}) as {:?}",
            account.role, account.id, account.email, account.approval_state
        );
        Ok(account)
    }

    /// Privileged path for creating administrators. Never reachable from the
    /// public registration endpoints.
    pub fn provision_admin(
        &self,
        email: &str,
        password_hash: String,
        display_name: &str,
    ) -> Result<Account, ApiError> {
        let details = AccountDetails {
            role: Role::Admin,
            display_name: display_name.to_string(),
            phone: None,
            address: None,
            profile: Profile::Basic,
        };

        let account = self.write()?.insert(
            normalize_email(email),
            password_hash,
            details,
            ApprovalState::Approved,
        )?;
        info!("Provisioned administrator {} ({})", account.id, account.email);
        Ok(account)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Account, ApiError> {
        let email = normalize_email(email);
        self.read()?
            .by_email(&email)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Account {}", email)))
    }

    pub fn find_by_id(&self, id: i64) -> Result<Account, ApiError> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Account {}", id)))
    }

    pub fn contains_email(&self, email: &str) -> Result<bool, ApiError> {
        Ok(self.read()?.by_email(&normalize_email(email)).is_some())
    }

    pub fn list_by_role(&self, role: Role) -> Result<Vec<Account>, ApiError> {
        Ok(self
            .read()?
            .iter()
            .filter(|a| a.role == role)
            .cloned()
            .collect())
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, Registry>, ApiError> {
        self.registry.read().map_err(|e| {
            error!("Identity store lock poisoned: {}", e);
            ApiError::internal("identity store unavailable")
        })
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, Registry>, ApiError> {
        self.registry.write().map_err(|e| {
            error!("Identity store lock poisoned: {}", e);
            ApiError::internal("identity store unavailable")
        })
    }
}
