//! Approval State Machine: `PENDING -> APPROVED | REJECTED`.
//!
//! Both outcomes are terminal. The state check and the transition happen
//! under the store's write lock, so concurrent decisions on one account have
//! exactly one winner and the account leaves the pending view at the same
//! instant its state flips.

use crate::errors::ApiError;
use crate::models::{Account, ApprovalState, Decision, ModeratedRole, Role};
use crate::store::IdentityStore;
use chrono::Utc;
use log::{debug, info};

pub struct ApprovalService;

impl ApprovalService {
    pub fn decide(
        store: &IdentityStore,
        role: ModeratedRole,
        account_id: i64,
        decision: Decision,
        acting_admin: &Account,
    ) -> Result<Account, ApiError> {
        if acting_admin.role != Role::Admin {
            debug!("{} tried to moderate account {}", acting_admin.email, account_id);
            return Err(ApiError::unauthorized("only administrators can moderate accounts"));
        }

        let mut registry = store.write()?;

        // The admin may have been read before this lock was taken.
        let still_admin = registry
            .by_email(&acting_admin.email)
            .map_or(false, |a| a.role == Role::Admin);
        if !still_admin {
            return Err(ApiError::unauthorized("administrator account no longer exists"));
        }

        let account = registry
            .get_mut(account_id)
            .filter(|a| a.role == Role::from(role))
            .ok_or_else(|| ApiError::NotFound(format!("{} {}", role.label(), account_id)))?;

        if account.approval_state != ApprovalState::Pending {
            debug!(
                "Decision {:?} on account {} refused, state is {:?}",
                decision, account_id, account.approval_state
            );
            return Err(ApiError::NotPending);
        }

        account.approval_state = decision.outcome();
        account.reviewed_at = Some(Utc::now());
        account.reviewed_by = Some(acting_admin.email.clone());

        info!(
            "{} {} ({}) moved to {:?} by {}",
            role.label(),
            account.id,
            account.email,
            account.approval_state,
            acting_admin.email
        );
        Ok(account.clone())
    }
}
