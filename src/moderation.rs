//! Moderation Queue.
//!
//! The queue is a view over each account's approval state. Nothing is
//! enqueued or dequeued: an account is in the queue exactly while its state
//! is `PENDING`.

use crate::errors::ApiError;
use crate::models::{Account, ModeratedRole};
use crate::store::IdentityStore;

pub struct ModerationQueue;

impl ModerationQueue {
    /// Pending accounts of one role kind, oldest submission first.
    pub fn list_pending(store: &IdentityStore, role: ModeratedRole) -> Result<Vec<Account>, ApiError> {
        let registry = store.read()?;
        let mut pending: Vec<Account> = registry
            .iter()
            .filter(|a| a.is_pending_as(role))
            .cloned()
            .collect();
        pending.sort_by(|a, b| (a.registered_at, a.id).cmp(&(b.registered_at, b.id)));
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModerationEntry, Role};
    use crate::store::tests::details;

    #[test]
    fn lists_only_pending_accounts_of_the_requested_role() {
        let store = IdentityStore::new();
        store.register("cust@test.com", "h".into(), details(Role::Customer)).unwrap();
        let rest = store.register("rest@test.com", "h".into(), details(Role::Restaurant)).unwrap();
        let del = store.register("del@test.com", "h".into(), details(Role::Courier)).unwrap();

        let restaurants = ModerationQueue::list_pending(&store, ModeratedRole::Restaurant).unwrap();
        assert_eq!(restaurants, vec![rest]);

        let couriers: Vec<ModerationEntry> = ModerationQueue::list_pending(&store, ModeratedRole::Courier)
            .unwrap()
            .iter()
            .map(ModerationEntry::from)
            .collect();
        assert_eq!(couriers.len(), 1);
        assert_eq!(couriers[0].account_id, del.id);
        assert_eq!(couriers[0].email, "del@test.com");
        assert_eq!(couriers[0].submitted_at, del.registered_at);
    }

    #[test]
    fn pending_accounts_come_out_in_submission_order() {
        let store = IdentityStore::new();
        let emails: Vec<String> = (0..5).map(|i| format!("rest{}@test.com", i)).collect();
        for email in &emails {
            store.register(email, "h".into(), details(Role::Restaurant)).unwrap();
        }

        let listed: Vec<String> = ModerationQueue::list_pending(&store, ModeratedRole::Restaurant)
            .unwrap()
            .into_iter()
            .map(|a| a.email)
            .collect();
        assert_eq!(listed, emails);
    }

    #[test]
    fn empty_store_has_empty_queues() {
        let store = IdentityStore::new();
        for role in ModeratedRole::ALL {
            assert!(ModerationQueue::list_pending(&store, role).unwrap().is_empty());
        }
    }
}
