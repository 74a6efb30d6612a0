use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::*;
use crate::store::IdentityStore;
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error, info};
use uuid::Uuid;

/// A successful login: the bearer token and the account it is bound to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub account: Account,
}

pub struct AuthService;

impl AuthService {
    pub fn hash_password(password: &str, config: &AppConfig) -> Result<String, ApiError> {
        hash(password, config.bcrypt_cost).map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::internal("Failed to hash password")
        })
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
        verify(password, hash).map_err(|e| {
            error!("Failed to verify password: {}", e);
            ApiError::internal("Failed to verify password")
        })
    }

    pub fn generate_token(account: &Account, config: &AppConfig) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.email.clone(),
            exp: (now + Duration::hours(config.jwt_expiry)).timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            account_id: account.id,
            role: account.role,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .map_err(|e| {
            error!("Failed to generate token: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    pub fn verify_token(token: &str, config: &AppConfig) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            ApiError::unauthorized("invalid or expired token")
        })
    }

    /// Hashes the password and stores the account. Email uniqueness is
    /// checked up front to skip the hashing cost, and again by the store.
    pub fn register(
        store: &IdentityStore,
        config: &AppConfig,
        registration: Registration,
    ) -> Result<Account, ApiError> {
        if store.contains_email(&registration.email)? {
            debug!("Registration failed: email already exists {}", registration.email);
            return Err(ApiError::DuplicateEmail);
        }

        let password_hash = Self::hash_password(&registration.password, config)?;
        store.register(&registration.email, password_hash, registration.details)
    }

    /// Checks, in order: known email and matching password, claimed role,
    /// approval state. Every login reads the stored state afresh.
    pub fn login(
        store: &IdentityStore,
        config: &AppConfig,
        email: &str,
        password: &str,
        claimed_role: Role,
    ) -> Result<Session, ApiError> {
        let account = match store.find_by_email(email) {
            Ok(account) => account,
            Err(ApiError::NotFound(_)) => {
                debug!("Login failed: no account for {}", email);
                return Err(ApiError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !Self::verify_password(password, &account.password_hash)? {
            debug!("Login failed: invalid password for {}", account.email);
            return Err(ApiError::InvalidCredentials);
        }

        if account.role != claimed_role {
            debug!(
                "Login failed: {} is {} but claimed {}",
                account.email, account.role, claimed_role
            );
            return Err(ApiError::RoleMismatch);
        }

        if account.approval_state != ApprovalState::Approved {
            debug!(
                "Login failed: {} is {:?}",
                account.email, account.approval_state
            );
            return Err(ApiError::NotApproved);
        }

        let token = Self::generate_token(&account, config)?;
        info!("{} {} logged in successfully", account.role, account.email);
        Ok(Session { token, account })
    }

    /// Resolves a bearer token to a live administrator account.
    pub fn authorize_admin(
        store: &IdentityStore,
        config: &AppConfig,
        token: &str,
    ) -> Result<Account, ApiError> {
        let claims = Self::verify_token(token, config)?;
        let account = store
            .find_by_id(claims.account_id)
            .ok()
            .filter(|a| a.email == claims.sub)
            .ok_or_else(|| ApiError::unauthorized("account no longer exists"))?;

        if account.role != Role::Admin {
            debug!("{} attempted an admin operation", account.email);
            return Err(ApiError::unauthorized("administrator role required"));
        }
        Ok(account)
    }
}

pub struct AdminService;

impl AdminService {
    /// Dashboard counters, computed from a single snapshot of the store.
    pub fn stats(store: &IdentityStore) -> Result<DashboardStats, ApiError> {
        let registry = store.read()?;
        let mut stats = DashboardStats::default();

        for role in Role::ALL {
            stats.total_by_role.insert(role, 0);
        }
        for role in ModeratedRole::ALL.map(Role::from) {
            stats.pending_by_role.insert(role, 0);
            stats.approved_by_role.insert(role, 0);
            stats.rejected_by_role.insert(role, 0);
        }

        for account in registry.iter() {
            *stats.total_by_role.entry(account.role).or_insert(0) += 1;
            if !account.role.is_moderated() {
                continue;
            }
            let bucket = match account.approval_state {
                ApprovalState::Pending => &mut stats.pending_by_role,
                ApprovalState::Approved => &mut stats.approved_by_role,
                ApprovalState::Rejected => &mut stats.rejected_by_role,
            };
            *bucket.entry(account.role).or_insert(0) += 1;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalService;
    use crate::moderation::ModerationQueue;
    use crate::store::tests::details;
    use rstest::rstest;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn config() -> AppConfig {
        AppConfig {
            bcrypt_cost: 4,
            jwt_secret: "unit-test-secret-0123456789".into(),
            ..AppConfig::default()
        }
    }

    fn register(store: &IdentityStore, config: &AppConfig, email: &str, role: Role) -> Account {
        let registration = Registration {
            email: email.into(),
            password: "pw".into(),
            details: details(role),
        };
        AuthService::register(store, config, registration).unwrap()
    }

    fn admin(store: &IdentityStore, config: &AppConfig) -> Account {
        let hash = AuthService::hash_password("admin123", config).unwrap();
        store.provision_admin("admin@test.com", hash, "Admin").unwrap()
    }

    #[test]
    fn pending_restaurant_is_gated_until_approved() {
        let config = config();
        let store = IdentityStore::new();
        let admin = admin(&store, &config);
        let rest = register(&store, &config, "rest1@test.com", Role::Restaurant);

        let pending = ModerationQueue::list_pending(&store, ModeratedRole::Restaurant).unwrap();
        assert!(pending.iter().any(|a| a.email == "rest1@test.com"));
        let before = AdminService::stats(&store).unwrap();

        let err = AuthService::login(&store, &config, "rest1@test.com", "pw", Role::Restaurant).unwrap_err();
        assert_eq!(err, ApiError::NotApproved);

        ApprovalService::decide(&store, ModeratedRole::Restaurant, rest.id, Decision::Approve, &admin).unwrap();

        let session = AuthService::login(&store, &config, "rest1@test.com", "pw", Role::Restaurant).unwrap();
        assert!(!session.token.is_empty());
        assert_eq!(session.account.id, rest.id);
        assert!(ModerationQueue::list_pending(&store, ModeratedRole::Restaurant)
            .unwrap()
            .is_empty());

        let after = AdminService::stats(&store).unwrap();
        assert_eq!(
            after.pending_by_role[&Role::Restaurant] + 1,
            before.pending_by_role[&Role::Restaurant]
        );
        assert_eq!(after.approved_by_role[&Role::Restaurant], 1);
    }

    #[test]
    fn rejected_courier_never_logs_in() {
        let config = config();
        let store = IdentityStore::new();
        let admin = admin(&store, &config);
        let del = register(&store, &config, "del@test.com", Role::Courier);

        ApprovalService::decide(&store, ModeratedRole::Courier, del.id, Decision::Reject, &admin).unwrap();
        let err = AuthService::login(&store, &config, "del@test.com", "pw", Role::Courier).unwrap_err();
        assert_eq!(err, ApiError::NotApproved);
    }

    #[test]
    fn wrong_role_is_a_role_mismatch_not_bad_credentials() {
        let config = config();
        let store = IdentityStore::new();
        register(&store, &config, "cust@test.com", Role::Customer);

        let err = AuthService::login(&store, &config, "cust@test.com", "pw", Role::Restaurant).unwrap_err();
        assert_eq!(err, ApiError::RoleMismatch);

        let err = AuthService::login(&store, &config, "cust@test.com", "nope", Role::Restaurant).unwrap_err();
        assert_eq!(err, ApiError::InvalidCredentials);
    }

    #[test]
    fn unknown_email_and_bad_password_are_invalid_credentials() {
        let config = config();
        let store = IdentityStore::new();
        register(&store, &config, "cust@test.com", Role::Customer);

        assert_eq!(
            AuthService::login(&store, &config, "ghost@test.com", "pw", Role::Customer).unwrap_err(),
            ApiError::InvalidCredentials
        );
        assert_eq!(
            AuthService::login(&store, &config, "cust@test.com", "PW", Role::Customer).unwrap_err(),
            ApiError::InvalidCredentials
        );
        assert!(AuthService::login(&store, &config, "Cust@Test.com", "pw", Role::Customer).is_ok());
    }

    #[test]
    fn duplicate_registration_keeps_first_account() {
        let config = config();
        let store = IdentityStore::new();
        let first = register(&store, &config, "cust@test.com", Role::Customer);

        let again = Registration {
            email: "cust@test.com".into(),
            password: "other".into(),
            details: details(Role::Courier),
        };
        assert_eq!(
            AuthService::register(&store, &config, again).unwrap_err(),
            ApiError::DuplicateEmail
        );
        assert_eq!(store.find_by_email("cust@test.com").unwrap(), first);
    }

    #[test]
    fn token_carries_email_and_role() {
        let config = config();
        let store = IdentityStore::new();
        let admin = admin(&store, &config);

        let session = AuthService::login(&store, &config, "admin@test.com", "admin123", Role::Admin).unwrap();
        let claims = AuthService::verify_token(&session.token, &config).unwrap();
        assert_eq!(claims.sub, "admin@test.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.account_id, admin.id);

        let other = AppConfig {
            jwt_secret: "a-different-secret-9876543210".into(),
            ..config.clone()
        };
        assert!(matches!(
            AuthService::verify_token(&session.token, &other),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn only_admin_tokens_authorize_admin_operations() {
        let config = config();
        let store = IdentityStore::new();
        admin(&store, &config);
        register(&store, &config, "cust@test.com", Role::Customer);

        let admin_session =
            AuthService::login(&store, &config, "admin@test.com", "admin123", Role::Admin).unwrap();
        let customer_session =
            AuthService::login(&store, &config, "cust@test.com", "pw", Role::Customer).unwrap();

        assert!(AuthService::authorize_admin(&store, &config, &admin_session.token).is_ok());
        assert!(matches!(
            AuthService::authorize_admin(&store, &config, &customer_session.token),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            AuthService::authorize_admin(&store, &config, "garbage"),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn stats_pending_matches_queue_length() {
        let config = config();
        let store = IdentityStore::new();
        let admin = admin(&store, &config);
        register(&store, &config, "cust@test.com", Role::Customer);
        let r1 = register(&store, &config, "r1@test.com", Role::Restaurant);
        register(&store, &config, "r2@test.com", Role::Restaurant);
        let d1 = register(&store, &config, "d1@test.com", Role::Courier);

        ApprovalService::decide(&store, ModeratedRole::Restaurant, r1.id, Decision::Approve, &admin).unwrap();
        ApprovalService::decide(&store, ModeratedRole::Courier, d1.id, Decision::Reject, &admin).unwrap();

        let stats = AdminService::stats(&store).unwrap();
        for kind in ModeratedRole::ALL {
            let queued = ModerationQueue::list_pending(&store, kind).unwrap().len() as u64;
            assert_eq!(stats.pending_by_role[&Role::from(kind)], queued);
        }
        assert_eq!(stats.total_by_role[&Role::Customer], 1);
        assert_eq!(stats.total_by_role[&Role::Restaurant], 2);
        assert_eq!(stats.total_by_role[&Role::Courier], 1);
        assert_eq!(stats.total_by_role[&Role::Admin], 1);
        assert_eq!(stats.rejected_by_role[&Role::Courier], 1);
        assert!(!stats.pending_by_role.contains_key(&Role::Customer));
    }

    #[rstest]
    #[case(Role::Restaurant)]
    #[case(Role::Courier)]
    fn pending_moderated_account_cannot_log_in(#[case] role: Role) {
        let config = config();
        let store = IdentityStore::new();
        register(&store, &config, "pending@test.com", role);

        let err = AuthService::login(&store, &config, "pending@test.com", "pw", role).unwrap_err();
        assert_eq!(err, ApiError::NotApproved);
    }

    #[test]
    fn token_must_match_the_account_it_names() {
        let config = config();
        let store = IdentityStore::new();
        let admin = admin(&store, &config);
        let customer = register(&store, &config, "cust@test.com", Role::Customer);

        let forged = Account {
            id: customer.id,
            ..admin.clone()
        };
        let token = AuthService::generate_token(&forged, &config).unwrap();
        assert!(matches!(
            AuthService::authorize_admin(&store, &config, &token),
            Err(ApiError::Unauthorized(_))
        ));

        let token = AuthService::generate_token(&admin, &config).unwrap();
        assert_eq!(AuthService::authorize_admin(&store, &config, &token).unwrap(), admin);
    }

    #[test]
    fn readers_never_observe_a_half_applied_decision() {
        const RESTAURANTS: u64 = 40;

        let config = config();
        let store = IdentityStore::new();
        let admin = admin(&store, &config);
        let ids: Vec<i64> = (0..RESTAURANTS)
            .map(|i| {
                store
                    .register(&format!("r{}@test.com", i), "h".into(), details(Role::Restaurant))
                    .unwrap()
                    .id
            })
            .collect();
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| {
                for (i, id) in ids.iter().enumerate() {
                    let decision = if i % 2 == 0 { Decision::Approve } else { Decision::Reject };
                    ApprovalService::decide(&store, ModeratedRole::Restaurant, *id, decision, &admin)
                        .unwrap();
                }
                done.store(true, Ordering::SeqCst);
            });

            s.spawn(|| loop {
                let finished = done.load(Ordering::SeqCst);

                let stats = AdminService::stats(&store).unwrap();
                let r = Role::Restaurant;
                assert_eq!(stats.total_by_role[&r], RESTAURANTS);
                assert_eq!(
                    stats.pending_by_role[&r] + stats.approved_by_role[&r] + stats.rejected_by_role[&r],
                    stats.total_by_role[&r]
                );

                let pending = ModerationQueue::list_pending(&store, ModeratedRole::Restaurant).unwrap();
                assert!(pending.iter().all(|a| a.approval_state == ApprovalState::Pending));

                if finished {
                    break;
                }
            });
        });

        let stats = AdminService::stats(&store).unwrap();
        assert_eq!(stats.pending_by_role[&Role::Restaurant], 0);
        assert_eq!(stats.approved_by_role[&Role::Restaurant], RESTAURANTS / 2);
        assert_eq!(stats.rejected_by_role[&Role::Restaurant], RESTAURANTS / 2);
    }
}
