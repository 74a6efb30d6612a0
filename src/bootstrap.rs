//! Startup provisioning of the configured administrator.

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::{Account, Role};
use crate::services::AuthService;
use crate::store::IdentityStore;
use log::{info, warn};

/// Creates the administrator named by `ADMIN_EMAIL`/`ADMIN_PASSWORD` unless
/// the email is already taken. Returns the account that was created, if any.
pub fn provision_admin(store: &IdentityStore, config: &AppConfig) -> Result<Option<Account>, ApiError> {
    let Some(admin) = &config.admin else {
        info!("No bootstrap administrator configured");
        return Ok(None);
    };

    match store.find_by_email(&admin.email) {
        Ok(existing) if existing.role == Role::Admin => {
            info!("Administrator {} already present", existing.email);
            return Ok(None);
        }
        Ok(existing) => {
            warn!(
                "{} is registered as {}, not provisioning it as administrator",
                existing.email, existing.role
            );
            return Ok(None);
        }
        Err(ApiError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let password_hash = AuthService::hash_password(&admin.password, config)?;
    store
        .provision_admin(&admin.email, password_hash, &admin.name)
        .map(Some)
}
