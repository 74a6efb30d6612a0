use crate::models::{is_valid_email, normalize_email};
use log::{warn, LevelFilter};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::env;

const MIN_SECRET_LEN: usize = 16;
const MAX_JWT_EXPIRY_HOURS: i64 = 24 * 365;

// Credentials for the administrator created at startup.
#[derive(Clone, Debug)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
    pub name: String,
}

// Config
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub jwt_secret: String,
    pub jwt_expiry: i64, // In hours
    pub bcrypt_cost: u32,
    pub log_level: LevelFilter,
    pub admin: Option<AdminBootstrap>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: 2,
            jwt_secret: Self::generate_secure_secret(),
            jwt_expiry: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            log_level: LevelFilter::Debug,
            admin: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Unparseable
    /// numeric values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET is not set, generating a random secret");
                warn!("Issued tokens will not survive a restart!");
                defaults.jwt_secret.clone()
            }
        };

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (None, None) => None,
            (email, password) => Some(AdminBootstrap {
                email: email.unwrap_or_default(),
                password: password.unwrap_or_default(),
                name: lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
            }),
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(lookup("PORT"), defaults.port),
            workers: parse_or(lookup("WORKERS"), defaults.workers),
            jwt_secret,
            jwt_expiry: parse_or(lookup("JWT_EXPIRY_HOURS"), defaults.jwt_expiry),
            bcrypt_cost: parse_or(lookup("BCRYPT_COST"), defaults.bcrypt_cost),
            log_level: parse_or(lookup("LOG_LEVEL"), defaults.log_level),
            admin,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(format!("JWT_SECRET must be at least {} bytes", MIN_SECRET_LEN));
        }

        if !(1..=MAX_JWT_EXPIRY_HOURS).contains(&self.jwt_expiry) {
            return Err(format!(
                "JWT_EXPIRY_HOURS must be between 1 and {}",
                MAX_JWT_EXPIRY_HOURS
            ));
        }

        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err("BCRYPT_COST must be between 4 and 31".to_string());
        }

        if self.workers == 0 {
            return Err("WORKERS must be positive".to_string());
        }

        if let Some(admin) = &self.admin {
            if admin.email.trim().is_empty() || admin.password.is_empty() {
                return Err("ADMIN_EMAIL and ADMIN_PASSWORD must be set together".to_string());
            }
            if !is_valid_email(&normalize_email(&admin.email)) {
                return Err(format!("ADMIN_EMAIL '{}' is not a valid email", admin.email));
            }
        }

        Ok(())
    }

    pub fn generate_secure_secret() -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
