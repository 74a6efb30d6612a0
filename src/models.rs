use crate::errors::ApiError;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum Role {
    Customer,
    Restaurant,
    Courier,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Customer, Role::Restaurant, Role::Courier, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Restaurant => "RESTAURANT",
            Role::Courier => "COURIER",
            Role::Admin => "ADMIN",
        }
    }

    /// Restaurants and couriers need an administrator's approval before
    /// they may log in.
    pub fn is_moderated(&self) -> bool {
        self.moderated().is_some()
    }

    pub fn moderated(&self) -> Option<ModeratedRole> {
        match self {
            Role::Restaurant => Some(ModeratedRole::Restaurant),
            Role::Courier => Some(ModeratedRole::Courier),
            Role::Customer | Role::Admin => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CUSTOMER" | "USER" => Ok(Role::Customer),
            "RESTAURANT" => Ok(Role::Restaurant),
            "COURIER" | "DELIVERY" | "DELIVERY_BOY" => Ok(Role::Courier),
            "ADMIN" => Ok(Role::Admin),
            other => Err(ApiError::invalid(format!("unknown role '{}'", other))),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModeratedRole {
    Restaurant,
    Courier,
}

impl ModeratedRole {
    pub const ALL: [ModeratedRole; 2] = [ModeratedRole::Restaurant, ModeratedRole::Courier];

    pub fn label(&self) -> &'static str {
        match self {
            ModeratedRole::Restaurant => "Restaurant",
            ModeratedRole::Courier => "Delivery partner",
        }
    }
}

impl From<ModeratedRole> for Role {
    fn from(role: ModeratedRole) -> Self {
        match role {
            ModeratedRole::Restaurant => Role::Restaurant,
            ModeratedRole::Courier => Role::Courier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn outcome(&self) -> ApprovalState {
        match self {
            Decision::Approve => ApprovalState::Approved,
            Decision::Reject => ApprovalState::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantProfile {
    pub restaurant_name: String,
    pub cuisine: String,
    pub description: Option<String>,
    #[serde(serialize_with = "serialize_hhmm")]
    pub opening_time: NaiveTime,
    #[serde(serialize_with = "serialize_hhmm")]
    pub closing_time: NaiveTime,
    pub license_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierProfile {
    pub vehicle: String,
    pub license_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    Basic,
    Restaurant(RestaurantProfile),
    Courier(CourierProfile),
}

/// Everything about a new account except its credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDetails {
    pub role: Role,
    pub display_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub display_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile: Profile,
    pub approval_state: ApprovalState,
    pub registered_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
}

impl Account {
    pub fn is_pending(&self) -> bool {
        self.approval_state == ApprovalState::Pending
    }

    pub fn is_pending_as(&self, role: ModeratedRole) -> bool {
        self.role == Role::from(role) && self.is_pending()
    }
}

// Weak reference to an account awaiting review. Derived from the account's
// approval state, never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationEntry {
    pub role: Role,
    pub account_id: i64,
    pub email: String,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Account> for ModerationEntry {
    fn from(account: &Account) -> Self {
        Self {
            role: account.role,
            account_id: account.id,
            email: account.email.clone(),
            submitted_at: account.registered_at,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub approval_state: ApprovalState,
    pub approved: bool,
    pub registered_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant: Option<RestaurantProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier: Option<CourierProfile>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        let (restaurant, courier) = match &account.profile {
            Profile::Basic => (None, None),
            Profile::Restaurant(p) => (Some(p.clone()), None),
            Profile::Courier(p) => (None, Some(p.clone())),
        };

        Self {
            id: account.id,
            email: account.email.clone(),
            name: account.display_name.clone(),
            role: account.role,
            phone: account.phone.clone(),
            address: account.address.clone(),
            approval_state: account.approval_state,
            approved: account.approval_state == ApprovalState::Approved,
            registered_at: account.registered_at,
            reviewed_at: account.reviewed_at,
            reviewed_by: account.reviewed_by.clone(),
            restaurant,
            courier,
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_by_role: BTreeMap<Role, u64>,
    pub pending_by_role: BTreeMap<Role, u64>,
    pub approved_by_role: BTreeMap<Role, u64>,
    pub rejected_by_role: BTreeMap<Role, u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String, // Subject (email)
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
    pub account_id: i64,
    pub role: Role,
}

// DTOs
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRegistrationRequest {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantRegistrationRequest {
    pub name: Option<String>,
    pub owner_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub restaurant_name: Option<String>,
    pub cuisine: Option<String>,
    pub cuisine_type: Option<String>,
    pub description: Option<String>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub license_number: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CourierRegistrationRequest {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub vehicle: Option<String>,
    pub vehicle_type: Option<String>,
    pub license_number: Option<String>,
    pub driving_license_number: Option<String>,
}

/// A registration that passed validation, ready for hashing and storage.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub details: AccountDetails,
}

impl CustomerRegistrationRequest {
    pub fn validate(self) -> Result<Registration, ApiError> {
        if let Some(role) = self.role.as_deref().filter(|r| !r.trim().is_empty()) {
            match role.parse::<Role>()? {
                Role::Customer => {}
                Role::Admin => {
                    return Err(ApiError::invalid("administrators cannot self-register"))
                }
                other => {
                    return Err(ApiError::invalid(format!(
                        "role {} must use its own registration endpoint",
                        other
                    )))
                }
            }
        }

        let (email, password) = credentials(self.email, self.password)?;
        Ok(Registration {
            email,
            password,
            details: AccountDetails {
                role: Role::Customer,
                display_name: required("name", either(self.name, self.full_name))?,
                phone: optional(self.phone),
                address: optional(self.address),
                profile: Profile::Basic,
            },
        })
    }
}

impl RestaurantRegistrationRequest {
    pub fn validate(self) -> Result<Registration, ApiError> {
        let (email, password) = credentials(self.email, self.password)?;
        let display_name = required("name", either(self.name, self.owner_name))?;
        let profile = RestaurantProfile {
            restaurant_name: required("restaurantName", self.restaurant_name)?,
            cuisine: required("cuisine", either(self.cuisine, self.cuisine_type))?,
            description: optional(self.description),
            opening_time: time_of_day("openingTime", self.opening_time)?,
            closing_time: time_of_day("closingTime", self.closing_time)?,
            license_number: optional(self.license_number),
        };

        Ok(Registration {
            email,
            password,
            details: AccountDetails {
                role: Role::Restaurant,
                display_name,
                phone: optional(self.phone),
                address: optional(self.address),
                profile: Profile::Restaurant(profile),
            },
        })
    }
}

impl CourierRegistrationRequest {
    pub fn validate(self) -> Result<Registration, ApiError> {
        let (email, password) = credentials(self.email, self.password)?;
        let display_name = required("name", either(self.name, self.full_name))?;
        let profile = CourierProfile {
            vehicle: required("vehicle", either(self.vehicle, self.vehicle_type))?,
            license_number: required(
                "licenseNumber",
                either(self.license_number, self.driving_license_number),
            )?,
        };

        Ok(Registration {
            email,
            password,
            details: AccountDetails {
                role: Role::Courier,
                display_name,
                phone: optional(self.phone),
                address: optional(self.address),
                profile: Profile::Courier(profile),
            },
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub role: Role,
    pub id: i64,
    pub email: String,
    pub name: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub approval_state: ApprovalState,
}

impl From<&Account> for RegistrationResponse {
    fn from(account: &Account) -> Self {
        let message = match account.role.moderated() {
            Some(kind) => format!("{} registered successfully. Wait for approval.", kind.label()),
            None => "User registered successfully".to_string(),
        };

        Self {
            success: true,
            message,
            id: account.id,
            email: account.email.clone(),
            role: account.role,
            approval_state: account.approval_state,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// One `@` with something on both sides. Expects a normalized address.
pub fn is_valid_email(email: &str) -> bool {
    matches!(
        email.split_once('@'),
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@')
    )
}

fn credentials(email: Option<String>, password: Option<String>) -> Result<(String, String), ApiError> {
    let email = normalize_email(&required("email", email)?);
    if !is_valid_email(&email) {
        return Err(ApiError::invalid(format!("'{}' is not a valid email", email)));
    }

    let password = password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::invalid("password is required"))?;

    Ok((email, password))
}

fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    optional(value).ok_or_else(|| ApiError::invalid(format!("{} is required", field)))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// First non-blank of two fields that name the same thing.
fn either(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    optional(primary).or_else(|| optional(fallback))
}

fn time_of_day(field: &str, value: Option<String>) -> Result<NaiveTime, ApiError> {
    let raw = required(field, value)?;
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .map_err(|_| ApiError::invalid(format!("{} must be HH:MM, got '{}'", field, raw)))
}

fn serialize_hhmm<S: serde::Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format("%H:%M"))
}
