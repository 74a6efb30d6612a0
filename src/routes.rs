use crate::approval::ApprovalService;
use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::events::EventPublisher;
use crate::extractors::AdminSession;
use crate::models::*;
use crate::moderation::ModerationQueue;
use crate::services::{AdminService, AuthService};
use crate::store::IdentityStore;
use actix_web::{get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::{debug, error, warn};
use serde_json::json;

// Runs hashing or verification off the async workers.
async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    web::block(f).await.map_err(|e| {
        error!("Blocking operation error: {}", e);
        ApiError::internal(e.to_string())
    })?
}

async fn register(
    store: web::Data<IdentityStore>,
    config: web::Data<AppConfig>,
    events: web::Data<EventPublisher>,
    registration: Registration,
) -> Result<HttpResponse, ApiError> {
    debug!(
        "{} registration attempt for {}",
        registration.details.role, registration.email
    );

    let account = blocking(move || AuthService::register(&store, &config, registration)).await?;

    if let Err(e) = events.publish_account_registered(&account).await {
        warn!("Failed to publish registration event: {}", e);
    }

    Ok(HttpResponse::Created().json(RegistrationResponse::from(&account)))
}

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[post("/auth/register/user")]
async fn register_customer(
    store: web::Data<IdentityStore>,
    config: web::Data<AppConfig>,
    events: web::Data<EventPublisher>,
    body: web::Json<CustomerRegistrationRequest>,
) -> Result<HttpResponse, ApiError> {
    let registration = body.into_inner().validate()?;
    register(store, config, events, registration).await
}

#[post("/auth/register/restaurant")]
async fn register_restaurant(
    store: web::Data<IdentityStore>,
    config: web::Data<AppConfig>,
    events: web::Data<EventPublisher>,
    body: web::Json<RestaurantRegistrationRequest>,
) -> Result<HttpResponse, ApiError> {
    let registration = body.into_inner().validate()?;
    register(store, config, events, registration).await
}

#[post("/auth/register/delivery")]
async fn register_courier(
    store: web::Data<IdentityStore>,
    config: web::Data<AppConfig>,
    events: web::Data<EventPublisher>,
    body: web::Json<CourierRegistrationRequest>,
) -> Result<HttpResponse, ApiError> {
    let registration = body.into_inner().validate()?;
    register(store, config, events, registration).await
}

#[post("/auth/login")]
async fn login(
    store: web::Data<IdentityStore>,
    config: web::Data<AppConfig>,
    events: web::Data<EventPublisher>,
    body: web::Json<LoginRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let LoginRequest { email, password, role } = body.into_inner();
    debug!("Login attempt for {} as {}", email, role);

    let session =
        blocking(move || AuthService::login(&store, &config, &email, &password, role)).await?;

    let ip_address = req.connection_info().realip_remote_addr().map(str::to_string);
    if let Err(e) = events.publish_login(&session.account, ip_address).await {
        warn!("Failed to publish login event: {}", e);
    }

    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token: session.token,
        role: session.account.role,
        id: session.account.id,
        email: session.account.email,
        name: session.account.display_name,
    }))
}

#[get("/admin/stats")]
async fn dashboard_stats(
    store: web::Data<IdentityStore>,
    _admin: AdminSession,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(AdminService::stats(&store)?))
}

fn views(accounts: &[Account]) -> Vec<AccountView> {
    accounts.iter().map(AccountView::from).collect()
}

#[get("/admin/restaurants/pending")]
async fn pending_restaurants(
    store: web::Data<IdentityStore>,
    _admin: AdminSession,
) -> Result<HttpResponse, ApiError> {
    let pending = ModerationQueue::list_pending(&store, ModeratedRole::Restaurant)?;
    debug!("Listed {} pending restaurants", pending.len());
    Ok(HttpResponse::Ok().json(views(&pending)))
}

#[get("/admin/delivery/pending")]
async fn pending_couriers(
    store: web::Data<IdentityStore>,
    _admin: AdminSession,
) -> Result<HttpResponse, ApiError> {
    let pending = ModerationQueue::list_pending(&store, ModeratedRole::Courier)?;
    debug!("Listed {} pending couriers", pending.len());
    Ok(HttpResponse::Ok().json(views(&pending)))
}

#[get("/admin/restaurants")]
async fn all_restaurants(
    store: web::Data<IdentityStore>,
    _admin: AdminSession,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(views(&store.list_by_role(Role::Restaurant)?)))
}

#[get("/admin/delivery")]
async fn all_couriers(
    store: web::Data<IdentityStore>,
    _admin: AdminSession,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(views(&store.list_by_role(Role::Courier)?)))
}

#[get("/admin/customers")]
async fn all_customers(
    store: web::Data<IdentityStore>,
    _admin: AdminSession,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(views(&store.list_by_role(Role::Customer)?)))
}

async fn decide(
    store: web::Data<IdentityStore>,
    events: web::Data<EventPublisher>,
    AdminSession(admin): AdminSession,
    role: ModeratedRole,
    id: i64,
    decision: Decision,
) -> Result<HttpResponse, ApiError> {
    let account = ApprovalService::decide(&store, role, id, decision, &admin)?;

    if let Err(e) = events.publish_decision(&account, decision).await {
        warn!("Failed to publish decision event: {}", e);
    }

    let verb = match decision {
        Decision::Approve => "approved",
        Decision::Reject => "rejected",
    };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("{} {} successfully", role.label(), verb),
        "account": AccountView::from(&account),
    })))
}

#[put("/admin/approve/restaurant/{id}")]
async fn approve_restaurant(
    store: web::Data<IdentityStore>,
    events: web::Data<EventPublisher>,
    admin: AdminSession,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    decide(store, events, admin, ModeratedRole::Restaurant, path.into_inner(), Decision::Approve).await
}

#[put("/admin/reject/restaurant/{id}")]
async fn reject_restaurant(
    store: web::Data<IdentityStore>,
    events: web::Data<EventPublisher>,
    admin: AdminSession,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    decide(store, events, admin, ModeratedRole::Restaurant, path.into_inner(), Decision::Reject).await
}

#[put("/admin/approve/delivery/{id}")]
async fn approve_courier(
    store: web::Data<IdentityStore>,
    events: web::Data<EventPublisher>,
    admin: AdminSession,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    decide(store, events, admin, ModeratedRole::Courier, path.into_inner(), Decision::Approve).await
}

#[put("/admin/reject/delivery/{id}")]
async fn reject_courier(
    store: web::Data<IdentityStore>,
    events: web::Data<EventPublisher>,
    admin: AdminSession,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    decide(store, events, admin, ModeratedRole::Courier, path.into_inner(), Decision::Reject).await
}

/// Registers every route plus body and path error handling. Mount under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::invalid(err.to_string()).into()
    });
    let path = web::PathConfig::default().error_handler(|err, _req| {
        ApiError::invalid(format!("invalid path: {}", err)).into()
    });

    cfg.app_data(json)
        .app_data(path)
        .service(health_check)
        .service(register_customer)
        .service(register_restaurant)
        .service(register_courier)
        .service(login)
        .service(dashboard_stats)
        .service(pending_restaurants)
        .service(pending_couriers)
        .service(all_restaurants)
        .service(all_couriers)
        .service(all_customers)
        .service(approve_restaurant)
        .service(reject_restaurant)
        .service(approve_courier)
        .service(reject_courier);
}
