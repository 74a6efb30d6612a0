use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::Account;
use crate::services::AuthService;
use crate::store::IdentityStore;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use log::error;
use std::future::{ready, Ready};

/// An administrator authenticated by `Authorization: Bearer <token>`.
pub struct AdminSession(pub Account);

fn bearer_token(req: &HttpRequest) -> Result<&str, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("malformed authorization header"))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(ApiError::unauthorized("expected a bearer token")),
    }
}

fn authorize(req: &HttpRequest) -> Result<AdminSession, ApiError> {
    let (store, config) = match (
        req.app_data::<web::Data<IdentityStore>>(),
        req.app_data::<web::Data<AppConfig>>(),
    ) {
        (Some(store), Some(config)) => (store, config),
        _ => {
            error!("Admin extractor used without store or config registered");
            return Err(ApiError::internal("application state missing"));
        }
    };

    let token = bearer_token(req)?;
    AuthService::authorize_admin(store, config, token).map(AdminSession)
}

impl FromRequest for AdminSession {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize(req))
    }
}
