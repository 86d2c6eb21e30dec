use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

/// Resolves the bearer access token into an `AuthUser` request extension,
/// or answers 401 itself.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match authenticate(&req, config) {
        Ok(auth_user) => {
            req.extensions_mut().insert(auth_user);
            next.call(req).await
        }
        Err(message) => {
            debug!(path = %req.path(), reason = message, "Rejected unauthenticated request");
            let resp = HttpResponse::Unauthorized().json(json!({ "message": message }));
            Ok(req.into_response(resp.map_into_boxed_body()))
        }
    }
}

fn authenticate(req: &ServiceRequest, config: &Config) -> Result<AuthUser, &'static str> {
    let header_value = req
        .headers()
        .get("Authorization")
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header encoding")?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must start with Bearer")?;

    let claims =
        verify_token(token, &config.jwt_secret).map_err(|_| "Invalid or expired token")?;

    if claims.token_type != TokenType::Access {
        return Err("Access token required");
    }

    let role = Role::from_id(claims.role).ok_or("Invalid role")?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
    })
}
