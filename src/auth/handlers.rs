use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::ApiError,
    model::role::Role,
    models::{Claims, LoginReqDto, MessageResponse, RegisterReq, TokenType, UserSql},
    utils::username_index::UsernameIndex,
};
use actix_web::{HttpRequest, HttpResponse, get, web};
use serde::Serialize;
use sqlx::{MySqlConnection, MySqlPool};
use std::str::FromStr;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

/// Inserts a new user and records the name in the username index.
async fn insert_user(
    username: &str,
    password: &str,
    role: Role,
    pool: &MySqlPool,
    index: &UsernameIndex,
) -> Result<(), ApiError> {
    let hashed = hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::Internal
    })?;

    sqlx::query("INSERT INTO users (username, password, role_id) VALUES (?, ?, ?)")
        .bind(username)
        .bind(hashed)
        .bind(role.id())
        .execute(pool)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict("Username already exists.".to_string()),
            other => other,
        })?;

    index.mark_taken(username).await;
    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "Welcome, bursar!")]
    message: String,
    access_token: String,
    refresh_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct ProtectedResponse {
    #[schema(example = "This is a protected route.")]
    message: String,
    #[schema(example = "bursar")]
    user: String,
    #[schema(example = "agent")]
    role: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenPair {
    access_token: String,
    refresh_token: String,
}

/// Register a user
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = MessageResponse),
        (status = 400, description = "Missing username/password or unknown role", body = MessageResponse),
        (status = 403, description = "Admin role requested without an admin access token", body = MessageResponse),
        (status = 409, description = "Username already exists", body = MessageResponse)
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(req, user, pool, config, index), fields(username = %user.username))]
pub async fn register(
    req: HttpRequest,
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    index: web::Data<UsernameIndex>,
) -> Result<HttpResponse, ApiError> {
    let username = user.username.trim();

    if username.is_empty() || user.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required."));
    }

    let role = match user.role.as_deref() {
        Some(name) => Role::from_str(name)
            .map_err(|_| ApiError::bad_request(format!("Unknown role: {name}")))?,
        None => Role::default(),
    };

    if role == Role::Admin && !caller_is_admin(&req, &config) {
        info!("Registration rejected: admin role requested without an admin token");
        return Err(ApiError::Forbidden("Only an admin can create admin accounts"));
    }

    if !index.is_available(username, pool.get_ref()).await? {
        info!("Registration rejected: username taken");
        return Err(ApiError::Conflict("Username already exists.".to_string()));
    }

    insert_user(username, &user.password, role, pool.get_ref(), index.get_ref()).await?;

    info!(%role, "User registered");
    Ok(HttpResponse::Created().json(MessageResponse::new("User registered successfully.")))
}

async fn store_refresh_token(conn: &mut MySqlConnection, claims: &Claims) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(claims.user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(conn)
    .await
    .map(|_| ())
}

fn token_error(e: jsonwebtoken::errors::Error) -> ApiError {
    error!(error = %e, "Failed to sign token");
    ApiError::Internal
}

/// Log in and receive an access/refresh token pair
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = MessageResponse),
        (status = 401, description = "Invalid username or password", body = MessageResponse)
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::bad_request("Username and password are required."));
    }

    let invalid = || ApiError::Unauthorized("Invalid username or password.".to_string());

    let db_user = sqlx::query_as::<_, UserSql>(
        "SELECT id, username, password, role_id FROM users WHERE username = ?",
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| {
        info!("Invalid credentials: user not found");
        invalid()
    })?;

    debug!(user_id = db_user.id, "Verifying password");
    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(invalid());
    }

    let access_token = generate_access_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(token_error)?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(token_error)?;

    let mut conn = pool.acquire().await?;
    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(&mut conn, &refresh_claims).await?;

    // last_login_at only feeds the username cache warmup
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(&mut *conn)
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: format!("Welcome, {}!", db_user.username),
        access_token,
        refresh_token,
    }))
}

#[utoipa::path(
    get,
    path = "/api/protected",
    responses(
        (status = 200, description = "Caller is authenticated", body = ProtectedResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse)
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
#[get("/protected")]
pub async fn protected(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(ProtectedResponse {
        message: "This is a protected route.".to_string(),
        user: auth.username,
        role: auth.role.to_string(),
    })
}

fn bearer_claims(req: &HttpRequest, config: &Config, token_type: TokenType) -> Option<Claims> {
    let token = req
        .headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    verify_token(token, &config.jwt_secret)
        .ok()
        .filter(|claims| claims.token_type == token_type)
}

fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    bearer_claims(req, config, TokenType::Refresh)
}

/// Admin accounts can only be created by a caller holding an admin access token.
fn caller_is_admin(req: &HttpRequest, config: &Config) -> bool {
    bearer_claims(req, config, TokenType::Access)
        .and_then(|claims| Role::from_id(claims.role))
        == Some(Role::Admin)
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token", body = MessageResponse)
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let unauthorized = || ApiError::Unauthorized("Invalid refresh token".to_string());
    let claims = refresh_claims(&req, &config).ok_or_else(unauthorized)?;

    let mut tx = pool.begin().await?;

    let record = sqlx::query_as::<_, (u64, bool)>(
        "SELECT id, revoked FROM refresh_tokens WHERE jti = ? FOR UPDATE",
    )
    .bind(&claims.jti)
    .fetch_optional(&mut *tx)
    .await?;

    let record_id = match record {
        Some((id, false)) => id,
        _ => return Err(unauthorized()),
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(&mut *tx)
        .await?;

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(token_error)?;

    store_refresh_token(&mut tx, &new_claims).await?;

    let access_token = generate_access_token(
        claims.user_id,
        claims.sub,
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(token_error)?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(TokenPair {
        access_token,
        refresh_token: new_refresh_token,
    }))
}

/// Revoke a refresh token. A missing or invalid token still answers 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logged out"),
        (status = 500, description = "Revocation could not be stored", body = MessageResponse)
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let Some(claims) = refresh_claims(&req, &config) else {
        return Ok(HttpResponse::NoContent().finish());
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, jti = %claims.jti, "Failed to revoke refresh token");
            ApiError::from(e)
        })?;

    debug!(jti = %claims.jti, "Refresh token revoked");
    Ok(HttpResponse::NoContent().finish())
}
