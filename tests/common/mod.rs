#![allow(dead_code)]

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
};
use school_admin::{auth::jwt, config::Config, model::role::Role};
use serde_json::Value;
use sqlx::{MySqlPool, mysql::MySqlPoolOptions};
use std::{net::SocketAddr, time::Duration};

pub const SECRET: &str = "integration-test-secret";
pub const UNREACHABLE_DB: &str = "mysql://nobody@127.0.0.1:1/none";

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        database_max_connections: 2,
        run_migrations: false,
        jwt_secret: SECRET.to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        rate_login_per_min: 1000,
        rate_register_per_min: 1000,
        rate_refresh_per_min: 1000,
        rate_protected_per_min: 10_000,
        api_prefix: "/api".to_string(),
        log_dir: "logs".to_string(),
        log_level: tracing::Level::INFO,
    }
}

/// A pool that never connects until a handler actually queries it, and then
/// gives up after a second.
pub fn lazy_pool() -> MySqlPool {
    MySqlPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(UNREACHABLE_DB)
        .unwrap()
}

/// The rate limiter keys on the peer IP, so every request needs one.
pub fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

pub fn access_token(username: &str, role: Role) -> String {
    jwt::generate_access_token(1, username.to_string(), role.id(), SECRET, 900).unwrap()
}

pub fn refresh_token(username: &str, role: Role) -> String {
    jwt::generate_refresh_token(1, username.to_string(), role.id(), SECRET, 3600)
        .unwrap()
        .0
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Sends `req` and decodes the body as JSON (Null when empty).
pub async fn call_json<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

/// Initializes the full application the way `main` wires it.
macro_rules! test_app {
    ($config:expr, $pool:expr) => {{
        let config: school_admin::config::Config = $config;
        let limits = school_admin::routes::RateLimits::from_config(&config).unwrap();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($pool))
                .app_data(actix_web::web::Data::new(config.clone()))
                .app_data(actix_web::web::Data::new(
                    school_admin::utils::username_index::UsernameIndex::new(),
                ))
                .configure(|cfg| school_admin::routes::configure(cfg, &config, &limits)),
        )
        .await
    }};
}
