use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use school_admin::{
    config::Config,
    db::{init_db, run_migrations},
    docs::ApiDoc,
    routes::{self, RateLimits},
    utils::username_index::UsernameIndex,
};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "School administration API. See /swagger-ui/"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(
        server_addr = %config.server_addr,
        api_prefix = %config.api_prefix,
        "Server starting..."
    );

    let pool = init_db(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to the database")?;

    if config.run_migrations {
        run_migrations(&pool)
            .await
            .context("failed to apply migrations")?;
    }

    let limits = RateLimits::from_config(&config)?;

    let username_index = Data::new(UsernameIndex::new());
    let index_for_warmup = username_index.clone();
    let pool_for_warmup = pool.clone();

    actix_web::rt::spawn(async move {
        // Every name into the filter; the last 30 days of logins into the cache
        if let Err(e) = index_for_warmup.warmup(&pool_for_warmup, 30, 250).await {
            error!(error = %e, "Failed to warm up username index");
        }
    });

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(username_index.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, &limits))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
