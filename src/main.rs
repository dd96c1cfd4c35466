mod auth;
mod availability;
mod bookings;
mod db;
mod error;
mod models;
mod payments;
mod routes;
mod state;

use std::env;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpServer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use crate::state::{AppState, JwtConfig, PaymentConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let db_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./data/docport.db".to_string());
    db::ensure_sqlite_dir(&db_url)?;

    let connect_options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    // Bounded acquire so a stalled store surfaces as Unavailable instead of
    // hanging a request.
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(connect_options)
        .await?;

    db::run_migrations(&pool).await?;
    db::seed_defaults(&pool).await?;

    let secret = env::var("ACCESS_TOKEN_SECRET")
        .map_err(|_| "ACCESS_TOKEN_SECRET must be set to sign session tokens")?;
    let ttl_hours: i64 = env::var("ACCESS_TOKEN_TTL_HOURS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(24);

    let state = AppState {
        db: pool.clone(),
        jwt: JwtConfig::from_secret(&secret, ttl_hours),
        payments: PaymentConfig {
            api_url: env::var("PAYMENT_GATEWAY_URL").unwrap_or_default(),
            secret_key: env::var("PAYMENT_GATEWAY_KEY").unwrap_or_default(),
        },
    };

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(5000);

    let address = format!("0.0.0.0:{port}");
    log::info!("Starting Docport on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes::public::configure)
            .configure(routes::patient::configure)
            .configure(routes::admin::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
