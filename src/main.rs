use actix_web::{App, HttpResponse, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use billing_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{CurrencyService, PaymentGateway},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    let currency_service = CurrencyService::new();
    let payment_gateway = PaymentGateway::new(config.payment.clone());

    let catalog_service = PriceCatalogService::new(pool.clone(), currency_service.clone());
    let coupon_service = CouponService::new(pool.clone());
    let usage_service = UsageMeterService::new(pool.clone(), catalog_service.clone());
    let subscription_service = SubscriptionService::new(
        pool.clone(),
        catalog_service.clone(),
        coupon_service.clone(),
        currency_service.clone(),
        payment_gateway.clone(),
        config.billing.clone(),
    );

    // recurring lifecycle sweep
    tasks::spawn_all(
        subscription_service.clone(),
        config.billing.sweep_interval_secs,
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(catalog_service.clone()))
            .app_data(web::Data::new(coupon_service.clone()))
            .app_data(web::Data::new(usage_service.clone()))
            .app_data(web::Data::new(subscription_service.clone()))
            .configure(swagger_config)
            .route(
                "/health",
                web::get().to(|| async { HttpResponse::Ok().json(serde_json::json!({"ok": true})) }),
            )
            .service(
                web::scope("/api/v1")
                    .configure(handlers::catalog_config)
                    .configure(handlers::coupon_config)
                    .configure(handlers::subscription_config)
                    .configure(handlers::usage_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
