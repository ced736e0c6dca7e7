use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::io;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use huddle_service::{
    config::Config,
    db::{create_pool, run_migrations},
    handlers,
    middleware::JwtAuthMiddleware,
    security::jwt,
    AppState,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!("Starting huddle-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    jwt::initialize(
        &config.jwt.secret,
        config.jwt.access_token_ttl,
        config.jwt.refresh_token_ttl,
    )
    .expect("Failed to initialize JWT keys");

    let db_pool = create_pool(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to create database pool");

    tracing::info!(
        "Database pool created with {} max connections",
        config.database.max_connections
    );

    let run_migrations_env = std::env::var("RUN_MIGRATIONS").unwrap_or_else(|_| "true".into());
    if run_migrations_env != "false" {
        tracing::info!("Running database migrations...");
        run_migrations(&db_pool)
            .await
            .expect("Failed to run database migrations");
        tracing::info!("Database migrations completed");
    } else {
        tracing::info!("Skipping database migrations (RUN_MIGRATIONS=false)");
    }

    let state = AppState {
        db: db_pool,
        config: config.clone(),
    };

    let bind_addr = (config.app.host.clone(), config.app.port);
    tracing::info!("Listening on {}:{}", config.app.host, config.app.port);

    HttpServer::new(move || {
        let cors = if state.config.cors.allowed_origins == "*" {
            Cors::permissive()
        } else {
            let mut cors = Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                .allow_any_header()
                .max_age(3600);
            for origin in state.config.cors.allowed_origins.split(',') {
                let origin = origin.trim();
                if !origin.is_empty() {
                    cors = cors.allowed_origin(origin);
                }
            }
            cors
        };

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(TracingLogger::default())
            .wrap(cors)
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(handlers::health_check))
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(handlers::register))
                            .route("/login", web::post().to(handlers::login))
                            .route("/refresh", web::post().to(handlers::refresh_token))
                            .route("/oauth/authorize", web::post().to(handlers::oauth_authorize))
                            .service(
                                web::scope("")
                                    .wrap(JwtAuthMiddleware)
                                    .route("/logout", web::post().to(handlers::logout)),
                            ),
                    )
                    .service(
                        web::scope("")
                            .wrap(JwtAuthMiddleware)
                            .route("/dashboard", web::get().to(handlers::dashboard))
                            .route("/profile", web::put().to(handlers::update_profile))
                            .route(
                                "/profile/consistency",
                                web::put().to(handlers::update_consistency),
                            )
                            .route("/members/{id}", web::get().to(handlers::member_detail))
                            .route("/posts", web::post().to(handlers::create_post))
                            .route("/explore", web::get().to(handlers::explore))
                            .route("/posts/{id}/like", web::post().to(handlers::like_post))
                            .route("/groups", web::get().to(handlers::list_groups))
                            .route("/groups", web::post().to(handlers::create_group))
                            .route("/groups/{id}", web::get().to(handlers::group_detail))
                            .route("/groups/{id}/join", web::post().to(handlers::join_group))
                            .route(
                                "/groups/{id}/posts",
                                web::post().to(handlers::create_group_post),
                            )
                            .route(
                                "/groups/{id}/messages",
                                web::post().to(handlers::send_group_message),
                            ),
                    ),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
