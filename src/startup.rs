use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::http::{header, Method};
use actix_web::web::{JsonConfig, PathConfig, QueryConfig};
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::LockoutPolicy;
use crate::configuration::{ApplicationSettings, DatabaseSettings, JwtSettings, Settings};
use crate::domain::instagram::PostKind;
use crate::email_client::EmailClient;
use crate::error::AppError;
use crate::logger::{LoggerMiddleware, REQUEST_ID_HEADER};
use crate::middleware::{JwtMiddleware, RateLimitMiddleware};
use crate::mock_feed::{spawn_mock_feed, FeedBus};
use crate::routes::{self, instagram, youtube};
use crate::security::{RateLimitConfig, RateLimiterManager, SecurityHeaders};
use crate::tasks::spawn_story_purge;

/// Builds a pool that connects on first use.
pub fn get_connection_pool(configuration: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(configuration.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&configuration.connection_string())
}

fn cors(settings: &ApplicationSettings) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .expose_headers(vec![header::HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(3600);

    if settings.cors_origins.iter().any(|origin| origin == "*") {
        return cors.allow_any_origin();
    }
    settings
        .cors_origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

fn auth_routes(cfg: &mut web::ServiceConfig, jwt: &JwtSettings) {
    cfg.route("/register", web::post().to(routes::register))
        .route("/login", web::post().to(routes::login))
        .route("/refresh", web::post().to(routes::refresh))
        .route("/verify-email", web::get().to(routes::verify_email))
        .route("/forgot-password", web::post().to(routes::forgot_password))
        .route("/reset-password", web::post().to(routes::reset_password))
        .service(
            web::resource("/logout")
                .wrap(JwtMiddleware::new(jwt.clone()))
                .route(web::post().to(routes::logout)),
        )
        .service(
            web::resource("/me")
                .wrap(JwtMiddleware::new(jwt.clone()))
                .route(web::get().to(routes::get_current_user)),
        );
}

fn dashboard_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/campaigns")
            .route("", web::get().to(routes::list_campaigns))
            .route("", web::post().to(routes::create_campaign))
            // before "/{id}"
            .route("/stats", web::get().to(routes::campaign_stats))
            .route("/{id}", web::get().to(routes::get_campaign))
            .route("/{id}", web::put().to(routes::update_campaign))
            .route("/{id}", web::delete().to(routes::delete_campaign))
            .route("/{id}/status", web::patch().to(routes::update_campaign_status))
            .route("/{id}/ads", web::get().to(routes::list_campaign_ads)),
    )
    .service(
        web::scope("/ads")
            .route("", web::get().to(routes::list_ads))
            .route("", web::post().to(routes::create_ad))
            .route("/{id}", web::get().to(routes::get_ad))
            .route("/{id}", web::put().to(routes::update_ad))
            .route("/{id}", web::delete().to(routes::delete_ad))
            .route("/{id}/status", web::patch().to(routes::update_ad_status)),
    )
    .service(
        web::scope("/analytics")
            .route("", web::post().to(routes::record_analytics))
            .route("/overview", web::get().to(routes::overview))
            .route("/campaigns/{id}", web::get().to(routes::campaign_series)),
    )
    .route("/telemetry/stream", web::get().to(routes::telemetry_stream))
    .route("/admin/users", web::get().to(routes::list_users));
}

fn instagram_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/posts")
            .app_data(web::Data::new(PostKind::Post))
            .route("", web::get().to(instagram::list_posts))
            .route("", web::post().to(instagram::create_post))
            .route("/{id}", web::get().to(instagram::get_post))
            .route("/{id}", web::patch().to(instagram::update_caption))
            .route("/{id}", web::delete().to(instagram::delete_post))
            .route("/{id}/like", web::post().to(instagram::like_post))
            .route("/{id}/like", web::delete().to(instagram::unlike_post))
            .route("/{id}/comments", web::get().to(instagram::list_comments))
            .route("/{id}/comments", web::post().to(instagram::add_comment)),
    )
    .service(
        web::scope("/reels")
            .app_data(web::Data::new(PostKind::Reel))
            .route("", web::get().to(instagram::list_reels))
            .route("", web::post().to(instagram::create_reel))
            .route("/{id}", web::get().to(instagram::get_reel))
            .route("/{id}", web::patch().to(instagram::update_caption))
            .route("/{id}", web::delete().to(instagram::delete_post))
            .route("/{id}/like", web::post().to(instagram::like_post))
            .route("/{id}/like", web::delete().to(instagram::unlike_post))
            .route("/{id}/comments", web::get().to(instagram::list_comments))
            .route("/{id}/comments", web::post().to(instagram::add_comment)),
    )
    .service(
        web::scope("/stories")
            .route("", web::get().to(instagram::list_stories))
            .route("", web::post().to(instagram::create_story))
            .route("/{id}", web::get().to(instagram::get_story))
            .route("/{id}", web::delete().to(instagram::delete_story))
            .route("/{id}/view", web::post().to(instagram::view_story)),
    )
    .service(
        web::scope("/advertisements")
            .route("", web::get().to(instagram::list_advertisements))
            .route("", web::post().to(instagram::create_advertisement))
            .route("/{id}", web::get().to(instagram::get_advertisement))
            .route("/{id}", web::put().to(instagram::update_advertisement))
            .route("/{id}", web::delete().to(instagram::delete_advertisement))
            .route("/{id}/click", web::post().to(instagram::record_click))
            .route("/{id}/impression", web::post().to(instagram::record_impression)),
    )
    .service(
        web::scope("/analytics")
            .route("/events", web::post().to(instagram::create_event))
            .route("/posts/{post_id}", web::get().to(instagram::post_event_counts))
            .route("/summary", web::get().to(instagram::events_summary)),
    );
}

fn youtube_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/channels")
            .route("", web::get().to(youtube::list_channels))
            .route("", web::post().to(youtube::create_channel))
            .route("/{id}", web::get().to(youtube::get_channel))
            .route("/{id}/videos", web::get().to(youtube::list_channel_videos))
            .route("/{id}/subscribe", web::post().to(youtube::subscribe))
            .route("/{id}/subscribe", web::delete().to(youtube::unsubscribe)),
    )
    .route("/subscriptions", web::get().to(youtube::my_subscriptions))
    .service(
        web::scope("/videos")
            .route("", web::get().to(youtube::list_videos))
            .route("", web::post().to(youtube::create_video))
            .route("/{id}", web::get().to(youtube::get_video))
            .route("/{id}", web::put().to(youtube::update_video))
            .route("/{id}", web::delete().to(youtube::delete_video))
            .route("/{id}/like", web::post().to(youtube::like_video))
            .route("/{id}/like", web::delete().to(youtube::unlike_video))
            .route("/{id}/comments", web::get().to(youtube::list_video_comments))
            .route("/{id}/comments", web::post().to(youtube::add_video_comment)),
    );
}

/// Starts background jobs and returns the HTTP server.
pub fn run(
    listener: TcpListener,
    connection: PgPool,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let email_client = EmailClient::from_settings(
        &settings.email_client,
        &settings.application.base_url,
    )
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let feed_bus = FeedBus::new();
    spawn_mock_feed(feed_bus.clone(), settings.mock_feed.clone());
    spawn_story_purge(
        connection.clone(),
        Duration::from_secs(settings.application.story_purge_interval_seconds),
    );

    let rate_limiter = Arc::new(RateLimiterManager::new(RateLimitConfig::from(
        &settings.security,
    )));
    let lockout = LockoutPolicy::new(
        settings.security.max_login_attempts,
        settings.security.lock_duration_seconds,
    );
    let max_body = settings.security.max_content_length as usize;

    let connection = web::Data::new(connection);
    let jwt_config = settings.jwt.clone();
    let jwt_data = web::Data::new(settings.jwt.clone());
    let lockout = web::Data::new(lockout);
    let email_client = web::Data::new(email_client);
    let feed_bus = web::Data::new(feed_bus);
    let application = settings.application.clone();

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware; the last `wrap` runs first
            .wrap(RateLimitMiddleware::new(rate_limiter.clone()))
            .wrap(SecurityHeaders::middleware())
            .wrap(cors(&application))
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)
            // Extractor failures use the same error envelope as handlers
            .app_data(
                JsonConfig::default()
                    .limit(max_body)
                    .error_handler(|err, _req| AppError::from(err).into()),
            )
            .app_data(PathConfig::default().error_handler(|err, _req| AppError::from(err).into()))
            .app_data(QueryConfig::default().error_handler(|err, _req| AppError::from(err).into()))
            // Shared state
            .app_data(connection.clone())
            .app_data(jwt_data.clone())
            .app_data(lockout.clone())
            .app_data(email_client.clone())
            .app_data(feed_bus.clone())
            .route("/health_check", web::get().to(routes::health_check))
            .service(web::scope("/api/v1/auth").configure(|cfg| auth_routes(cfg, &jwt_config)))
            .service(
                web::scope("/api/v1")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .configure(dashboard_routes),
            )
            .service(
                web::scope("/api/instagram")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .configure(instagram_routes),
            )
            .service(
                web::scope("/api/youtube")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .configure(youtube_routes),
            )
            .default_service(web::to(|| async {
                Err::<actix_web::HttpResponse, _>(AppError::not_found("Route not found"))
            }))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
