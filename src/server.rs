use actix_session::CookieSession;
use actix_web::{cookie, get, middleware, web, App, HttpRequest, HttpResponse, HttpServer};

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::errors::ServiceError;
use crate::games;
use crate::leagues;
use crate::lifecycle;
use crate::picks;

pub type Response = Result<HttpResponse, ServiceError>;

#[get("/health")]
async fn health(_: HttpRequest) -> &'static str {
    "ok"
}

pub async fn launch(db_pool: db::Pool) -> std::io::Result<()> {
    HttpServer::new(move || {
        App::new()
            .data(db_pool.clone())
            .wrap(middleware::DefaultHeaders::new().header("X-Version", env!("CARGO_PKG_VERSION")))
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::default())
            .wrap(
                CookieSession::private(Config::session_private_key().as_bytes())
                    .name("pickem_session")
                    .same_site(cookie::SameSite::Strict)
                    .secure(false),
            )
            .data(web::JsonConfig::default().limit(16_384))
            .data(web::PayloadConfig::default().limit(16_384))
            .service(
                web::scope("/api")
                    .configure(auth::routes::init_routes)
                    .configure(leagues::routes::register)
                    .configure(games::routes::register)
                    .configure(picks::routes::register)
                    .configure(lifecycle::routes::register)
                    .service(health),
            )
    })
    .bind(format!("{}:{}", Config::api_host(), Config::api_port()))?
    .run()
    .await
}
