use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::web::{Data, Json};
use actix_web::{post, web, HttpResponse};
use serde_json::json;

use crate::db;
use crate::errors::ServiceError;
use crate::server::Response;
use crate::users::{User, UserMessage};
use crate::validator::Validate;

#[post("/register")]
async fn register(user: Json<UserMessage>, pool: Data<db::Pool>) -> Response {
    let mut user = user.into_inner();
    user.validate()?;

    let conn = pool.get()?;

    web::block(move || User::create(&mut user, &conn)).await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

#[post("/login")]
async fn login(credentials: Json<UserMessage>, session: Session, pool: Data<db::Pool>) -> Response {
    let conn = pool.get()?;
    let credentials = credentials.into_inner();

    let user = web::block(move || {
        let user = User::find_by_username(credentials.username, &conn).map_err(|error| {
            match error {
                ServiceError::NotFound => ServiceError::Unauthorized,
                _ => error,
            }
        })?;

        user.verify_password(credentials.password.as_bytes())?;

        Ok(user)
    })
    .await?;

    session.set("user_id", user.id)?;
    session.renew();

    Ok(HttpResponse::new(StatusCode::OK))
}

#[post("/logout")]
async fn logout(session: Session) -> Response {
    let id: Option<i64> = session.get("user_id")?;

    if id.is_some() {
        session.purge();
        Ok(HttpResponse::Ok().json(json!({ "message": "Successfully signed out" })))
    } else {
        Err(ServiceError::Unauthorized)
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register);
    cfg.service(login);
    cfg.service(logout);
}
