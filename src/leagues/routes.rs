use actix_session::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, web};

use crate::auth;
use crate::db;
use crate::server;
use crate::validator::Validate;

use crate::leagues::models::{CreateLeague, League};

#[derive(Debug, Deserialize)]
pub struct JoinLeague {
    pub display_name: Option<String>,
}

#[get("/leagues")]
async fn find_all(pool: Data<db::Pool>, session: Session) -> server::Response {
    let user_id = auth::get_user_id(&session)?;
    let conn = pool.get()?;

    let leagues = web::block(move || League::find_by_user(user_id, &conn)).await?;

    http_ok_json!(leagues);
}

#[get("/leagues/{id}")]
async fn find(league_id: Path<i64>, pool: Data<db::Pool>, session: Session) -> server::Response {
    let user_id = auth::get_user_id(&session)?;
    let conn = pool.get()?;

    let league = web::block(move || {
        let league = League::find_by_id(*league_id, &conn)?;
        if !League::verify_member(league.id, user_id, &conn)? {
            forbidden!("you are not a member of this league");
        }
        Ok(league)
    })
    .await?;

    http_ok_json!(league);
}

#[post("/leagues")]
async fn create(
    league: Json<CreateLeague>,
    pool: Data<db::Pool>,
    session: Session,
) -> server::Response {
    let user_id = auth::get_user_id(&session)?;

    let league = league.into_inner();
    league.validate()?;

    let conn = pool.get()?;

    let league = web::block(move || League::create(league, user_id, &conn)).await?;

    http_created_json!(league);
}

#[post("/leagues/{id}/join")]
async fn join(
    league_id: Path<i64>,
    request: Json<JoinLeague>,
    pool: Data<db::Pool>,
    session: Session,
) -> server::Response {
    let user_id = auth::get_user_id(&session)?;
    let conn = pool.get()?;
    let request = request.into_inner();

    let member = web::block(move || {
        let league = League::find_by_id(*league_id, &conn)?;
        let display_name = match request.display_name {
            Some(name) => name,
            None => crate::users::User::find(user_id, &conn)?.username,
        };
        league.join(user_id, display_name, &conn)
    })
    .await?;

    http_created_json!(member);
}

#[get("/leagues/{id}/members")]
async fn members(league_id: Path<i64>, pool: Data<db::Pool>, session: Session) -> server::Response {
    let user_id = auth::get_user_id(&session)?;
    let conn = pool.get()?;

    let members = web::block(move || {
        if !League::verify_member(*league_id, user_id, &conn)? {
            forbidden!("you are not a member of this league");
        }
        League::members(*league_id, &conn)
    })
    .await?;

    http_ok_json!(members);
}

#[get("/leagues/{id}/standings")]
async fn standings(
    league_id: Path<i64>,
    pool: Data<db::Pool>,
    session: Session,
) -> server::Response {
    let user_id = auth::get_user_id(&session)?;
    let conn = pool.get()?;

    let standings = web::block(move || {
        let league = League::find_by_id(*league_id, &conn)?;
        if !League::verify_member(league.id, user_id, &conn)? {
            forbidden!("you are not a member of this league");
        }
        league.standings(&conn)
    })
    .await?;

    http_ok_json!(standings);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(find);
    cfg.service(create);
    cfg.service(join);
    cfg.service(members);
    cfg.service(standings);
}
