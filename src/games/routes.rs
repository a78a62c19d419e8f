use actix_session::Session;
use actix_web::web::{Data, Path, Query};
use actix_web::{get, web};

use crate::auth;
use crate::db;
use crate::server;

use crate::games::models::Game;
use crate::leagues::League;

#[derive(Debug, Deserialize)]
pub struct WeekFilter {
    /// defaults to the league's current week
    pub week: Option<i16>,
}

#[get("/leagues/{id}/games")]
async fn find_week(
    league_id: Path<i64>,
    filter: Query<WeekFilter>,
    pool: Data<db::Pool>,
    session: Session,
) -> server::Response {
    let user_id = auth::get_user_id(&session)?;
    let conn = pool.get()?;

    let games = web::block(move || {
        let league = League::find_by_id(*league_id, &conn)?;
        if !League::verify_member(league.id, user_id, &conn)? {
            forbidden!("you are not a member of this league");
        }

        let week_number = filter.week.unwrap_or(league.current_week);
        Game::find_week(league.id, league.season_year, week_number, &conn)
    })
    .await?;

    http_ok_json!(games);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_week);
}
