use actix_session::Session;
use actix_web::web::{Data, Json, Path, Query};
use actix_web::{get, post, web};
use serde_json::json;

use crate::auth;
use crate::db;
use crate::errors::ServiceError;
use crate::server;

use crate::leagues::League;
use crate::picks::models::{self, Bye, Pick, PickSubmission, LAST_BYE_WEEK};
use crate::weeks::WeekConfig;

#[derive(Debug, Deserialize)]
pub struct WeekFilter {
    /// defaults to the league's current week
    pub week: Option<i16>,
}

#[post("/picks")]
async fn submit(
    submission: Json<PickSubmission>,
    pool: Data<db::Pool>,
    session: Session,
) -> server::Response {
    let user_id = auth::get_user_id(&session)?;
    let submission = submission.into_inner();
    let conn = pool.get()?;

    let teams_used = web::block(move || {
        let league = League::find_by_id(submission.league_id, &conn)?;
        if !League::verify_member(league.id, user_id, &conn)? {
            forbidden!("you are not a member of this league");
        }

        let week_number = submission.week_number.unwrap_or(league.current_week);
        let config = WeekConfig::find(league.id, league.season_year, week_number, &conn)?
            .ok_or_else(|| {
                ServiceError::BadRequest(format!("week {} is not configured yet", week_number))
            })?;

        models::submit(user_id, &league, &config, &submission, &conn)
    })
    .await?;

    http_ok_json!(json!({ "usedTeams": teams_used }));
}

#[get("/leagues/{id}/picks")]
async fn find_week(
    league_id: Path<i64>,
    filter: Query<WeekFilter>,
    pool: Data<db::Pool>,
    session: Session,
) -> server::Response {
    let user_id = auth::get_user_id(&session)?;
    let conn = pool.get()?;

    let picks = web::block(move || {
        let league = League::find_by_id(*league_id, &conn)?;
        if !League::verify_member(league.id, user_id, &conn)? {
            forbidden!("you are not a member of this league");
        }

        let week_number = filter.week.unwrap_or(league.current_week);
        let revealed = WeekConfig::find(league.id, league.season_year, week_number, &conn)?
            .map(|config| config.is_revealed())
            .unwrap_or(false);

        Pick::find_week_for_viewer(&league, week_number, user_id, revealed, &conn)
    })
    .await?;

    http_ok_json!(picks);
}

#[get("/leagues/{id}/used-teams")]
async fn used_teams(
    league_id: Path<i64>,
    pool: Data<db::Pool>,
    session: Session,
) -> server::Response {
    let user_id = auth::get_user_id(&session)?;
    let conn = pool.get()?;

    let teams = web::block(move || {
        let league = League::find_by_id(*league_id, &conn)?;
        if !League::verify_member(league.id, user_id, &conn)? {
            forbidden!("you are not a member of this league");
        }
        models::used_teams(user_id, &league, &conn)
    })
    .await?;

    http_ok_json!(teams);
}

#[get("/leagues/{id}/bye-status")]
async fn bye_status(
    league_id: Path<i64>,
    pool: Data<db::Pool>,
    session: Session,
) -> server::Response {
    let user_id = auth::get_user_id(&session)?;
    let conn = pool.get()?;

    let status = web::block(move || {
        let league = League::find_by_id(*league_id, &conn)?;
        if !League::verify_member(league.id, user_id, &conn)? {
            forbidden!("you are not a member of this league");
        }

        let bye_week = Bye::season_bye_week(user_id, &league, &conn)?;

        Ok(json!({
            "byeUsedThisSeason": bye_week.is_some(),
            "byeWeek": bye_week,
            "byeThisWeek": bye_week == Some(league.current_week),
            "byeAvailableThrough": LAST_BYE_WEEK,
        }))
    })
    .await?;

    http_ok_json!(status);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(submit);
    cfg.service(find_week);
    cfg.service(used_teams);
    cfg.service(bye_status);
}
