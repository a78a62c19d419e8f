use actix_web::web::{Data, Json};
use actix_web::{post, web, HttpRequest};
use serde_json::json;

use crate::config::Config;
use crate::db;
use crate::errors::ServiceError;
use crate::games::Game;
use crate::leagues::League;
use crate::lifecycle;
use crate::scoreboard;
use crate::server::Response;
use crate::weeks::{WeekConfig, WeekSyncOutcome};

#[derive(Debug, Deserialize)]
pub struct SyncGamesRequest {
    pub league_id: i64,
    pub week_number: Option<i16>,
    pub season_type: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SyncWeekRequest {
    pub league_id: i64,
    pub week_number: Option<i16>,
    #[serde(default)]
    pub allow_fallback_lock: bool,
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub league_id: i64,
    pub week_number: Option<i16>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub league_id: i64,
    pub season_type: Option<i32>,
}

/// Every trigger call authenticates with the scheduler's shared secret
/// before any side effect happens.
fn verify_trigger(request: &HttpRequest) -> Result<(), ServiceError> {
    let presented = request
        .headers()
        .get("x-trigger-secret")
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(secret) if secret == Config::trigger_secret() => Ok(()),
        _ => Err(ServiceError::Unauthorized),
    }
}

/// A standalone sync has no retry wrapper around it: upstream failure is a
/// direct 502 instead of a not-ready outcome.
#[post("/trigger/sync-games")]
async fn sync_games(
    request: HttpRequest,
    body: Json<SyncGamesRequest>,
    pool: Data<db::Pool>,
) -> Response {
    verify_trigger(&request)?;

    let body = body.into_inner();
    let league_id = body.league_id;

    let conn = pool.get()?;
    let league = web::block(move || League::find_by_id(league_id, &conn)).await?;

    let week_number = body.week_number.unwrap_or(league.current_week);
    let season_type = body.season_type.unwrap_or(scoreboard::DEFAULT_SEASON_TYPE);

    let provider_games = scoreboard::Client::new()
        .fetch(league.season_year, week_number, season_type)
        .await?;

    if provider_games.is_empty() {
        http_ok_json!(json!({ "ok": true, "upserted": 0, "reason": "no_provider_data" }));
    }

    let conn = pool.get()?;
    let upserted = web::block(move || {
        Game::upsert_provider_games(
            &league,
            week_number,
            scoreboard::PROVIDER,
            &provider_games,
            &conn,
        )
    })
    .await?;

    http_ok_json!(json!({ "ok": true, "upserted": upserted }));
}

#[post("/trigger/sync-week")]
async fn sync_week(
    request: HttpRequest,
    body: Json<SyncWeekRequest>,
    pool: Data<db::Pool>,
) -> Response {
    verify_trigger(&request)?;

    let body = body.into_inner();
    let conn = pool.get()?;

    let outcome = web::block(move || {
        let league = League::find_by_id(body.league_id, &conn)?;
        let week_number = body.week_number.unwrap_or(league.current_week);
        WeekConfig::sync(&league, week_number, body.allow_fallback_lock, &conn)
    })
    .await?;

    match outcome {
        WeekSyncOutcome::Synced(config) => {
            http_ok_json!(json!({ "ok": true, "synced": true, "config": config }));
        }
        WeekSyncOutcome::NoGames => {
            http_ok_json!(json!({ "ok": true, "synced": false, "reason": "no_games_for_week" }));
        }
    }
}

#[post("/trigger/grade")]
async fn grade(request: HttpRequest, body: Json<GradeRequest>, pool: Data<db::Pool>) -> Response {
    verify_trigger(&request)?;

    let body = body.into_inner();
    let conn = pool.get()?;

    let summary = web::block(move || {
        let league = League::find_by_id(body.league_id, &conn)?;
        let week_number = body.week_number.unwrap_or(league.current_week);
        lifecycle::grade_week(&league, week_number, &conn)
    })
    .await?;

    http_ok_json!(json!({
        "ok": true,
        "weekNumber": summary.week_number,
        "allFinal": summary.all_final,
        "resultsWritten": summary.results_written,
    }));
}

#[post("/trigger/advance")]
async fn advance(
    request: HttpRequest,
    body: Json<AdvanceRequest>,
    pool: Data<db::Pool>,
) -> Response {
    verify_trigger(&request)?;

    let body = body.into_inner();
    let season_type = body.season_type.unwrap_or(scoreboard::DEFAULT_SEASON_TYPE);

    let outcome = lifecycle::advance(body.league_id, season_type, pool.get_ref().clone()).await?;

    http_ok_json!(outcome.to_body());
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(sync_games);
    cfg.service(sync_week);
    cfg.service(grade);
    cfg.service(advance);
}
