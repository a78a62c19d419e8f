pub mod routes;

use actix_web::web;
use serde_json::json;

use crate::db;
use crate::errors::ServiceError;
use crate::games::Game;
use crate::leagues::{League, FINAL_WEEK};
use crate::picks::Pick;
use crate::schema::pick_results;
use crate::scoreboard;
use crate::weeks::{WeekConfig, WeekSyncOutcome};

use diesel::prelude::*;

/// graded outcome of a single pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PickOutcome {
    Win,
    Loss,
    Pending,
}

impl PickOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PickOutcome::Win => "win",
            PickOutcome::Loss => "loss",
            PickOutcome::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[table_name = "pick_results"]
pub struct NewPickResult {
    pub league_id: i64,
    pub season_year: i32,
    pub week_number: i16,
    pub user_id: i64,
    pub slot: i16,
    pub team_abbr: String,
    pub result: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSummary {
    pub week_number: i16,
    pub games_total: usize,
    pub all_final: bool,
    pub results_written: usize,
}

/// why an advance attempt left the league where it was; all of these are
/// expected steady states that a later scheduler tick retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotReadyReason {
    /// no games have been synced for the current week
    NoGames,
    /// at least one game of the current week is not final
    GamesInProgress,
    /// the league already sits at the final week
    SeasonComplete,
    /// the provider has no events for the next week yet
    NoProviderData,
    /// the provider had events but none survived normalization
    NoGamesSynced,
    /// a concurrent advance moved the pointer first
    AdvanceRaceLost,
}

/// Tagged outcome of an advance attempt. Only `Advanced` moved the pointer;
/// the other two variants are reported as successful no-ops so the caller
/// keeps retrying instead of paging anyone.
#[derive(Debug)]
pub enum AdvanceOutcome {
    Advanced { from: i16, to: i16 },
    NotReady(NotReadyReason),
    UpstreamUnavailable(String),
}

impl AdvanceOutcome {
    pub fn to_body(&self) -> serde_json::Value {
        match self {
            AdvanceOutcome::Advanced { from, to } => json!({
                "ok": true,
                "advanced": true,
                "from": from,
                "to": to,
            }),
            AdvanceOutcome::NotReady(reason) => json!({
                "ok": true,
                "advanced": false,
                "reason": reason,
            }),
            AdvanceOutcome::UpstreamUnavailable(detail) => json!({
                "ok": true,
                "advanced": false,
                "reason": "provider_unavailable",
                "detail": detail,
            }),
        }
    }
}

/// Grade every pick of the week against the games table.
///
/// Results stay pending until the whole week is final; the flag reports
/// whether that point was reached. Pure, so the grading rules are testable
/// without a database.
pub fn compute_results(picks: &[Pick], games: &[Game]) -> (bool, Vec<NewPickResult>) {
    let all_final = Game::all_final(games);
    let winners = Game::winners(games);

    let results = picks
        .iter()
        .map(|pick| {
            let outcome = if !all_final {
                PickOutcome::Pending
            } else if winners.contains(&pick.team_abbr) {
                PickOutcome::Win
            } else {
                PickOutcome::Loss
            };

            NewPickResult {
                league_id: pick.league_id,
                season_year: pick.season_year,
                week_number: pick.week_number,
                user_id: pick.user_id,
                slot: pick.slot,
                team_abbr: pick.team_abbr.clone(),
                result: outcome.as_str().to_string(),
            }
        })
        .collect();

    (all_final, results)
}

/// Full replace of the week's results: delete, recompute, insert, one
/// transaction. Re-running on unchanged games and picks writes the same set,
/// so the scheduler can call this every tick.
pub fn grade_week(
    league: &League,
    week_number: i16,
    conn: &db::Conn,
) -> Result<GradeSummary, ServiceError> {
    let games = Game::find_week(league.id, league.season_year, week_number, conn)?;
    let picks = Pick::find_week(league.id, league.season_year, week_number, conn)?;

    let (all_final, results) = compute_results(&picks, &games);

    let results_written = conn.transaction::<usize, ServiceError, _>(|| {
        diesel::delete(
            pick_results::table
                .filter(pick_results::league_id.eq(league.id))
                .filter(pick_results::season_year.eq(league.season_year))
                .filter(pick_results::week_number.eq(week_number)),
        )
        .execute(conn)?;

        let written = diesel::insert_into(pick_results::table)
            .values(&results)
            .execute(conn)?;

        Ok(written)
    })?;

    debug!(
        "graded league {} week {}: {} results, all_final={}",
        league.id, week_number, results_written, all_final
    );

    Ok(GradeSummary {
        week_number,
        games_total: games.len(),
        all_final,
        results_written,
    })
}

/// Grade the current week and, when every gate passes, move the league
/// pointer one week forward.
///
/// The ordering is the load-bearing invariant of the whole pipeline: the
/// next week's games must be fetched, upserted and configured *before* the
/// pointer moves, so the league never points at a week without a schedule.
pub async fn advance(
    league_id: i64,
    season_type: i32,
    pool: db::Pool,
) -> Result<AdvanceOutcome, ServiceError> {
    let conn = pool.get()?;
    let league = web::block(move || League::find_by_id(league_id, &conn)).await?;

    if league.current_week >= FINAL_WEEK {
        return Ok(AdvanceOutcome::NotReady(NotReadyReason::SeasonComplete));
    }

    let current_week = league.current_week;

    // grading doubles as the completeness check for the current week
    let conn = pool.get()?;
    let graded = {
        let league = league.clone();
        web::block(move || grade_week(&league, current_week, &conn)).await?
    };

    if graded.games_total == 0 {
        return Ok(AdvanceOutcome::NotReady(NotReadyReason::NoGames));
    }

    if !graded.all_final {
        return Ok(AdvanceOutcome::NotReady(NotReadyReason::GamesInProgress));
    }

    let next_week = current_week + 1;

    let provider_games = match scoreboard::Client::new()
        .fetch(league.season_year, next_week, season_type)
        .await
    {
        Ok(games) => games,
        Err(error) => {
            warn!(
                "advance for league {} waiting on provider: {}",
                league_id, error
            );
            return Ok(AdvanceOutcome::UpstreamUnavailable(error.to_string()));
        }
    };

    if provider_games.is_empty() {
        return Ok(AdvanceOutcome::NotReady(NotReadyReason::NoProviderData));
    }

    let conn = pool.get()?;
    let outcome = web::block(move || {
        let upserted = Game::upsert_provider_games(
            &league,
            next_week,
            scoreboard::PROVIDER,
            &provider_games,
            &conn,
        )?;

        if upserted == 0 {
            return Ok(AdvanceOutcome::NotReady(NotReadyReason::NoGamesSynced));
        }

        match WeekConfig::sync(&league, next_week, false, &conn)? {
            WeekSyncOutcome::Synced(_) => {}
            WeekSyncOutcome::NoGames => {
                return Ok(AdvanceOutcome::NotReady(NotReadyReason::NoGamesSynced));
            }
        }

        if !League::advance_week(league.id, current_week, &conn)? {
            return Ok(AdvanceOutcome::NotReady(NotReadyReason::AdvanceRaceLost));
        }

        Ok(AdvanceOutcome::Advanced {
            from: current_week,
            to: next_week,
        })
    })
    .await?;

    if let AdvanceOutcome::Advanced { from, to } = &outcome {
        info!("league {} advanced from week {} to week {}", league_id, from, to);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::models::tests::game;
    use crate::games::GameStatus;

    fn pick(user_id: i64, slot: i16, team: &str) -> Pick {
        Pick {
            league_id: 1,
            season_year: 2025,
            week_number: 5,
            user_id,
            slot,
            team_abbr: team.to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn final_week_grades_wins_and_losses() {
        let games = vec![
            game("401", GameStatus::Final, Some("KC"), -4),
            game("402", GameStatus::Final, Some("SF"), -4),
        ];
        let picks = vec![pick(7, 1, "KC"), pick(7, 2, "DAL")];

        let (all_final, results) = compute_results(&picks, &games);

        assert!(all_final);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].result, "win");
        assert_eq!(results[1].result, "loss");
    }

    #[test]
    fn unfinished_week_stays_pending() {
        let games = vec![
            game("401", GameStatus::Final, Some("KC"), -4),
            game("402", GameStatus::InProgress, None, -1),
        ];
        let picks = vec![pick(7, 1, "KC")];

        let (all_final, results) = compute_results(&picks, &games);

        assert!(!all_final);
        assert_eq!(results[0].result, "pending");
    }

    #[test]
    fn week_without_games_stays_pending() {
        let picks = vec![pick(7, 1, "KC")];

        let (all_final, results) = compute_results(&picks, &[]);

        assert!(!all_final);
        assert_eq!(results[0].result, "pending");
    }

    #[test]
    fn no_pick_wins_against_a_tie() {
        // final game with no winner
        let games = vec![game("401", GameStatus::Final, None, -4)];
        let picks = vec![pick(7, 1, "KC"), pick(8, 1, "DEN")];

        let (all_final, results) = compute_results(&picks, &games);

        assert!(all_final);
        assert!(results.iter().all(|result| result.result == "loss"));
    }

    #[test]
    fn grading_is_idempotent() {
        let games = vec![game("401", GameStatus::Final, Some("KC"), -4)];
        let picks = vec![pick(7, 1, "KC"), pick(8, 1, "DEN")];

        let (_, first) = compute_results(&picks, &games);
        let (_, second) = compute_results(&picks, &games);

        assert_eq!(first, second);
    }

    #[test]
    fn not_ready_outcome_is_a_successful_noop() {
        let body = AdvanceOutcome::NotReady(NotReadyReason::NoProviderData).to_body();

        assert_eq!(body["ok"], true);
        assert_eq!(body["advanced"], false);
        assert_eq!(body["reason"], "no_provider_data");
    }

    #[test]
    fn advanced_outcome_reports_the_transition() {
        let body = AdvanceOutcome::Advanced { from: 5, to: 6 }.to_body();

        assert_eq!(body["ok"], true);
        assert_eq!(body["advanced"], true);
        assert_eq!(body["from"], 5);
        assert_eq!(body["to"], 6);
    }

    #[test]
    fn upstream_outcome_carries_the_detail() {
        let body = AdvanceOutcome::UpstreamUnavailable("timed out".to_string()).to_body();

        assert_eq!(body["ok"], true);
        assert_eq!(body["advanced"], false);
        assert_eq!(body["reason"], "provider_unavailable");
        assert_eq!(body["detail"], "timed out");
    }
}
