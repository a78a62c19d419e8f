use std::collections::HashSet;

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::leagues::League;
use crate::schema::games;
use crate::scoreboard::ProviderGame;

/// The provider's competition states collapse into the three phases the
/// pick'em lifecycle cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
}

impl GameStatus {
    pub fn from_provider_state(state: &str) -> GameStatus {
        match state {
            "in" => GameStatus::InProgress,
            "post" => GameStatus::Final,
            _ => GameStatus::Scheduled,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Scheduled => "scheduled",
            GameStatus::InProgress => "inprogress",
            GameStatus::Final => "final",
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
#[primary_key(league_id, season_year, game_id)]
pub struct Game {
    pub league_id: i64,
    pub season_year: i32,
    pub game_id: String,
    pub week_number: i16,
    pub provider: String,
    pub home_abbr: String,
    pub away_abbr: String,
    pub kickoff_time: DateTime<Utc>,
    pub status: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub winner_abbr: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[table_name = "games"]
struct UpsertGame {
    league_id: i64,
    season_year: i32,
    game_id: String,
    week_number: i16,
    provider: String,
    home_abbr: String,
    away_abbr: String,
    kickoff_time: DateTime<Utc>,
    status: String,
    home_score: Option<i32>,
    away_score: Option<i32>,
    winner_abbr: Option<String>,
}

impl Game {
    /// Upsert one row per normalized provider matchup, keyed on
    /// (league, season, game id). Returns the number of rows written.
    pub fn upsert_provider_games(
        league: &League,
        week_number: i16,
        provider: &str,
        provider_games: &[ProviderGame],
        conn: &db::Conn,
    ) -> Result<usize, ServiceError> {
        let mut upserted = 0;

        for game in provider_games {
            let row = UpsertGame {
                league_id: league.id,
                season_year: league.season_year,
                game_id: game.game_id.clone(),
                week_number,
                provider: provider.to_string(),
                home_abbr: game.home_abbr.clone(),
                away_abbr: game.away_abbr.clone(),
                kickoff_time: game.kickoff_time,
                status: game.status.to_string(),
                home_score: game.home_score,
                away_score: game.away_score,
                winner_abbr: game.winner_abbr.clone(),
            };

            diesel::insert_into(games::table)
                .values(&row)
                .on_conflict((games::league_id, games::season_year, games::game_id))
                .do_update()
                .set((&row, games::updated_at.eq(Utc::now())))
                .execute(conn)?;

            upserted += 1;
        }

        info!(
            "synced {} games for league {} week {}",
            upserted, league.id, week_number
        );

        Ok(upserted)
    }

    pub fn find_week(
        league_id: i64,
        season_year: i32,
        week_number: i16,
        conn: &db::Conn,
    ) -> Result<Vec<Game>, ServiceError> {
        let games = games::table
            .filter(games::league_id.eq(league_id))
            .filter(games::season_year.eq(season_year))
            .filter(games::week_number.eq(week_number))
            .order(games::kickoff_time)
            .load::<Game>(conn)?;

        Ok(games)
    }

    pub fn is_final(&self) -> bool {
        self.status == GameStatus::Final.as_str()
    }

    /// a week only counts as complete when it has games and every one is final
    pub fn all_final(games: &[Game]) -> bool {
        !games.is_empty() && games.iter().all(Game::is_final)
    }

    /// the winning abbreviations among the week's final games; ties and
    /// unfinished games contribute nothing
    pub fn winners(games: &[Game]) -> HashSet<String> {
        games
            .iter()
            .filter(|game| game.is_final())
            .filter_map(|game| game.winner_abbr.clone())
            .collect()
    }

    /// the week locks at its earliest kickoff
    pub fn earliest_kickoff(games: &[Game]) -> Option<DateTime<Utc>> {
        games.iter().map(|game| game.kickoff_time).min()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::ops::Add;

    pub(crate) fn game(
        game_id: &str,
        status: GameStatus,
        winner: Option<&str>,
        kickoff_offset_hours: i64,
    ) -> Game {
        Game {
            league_id: 1,
            season_year: 2025,
            game_id: game_id.to_string(),
            week_number: 5,
            provider: "espn".to_string(),
            home_abbr: "KC".to_string(),
            away_abbr: "DEN".to_string(),
            kickoff_time: Utc::now().add(Duration::hours(kickoff_offset_hours)),
            status: status.to_string(),
            home_score: None,
            away_score: None,
            winner_abbr: winner.map(String::from),
            updated_at: None,
        }
    }

    #[test]
    fn provider_state_mapping() {
        assert_eq!(GameStatus::from_provider_state("in"), GameStatus::InProgress);
        assert_eq!(GameStatus::from_provider_state("post"), GameStatus::Final);
        assert_eq!(GameStatus::from_provider_state("pre"), GameStatus::Scheduled);
        assert_eq!(
            GameStatus::from_provider_state("halftime-show"),
            GameStatus::Scheduled
        );
    }

    #[test]
    fn empty_week_is_never_final() {
        assert!(!Game::all_final(&[]));
    }

    #[test]
    fn mixed_week_is_not_final() {
        let games = vec![
            game("401", GameStatus::Final, Some("KC"), -4),
            game("402", GameStatus::InProgress, None, -1),
        ];

        assert!(!Game::all_final(&games));
    }

    #[test]
    fn completed_week_is_final() {
        let games = vec![
            game("401", GameStatus::Final, Some("KC"), -4),
            game("402", GameStatus::Final, None, -4),
        ];

        assert!(Game::all_final(&games));
    }

    #[test]
    fn winners_skip_ties_and_unfinished_games() {
        let games = vec![
            game("401", GameStatus::Final, Some("KC"), -4),
            // a tie: final but no winner
            game("402", GameStatus::Final, None, -4),
            game("403", GameStatus::InProgress, Some("SF"), -1),
        ];

        let winners = Game::winners(&games);

        assert_eq!(winners.len(), 1);
        assert!(winners.contains("KC"));
    }

    #[test]
    fn earliest_kickoff_wins() {
        let games = vec![
            game("401", GameStatus::Scheduled, None, 48),
            game("402", GameStatus::Scheduled, None, 24),
            game("403", GameStatus::Scheduled, None, 72),
        ];

        assert_eq!(
            Game::earliest_kickoff(&games),
            Some(games[1].kickoff_time)
        );
        assert_eq!(Game::earliest_kickoff(&[]), None);
    }
}
