use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use derive_more::Display;

use crate::config::Config;
use crate::errors::ServiceError;
use crate::games::GameStatus;

/// the sports-data provider backing game sync
pub const PROVIDER: &str = "espn";

/// regular season; the provider also knows preseason (1) and postseason (3)
pub const DEFAULT_SEASON_TYPE: i32 = 2;

/// A provider fetch that did not produce games. `Unavailable` is the
/// retryable steady state (timeouts, non-2xx); `Malformed` means the payload
/// shape changed under us and retrying won't help.
#[derive(Debug, Display)]
pub enum FetchError {
    #[display(fmt = "provider unavailable: {}", _0)]
    Unavailable(String),

    #[display(fmt = "provider payload invalid: {}", _0)]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> FetchError {
        FetchError::Unavailable(error.to_string())
    }
}

impl From<FetchError> for ServiceError {
    fn from(error: FetchError) -> ServiceError {
        error!("scoreboard fetch failed: {}", error);
        ServiceError::Upstream(error.to_string())
    }
}

/// one matchup, normalized out of the provider's event/competition shape
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderGame {
    pub game_id: String,
    pub home_abbr: String,
    pub away_abbr: String,
    pub kickoff_time: DateTime<Utc>,
    pub status: GameStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub winner_abbr: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Scoreboard {
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub competitions: Vec<Competition>,
}

#[derive(Debug, Deserialize)]
pub struct Competition {
    pub date: String,
    pub status: Status,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    #[serde(rename = "type")]
    pub kind: StatusType,
}

#[derive(Debug, Deserialize)]
pub struct StatusType {
    pub state: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct Competitor {
    #[serde(rename = "homeAway")]
    pub home_away: String,
    pub score: Option<String>,
    pub team: Option<Team>,
}

#[derive(Debug, Deserialize)]
pub struct Team {
    pub abbreviation: Option<String>,
}

impl Competition {
    fn side(&self, home_away: &str) -> Option<&Competitor> {
        self.competitors
            .iter()
            .find(|competitor| competitor.home_away == home_away)
    }
}

impl Competitor {
    fn abbr(&self) -> Option<&str> {
        self.team
            .as_ref()
            .and_then(|team| team.abbreviation.as_deref())
    }

    fn parsed_score(&self) -> Option<i32> {
        self.score.as_ref().and_then(|score| score.parse().ok())
    }
}

impl Scoreboard {
    /// Flatten the event list into one normalized game per matchup.
    ///
    /// Competitions without a resolvable home/away abbreviation or kickoff
    /// timestamp are skipped rather than failing the whole sync.
    pub fn normalize(&self) -> Vec<ProviderGame> {
        let mut games = Vec::new();

        for event in &self.events {
            let competition = match event.competitions.first() {
                Some(competition) => competition,
                None => continue,
            };

            let (home, away) = match (competition.side("home"), competition.side("away")) {
                (Some(home), Some(away)) => (home, away),
                _ => {
                    debug!("skipping event {}: missing home/away competitor", event.id);
                    continue;
                }
            };

            let (home_abbr, away_abbr) = match (home.abbr(), away.abbr()) {
                (Some(home_abbr), Some(away_abbr)) => (home_abbr, away_abbr),
                _ => {
                    debug!("skipping event {}: missing team abbreviation", event.id);
                    continue;
                }
            };

            let kickoff_time = match parse_kickoff(&competition.date) {
                Some(kickoff_time) => kickoff_time,
                None => {
                    warn!(
                        "skipping event {}: unparseable kickoff {:?}",
                        event.id, competition.date
                    );
                    continue;
                }
            };

            let home_score = home.parsed_score();
            let away_score = away.parsed_score();

            games.push(ProviderGame {
                game_id: event.id.clone(),
                home_abbr: home_abbr.to_string(),
                away_abbr: away_abbr.to_string(),
                kickoff_time,
                status: GameStatus::from_provider_state(&competition.status.kind.state),
                home_score,
                away_score,
                winner_abbr: winner(
                    competition.status.kind.completed,
                    home_abbr,
                    home_score,
                    away_abbr,
                    away_score,
                ),
            });
        }

        games
    }
}

/// the winner exists only for a completed game with two distinct scores;
/// a tie has no winner
fn winner(
    completed: bool,
    home_abbr: &str,
    home_score: Option<i32>,
    away_abbr: &str,
    away_score: Option<i32>,
) -> Option<String> {
    if !completed {
        return None;
    }

    match (home_score, away_score) {
        (Some(home), Some(away)) if home > away => Some(home_abbr.to_string()),
        (Some(home), Some(away)) if away > home => Some(away_abbr.to_string()),
        _ => None,
    }
}

/// the provider emits minute-precision timestamps ("2025-09-07T17:00Z"),
/// with full RFC 3339 as a fallback
fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    Utc.datetime_from_str(raw, "%Y-%m-%dT%H:%MZ")
        .or_else(|_| Utc.datetime_from_str(raw, "%Y-%m-%dT%H:%M:%SZ"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc))
        })
}

pub struct Client {
    reqwest: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("base_url", &self.base_url).finish()
    }
}

impl Client {
    pub fn new() -> Self {
        Client {
            reqwest: reqwest::Client::builder()
                .timeout(Duration::from_secs(Config::provider_timeout()))
                .build()
                .expect("unable to build the scoreboard http client"),
            base_url: Config::scoreboard_url().to_string(),
        }
    }

    /// fetch and normalize the provider scoreboard for one season/week
    pub async fn fetch(
        &self,
        season_year: i32,
        week_number: i16,
        season_type: i32,
    ) -> Result<Vec<ProviderGame>, FetchError> {
        let response = self
            .reqwest
            .get(&self.base_url)
            .query(&[
                ("dates", season_year.to_string()),
                ("week", week_number.to_string()),
                ("seasontype", season_type.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Unavailable(format!(
                "scoreboard returned {}",
                response.status()
            )));
        }

        let scoreboard = response
            .json::<Scoreboard>()
            .await
            .map_err(|error| FetchError::Malformed(error.to_string()))?;

        Ok(scoreboard.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoreboard(payload: &str) -> Scoreboard {
        serde_json::from_str(payload).expect("scoreboard fixture should deserialize")
    }

    fn event(id: &str, state: &str, completed: bool, home: &str, away: &str, scores: Option<(&str, &str)>) -> String {
        let (home_score, away_score) = match scores {
            Some((home, away)) => (format!(r#""{}""#, home), format!(r#""{}""#, away)),
            None => ("null".to_string(), "null".to_string()),
        };

        format!(
            r#"{{
                "id": "{id}",
                "competitions": [{{
                    "date": "2025-09-07T17:00Z",
                    "status": {{ "type": {{ "state": "{state}", "completed": {completed} }} }},
                    "competitors": [
                        {{ "homeAway": "home", "score": {home_score}, "team": {{ "abbreviation": "{home}" }} }},
                        {{ "homeAway": "away", "score": {away_score}, "team": {{ "abbreviation": "{away}" }} }}
                    ]
                }}]
            }}"#,
            id = id,
            state = state,
            completed = completed,
            home = home,
            away = away,
            home_score = home_score,
            away_score = away_score,
        )
    }

    #[test]
    fn final_game_has_a_winner() {
        let payload = format!(
            r#"{{ "events": [{}] }}"#,
            event("401", "post", true, "KC", "DAL", Some(("24", "17")))
        );

        let games = scoreboard(&payload).normalize();

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].status, GameStatus::Final);
        assert_eq!(games[0].winner_abbr.as_deref(), Some("KC"));
        assert_eq!(games[0].home_score, Some(24));
        assert_eq!(games[0].away_score, Some(17));
    }

    #[test]
    fn tie_has_no_winner() {
        let payload = format!(
            r#"{{ "events": [{}] }}"#,
            event("402", "post", true, "PHI", "NYG", Some(("20", "20")))
        );

        let games = scoreboard(&payload).normalize();

        assert_eq!(games[0].status, GameStatus::Final);
        assert_eq!(games[0].winner_abbr, None);
    }

    #[test]
    fn in_progress_game_is_not_graded() {
        let payload = format!(
            r#"{{ "events": [{}] }}"#,
            event("403", "in", false, "SF", "SEA", Some(("10", "7")))
        );

        let games = scoreboard(&payload).normalize();

        assert_eq!(games[0].status, GameStatus::InProgress);
        assert_eq!(games[0].winner_abbr, None);
    }

    #[test]
    fn scheduled_game_without_scores() {
        let payload = format!(
            r#"{{ "events": [{}] }}"#,
            event("404", "pre", false, "BUF", "MIA", None)
        );

        let games = scoreboard(&payload).normalize();

        assert_eq!(games[0].status, GameStatus::Scheduled);
        assert_eq!(games[0].home_score, None);
        assert_eq!(games[0].winner_abbr, None);
    }

    #[test]
    fn event_without_abbreviation_is_skipped() {
        let payload = r#"{
            "events": [{
                "id": "405",
                "competitions": [{
                    "date": "2025-09-07T17:00Z",
                    "status": { "type": { "state": "pre", "completed": false } },
                    "competitors": [
                        { "homeAway": "home", "score": null, "team": { "abbreviation": null } },
                        { "homeAway": "away", "score": null, "team": { "abbreviation": "MIA" } }
                    ]
                }]
            }]
        }"#;

        assert!(scoreboard(payload).normalize().is_empty());
    }

    #[test]
    fn empty_event_list() {
        assert!(scoreboard(r#"{ "events": [] }"#).normalize().is_empty());
        assert!(scoreboard(r#"{}"#).normalize().is_empty());
    }

    #[test]
    fn kickoff_formats() {
        assert!(parse_kickoff("2025-09-07T17:00Z").is_some());
        assert!(parse_kickoff("2025-09-07T17:00:00Z").is_some());
        assert!(parse_kickoff("2025-09-07T17:00:00+02:00").is_some());
        assert!(parse_kickoff("next sunday").is_none());
    }
}
