use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use regex::Regex;

use crate::db;
use crate::errors::ServiceError;
use crate::schema::{byes, leagues, members, pick_results};
use crate::users::User;

/// the NFL regular season ends after week 18; the league pointer never
/// moves past it
pub const FINAL_WEEK: i16 = 18;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub season_year: i32,
    pub current_week: i16,
    pub timezone: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLeague {
    pub name: String,
    pub season_year: i32,
    pub timezone: String,
    /// how the creator shows up in the standings; defaults to their username
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "leagues"]
struct NewLeague {
    name: String,
    owner_id: i64,
    season_year: i32,
    timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[primary_key(league_id, user_id)]
pub struct Member {
    pub league_id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// one standings line per member, folded from the graded pick results
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsRow {
    pub user_id: i64,
    pub display_name: String,
    pub wins: i64,
    pub losses: i64,
    pub pending: i64,
    pub bye_week: Option<i16>,
}

impl League {
    /// Creates a new league and joins the creator as its first member.
    ///
    /// When something fails, the transaction rolls-back, returns an error
    /// and nothing will have happened.
    pub fn create(
        request: CreateLeague,
        owner_id: i64,
        conn: &db::Conn,
    ) -> Result<League, ServiceError> {
        let league = conn.transaction::<League, ServiceError, _>(|| {
            let new_league = NewLeague {
                name: request.name,
                owner_id,
                season_year: request.season_year,
                timezone: request.timezone,
            };

            let league: League = diesel::insert_into(leagues::table)
                .values(&new_league)
                .get_result(conn)?;

            let display_name = match request.display_name {
                Some(name) => name,
                None => User::find(owner_id, conn)?.username,
            };

            league.join(owner_id, display_name, conn)?;

            Ok(league)
        })?;

        Ok(league)
    }

    pub fn find_by_id(id: i64, conn: &db::Conn) -> Result<League, ServiceError> {
        let league = leagues::table
            .filter(leagues::id.eq(id))
            .first::<League>(conn)?;

        Ok(league)
    }

    /// the leagues a user is a member of
    pub fn find_by_user(user_id: i64, conn: &db::Conn) -> Result<Vec<League>, ServiceError> {
        let memberships = members::table
            .filter(members::user_id.eq(user_id))
            .select(members::league_id);

        let leagues = leagues::table
            .filter(leagues::id.eq_any(memberships))
            .order(leagues::name)
            .load::<League>(conn)?;

        Ok(leagues)
    }

    pub fn join(
        &self,
        user_id: i64,
        display_name: String,
        conn: &db::Conn,
    ) -> Result<Member, ServiceError> {
        let member = Member {
            league_id: self.id,
            user_id,
            display_name,
            created_at: None,
        };

        let member = diesel::insert_into(members::table)
            .values(&member)
            .get_result(conn)?;

        Ok(member)
    }

    /// validates that a user actually joined this league
    pub fn verify_member(
        league_id: i64,
        user_id: i64,
        conn: &db::Conn,
    ) -> Result<bool, ServiceError> {
        let res = members::table
            .filter(members::league_id.eq(league_id))
            .filter(members::user_id.eq(user_id))
            .select(members::user_id)
            .first::<i64>(conn)
            .optional()?;

        Ok(res.is_some())
    }

    pub fn members(league_id: i64, conn: &db::Conn) -> Result<Vec<Member>, ServiceError> {
        let members = members::table
            .filter(members::league_id.eq(league_id))
            .order(members::display_name)
            .load::<Member>(conn)?;

        Ok(members)
    }

    /// Move the week pointer forward with a conditional update so that two
    /// racing advance calls can never double-advance: only the caller that
    /// still sees `from_week` wins.
    pub fn advance_week(
        league_id: i64,
        from_week: i16,
        conn: &db::Conn,
    ) -> Result<bool, ServiceError> {
        let updated = diesel::update(
            leagues::table
                .filter(leagues::id.eq(league_id))
                .filter(leagues::current_week.eq(from_week)),
        )
        .set((
            leagues::current_week.eq(from_week + 1),
            leagues::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;

        Ok(updated == 1)
    }

    /// fold the season's graded results into one standings line per member
    pub fn standings(&self, conn: &db::Conn) -> Result<Vec<StandingsRow>, ServiceError> {
        let members = League::members(self.id, conn)?;

        let results: Vec<(i64, String)> = pick_results::table
            .filter(pick_results::league_id.eq(self.id))
            .filter(pick_results::season_year.eq(self.season_year))
            .select((pick_results::user_id, pick_results::result))
            .load(conn)?;

        let byes: Vec<(i64, i16)> = byes::table
            .filter(byes::league_id.eq(self.id))
            .filter(byes::season_year.eq(self.season_year))
            .select((byes::user_id, byes::week_number))
            .load(conn)?;

        let bye_weeks: HashMap<i64, i16> = byes.into_iter().collect();

        let mut rows: Vec<StandingsRow> = members
            .into_iter()
            .map(|member| {
                let mut row = StandingsRow {
                    user_id: member.user_id,
                    display_name: member.display_name,
                    wins: 0,
                    losses: 0,
                    pending: 0,
                    bye_week: bye_weeks.get(&member.user_id).copied(),
                };

                for (user_id, result) in &results {
                    if *user_id != row.user_id {
                        continue;
                    }
                    match result.as_str() {
                        "win" => row.wins += 1,
                        "loss" => row.losses += 1,
                        _ => row.pending += 1,
                    }
                }

                row
            })
            .collect();

        rows.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(a.losses.cmp(&b.losses))
                .then(a.display_name.cmp(&b.display_name))
        });

        Ok(rows)
    }
}

impl crate::validator::Validate for CreateLeague {
    fn validate(&self) -> Result<(), ServiceError> {
        let pattern: Regex = Regex::new(r"^[a-zA-Z0-9_-]+( [a-zA-Z0-9_-]+)*$").unwrap();

        if self.name.trim().is_empty() {
            bad_request!("name is too short");
        }

        if self.name.trim().len() > 40 {
            bad_request!("name is too long, maximum 40 characters");
        }

        if !pattern.is_match(&self.name) {
            bad_request!("name can only contain letters, numbers, spaces, '-' and '_'");
        }

        if !(2000..=2100).contains(&self.season_year) {
            bad_request!("that doesn't look like an NFL season");
        }

        if self.timezone.trim().is_empty() {
            bad_request!("a timezone is required");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validate;

    fn league_request(name: &str) -> CreateLeague {
        CreateLeague {
            name: name.to_string(),
            season_year: 2025,
            timezone: "America/New_York".to_string(),
            display_name: None,
        }
    }

    #[test]
    fn valid_league_names() {
        assert!(league_request("office-league").validate().is_ok());
        assert!(league_request("league with spaces").validate().is_ok());
        assert!(league_request("l34gu3 with numb3rs").validate().is_ok());
    }

    #[test]
    fn invalid_league_names() {
        assert!(league_request("").validate().is_err());
        assert!(league_request("<html>").validate().is_err());
        assert!(league_request("('something')").validate().is_err());
    }

    #[test]
    fn invalid_season_year() {
        let mut request = league_request("office-league");
        request.season_year = 1925;

        assert!(request.validate().is_err());
    }

    #[test]
    fn missing_timezone() {
        let mut request = league_request("office-league");
        request.timezone = " ".to_string();

        assert!(request.validate().is_err());
    }
}
