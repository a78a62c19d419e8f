use chrono::{DateTime, Utc};
use diesel::prelude::*;
use regex::Regex;

use crate::db;
use crate::errors::ServiceError;
use crate::leagues::League;
use crate::schema::{byes, picks};
use crate::weeks::WeekConfig;

/// byes are only available in the regular part of the season
pub const LAST_BYE_WEEK: i16 = 16;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[primary_key(league_id, season_year, week_number, user_id, slot)]
pub struct Pick {
    pub league_id: i64,
    pub season_year: i32,
    pub week_number: i16,
    pub user_id: i64,
    pub slot: i16,
    pub team_abbr: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[table_name = "picks"]
struct NewPick {
    league_id: i64,
    season_year: i32,
    week_number: i16,
    user_id: i64,
    slot: i16,
    team_abbr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[primary_key(league_id, season_year, week_number, user_id)]
pub struct Bye {
    pub league_id: i64,
    pub season_year: i32,
    pub week_number: i16,
    pub user_id: i64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[table_name = "byes"]
struct NewBye {
    league_id: i64,
    season_year: i32,
    week_number: i16,
    user_id: i64,
}

/// What a member submits for one week: either a bye or their team picks.
#[derive(Debug, Clone, Deserialize)]
pub struct PickSubmission {
    pub league_id: i64,
    /// defaults to the league's current week
    pub week_number: Option<i16>,
    #[serde(default)]
    pub bye: bool,
    #[serde(default)]
    pub teams: Vec<String>,
}

/// a week only keeps as many selections as it requires; extra slots are
/// silently dropped rather than rejected
fn effective_teams(mut teams: Vec<String>, picks_required: i16) -> Vec<String> {
    teams.truncate(picks_required as usize);
    teams
}

/// shape checks on the selection itself, before any store access
fn validate_selection(teams: &[String], picks_required: i16) -> Result<(), ServiceError> {
    if teams.is_empty() {
        bad_request!("slot 1 requires a team selection");
    }

    if picks_required == 2 && teams.len() < 2 {
        bad_request!("this week requires two picks");
    }

    if teams.len() == 2 && teams[0] == teams[1] {
        bad_request!("slot 1 and slot 2 must be different teams");
    }

    lazy_static! {
        static ref ABBR_PATTERN: Regex =
            Regex::new(r"^[A-Z]{2,4}$").expect("invalid team abbreviation regex");
    }

    for team in teams {
        if !ABBR_PATTERN.is_match(team) {
            bad_request!(format!("'{}' is not a team abbreviation", team));
        }
    }

    Ok(())
}

/// Commit a member's weekly selection.
///
/// Everything behind the lock check runs in one transaction, so a failed
/// step never leaves a half bye/half picks week behind. Returns the
/// refreshed season used-teams set.
pub fn submit(
    user_id: i64,
    league: &League,
    config: &WeekConfig,
    submission: &PickSubmission,
    conn: &db::Conn,
) -> Result<Vec<String>, ServiceError> {
    if config.is_locked() {
        forbidden!(format!("picks for week {} are locked", config.week_number));
    }

    if submission.bye {
        declare_bye(user_id, league, config.week_number, conn)?;
    } else {
        save_picks(user_id, league, config, submission.teams.clone(), conn)?;
    }

    used_teams(user_id, league, conn)
}

fn declare_bye(
    user_id: i64,
    league: &League,
    week_number: i16,
    conn: &db::Conn,
) -> Result<(), ServiceError> {
    if week_number > LAST_BYE_WEEK {
        bad_request!(format!(
            "byes are only available through week {}",
            LAST_BYE_WEEK
        ));
    }

    conn.transaction::<(), ServiceError, _>(|| {
        let existing: Option<i16> = byes::table
            .filter(byes::league_id.eq(league.id))
            .filter(byes::season_year.eq(league.season_year))
            .filter(byes::user_id.eq(user_id))
            .select(byes::week_number)
            .first::<i16>(conn)
            .optional()?;

        match existing {
            Some(week) if week != week_number => {
                bad_request!(format!("season bye already used in week {}", week));
            }
            Some(_) => {
                // resubmitting the same bye is a no-op
            }
            None => {
                diesel::insert_into(byes::table)
                    .values(&NewBye {
                        league_id: league.id,
                        season_year: league.season_year,
                        week_number,
                        user_id,
                    })
                    .on_conflict_do_nothing()
                    .execute(conn)?;
            }
        }

        // a bye and picks are mutually exclusive for the week
        diesel::delete(
            picks::table
                .filter(picks::league_id.eq(league.id))
                .filter(picks::season_year.eq(league.season_year))
                .filter(picks::week_number.eq(week_number))
                .filter(picks::user_id.eq(user_id)),
        )
        .execute(conn)?;

        Ok(())
    })
}

fn save_picks(
    user_id: i64,
    league: &League,
    config: &WeekConfig,
    teams: Vec<String>,
    conn: &db::Conn,
) -> Result<(), ServiceError> {
    let teams = effective_teams(teams, config.picks_required);
    validate_selection(&teams, config.picks_required)?;

    conn.transaction::<(), ServiceError, _>(|| {
        // switching from a declared bye back to picks
        diesel::delete(
            byes::table
                .filter(byes::league_id.eq(league.id))
                .filter(byes::season_year.eq(league.season_year))
                .filter(byes::week_number.eq(config.week_number))
                .filter(byes::user_id.eq(user_id)),
        )
        .execute(conn)?;

        // a team may only be picked once per season; the unique constraint on
        // (league, season, user, team) backs this up against racing clients
        let reused: Vec<String> = picks::table
            .filter(picks::league_id.eq(league.id))
            .filter(picks::season_year.eq(league.season_year))
            .filter(picks::user_id.eq(user_id))
            .filter(picks::week_number.ne(config.week_number))
            .filter(picks::team_abbr.eq_any(&teams))
            .select(picks::team_abbr)
            .load::<String>(conn)?;

        if let Some(team) = reused.first() {
            conflict!(format!("{} was already picked earlier this season", team));
        }

        for (index, team) in teams.iter().enumerate() {
            let row = NewPick {
                league_id: league.id,
                season_year: league.season_year,
                week_number: config.week_number,
                user_id,
                slot: index as i16 + 1,
                team_abbr: team.clone(),
            };

            diesel::insert_into(picks::table)
                .values(&row)
                .on_conflict((
                    picks::league_id,
                    picks::season_year,
                    picks::week_number,
                    picks::user_id,
                    picks::slot,
                ))
                .do_update()
                .set((
                    picks::team_abbr.eq(team),
                    picks::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
        }

        if teams.len() < 2 {
            // a stray slot-2 row left over from a two-pick week config
            diesel::delete(
                picks::table
                    .filter(picks::league_id.eq(league.id))
                    .filter(picks::season_year.eq(league.season_year))
                    .filter(picks::week_number.eq(config.week_number))
                    .filter(picks::user_id.eq(user_id))
                    .filter(picks::slot.eq(2)),
            )
            .execute(conn)?;
        }

        Ok(())
    })
}

/// every team the user has burned so far this season
pub fn used_teams(
    user_id: i64,
    league: &League,
    conn: &db::Conn,
) -> Result<Vec<String>, ServiceError> {
    let teams = picks::table
        .filter(picks::league_id.eq(league.id))
        .filter(picks::season_year.eq(league.season_year))
        .filter(picks::user_id.eq(user_id))
        .select(picks::team_abbr)
        .distinct()
        .order(picks::team_abbr)
        .load::<String>(conn)?;

    Ok(teams)
}

impl Pick {
    /// every pick of the week, for grading and post-reveal listings
    pub fn find_week(
        league_id: i64,
        season_year: i32,
        week_number: i16,
        conn: &db::Conn,
    ) -> Result<Vec<Pick>, ServiceError> {
        let picks = picks::table
            .filter(picks::league_id.eq(league_id))
            .filter(picks::season_year.eq(season_year))
            .filter(picks::week_number.eq(week_number))
            .order((picks::user_id, picks::slot))
            .load::<Pick>(conn)?;

        Ok(picks)
    }

    /// Week listing through a member's eyes: before the reveal only their
    /// own picks come back. The store's row-level policy enforces the same
    /// boundary underneath.
    pub fn find_week_for_viewer(
        league: &League,
        week_number: i16,
        viewer_id: i64,
        revealed: bool,
        conn: &db::Conn,
    ) -> Result<Vec<Pick>, ServiceError> {
        let mut query = picks::table
            .filter(picks::league_id.eq(league.id))
            .filter(picks::season_year.eq(league.season_year))
            .filter(picks::week_number.eq(week_number))
            .order((picks::user_id, picks::slot))
            .into_boxed();

        if !revealed {
            query = query.filter(picks::user_id.eq(viewer_id));
        }

        let picks = query.load::<Pick>(conn)?;

        Ok(picks)
    }
}

impl Bye {
    /// the week the user burned their season bye on, if any
    pub fn season_bye_week(
        user_id: i64,
        league: &League,
        conn: &db::Conn,
    ) -> Result<Option<i16>, ServiceError> {
        let week = byes::table
            .filter(byes::league_id.eq(league.id))
            .filter(byes::season_year.eq(league.season_year))
            .filter(byes::user_id.eq(user_id))
            .select(byes::week_number)
            .first::<i16>(conn)
            .optional()?;

        Ok(week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_requires_slot_one() {
        assert!(validate_selection(&[], 2).is_err());
        assert!(validate_selection(&[], 1).is_err());
    }

    #[test]
    fn two_pick_week_requires_both_slots() {
        let one_team = vec!["KC".to_string()];

        assert!(validate_selection(&one_team, 2).is_err());
        assert!(validate_selection(&one_team, 1).is_ok());
    }

    #[test]
    fn slots_must_differ() {
        let same = vec!["KC".to_string(), "KC".to_string()];
        let different = vec!["KC".to_string(), "DAL".to_string()];

        assert!(validate_selection(&same, 2).is_err());
        assert!(validate_selection(&different, 2).is_ok());
    }

    #[test]
    fn abbreviations_are_uppercase() {
        let lowercase = vec!["kc".to_string(), "DAL".to_string()];
        let too_long = vec!["CHIEFS".to_string(), "DAL".to_string()];

        assert!(validate_selection(&lowercase, 2).is_err());
        assert!(validate_selection(&too_long, 2).is_err());
    }

    #[test]
    fn single_pick_week_drops_slot_two() {
        let teams = vec!["KC".to_string(), "DAL".to_string()];

        let effective = effective_teams(teams, 1);

        assert_eq!(effective, vec!["KC".to_string()]);
        assert!(validate_selection(&effective, 1).is_ok());
    }

    #[test]
    fn two_pick_week_keeps_both_slots() {
        let teams = vec!["KC".to_string(), "DAL".to_string()];

        let effective = effective_teams(teams.clone(), 2);

        assert_eq!(effective, teams);
    }
}
