use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::games::Game;
use crate::leagues::League;
use crate::schema::week_configs;

/// lock fallback when a week has no schedule and the operator forces a config
const FALLBACK_LOCK_HOURS: i64 = 24;

/// the final two weeks narrow to a single pick
pub fn picks_required_for(week_number: i16) -> i16 {
    if week_number >= 17 {
        1
    } else {
        2
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable, AsChangeset)]
#[primary_key(league_id, season_year, week_number)]
#[table_name = "week_configs"]
pub struct WeekConfig {
    pub league_id: i64,
    pub season_year: i32,
    pub week_number: i16,
    pub picks_required: i16,
    pub lock_time: DateTime<Utc>,
    pub reveal_time: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub enum WeekSyncOutcome {
    Synced(WeekConfig),
    /// the week has no synced games yet; nothing was written
    NoGames,
}

impl WeekConfig {
    pub fn find(
        league_id: i64,
        season_year: i32,
        week_number: i16,
        conn: &db::Conn,
    ) -> Result<Option<WeekConfig>, ServiceError> {
        let config = week_configs::table
            .filter(week_configs::league_id.eq(league_id))
            .filter(week_configs::season_year.eq(season_year))
            .filter(week_configs::week_number.eq(week_number))
            .first::<WeekConfig>(conn)
            .optional()?;

        Ok(config)
    }

    /// Derive and persist the week's rules from its synced schedule.
    ///
    /// Refuses to write a config for a week without games — a week must
    /// never lock against a schedule that doesn't exist — unless the caller
    /// explicitly asks for the fallback lock.
    pub fn sync(
        league: &League,
        week_number: i16,
        allow_fallback_lock: bool,
        conn: &db::Conn,
    ) -> Result<WeekSyncOutcome, ServiceError> {
        let games = Game::find_week(league.id, league.season_year, week_number, conn)?;

        let lock_time = match Game::earliest_kickoff(&games) {
            Some(kickoff) => kickoff,
            None if allow_fallback_lock => Utc::now() + Duration::hours(FALLBACK_LOCK_HOURS),
            None => return Ok(WeekSyncOutcome::NoGames),
        };

        let config = WeekConfig {
            league_id: league.id,
            season_year: league.season_year,
            week_number,
            picks_required: picks_required_for(week_number),
            lock_time,
            reveal_time: lock_time,
            updated_at: None,
        };

        let config = diesel::insert_into(week_configs::table)
            .values(&config)
            .on_conflict((
                week_configs::league_id,
                week_configs::season_year,
                week_configs::week_number,
            ))
            .do_update()
            .set((&config, week_configs::updated_at.eq(Utc::now())))
            .get_result(conn)?;

        Ok(WeekSyncOutcome::Synced(config))
    }

    /// picks become read-only at the first kickoff
    pub fn is_locked(&self) -> bool {
        Utc::now() >= self.lock_time
    }

    /// other members' picks stay hidden until the reveal
    pub fn is_revealed(&self) -> bool {
        Utc::now() >= self.reveal_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Add;

    fn config(week_number: i16, lock_offset_hours: i64) -> WeekConfig {
        let lock_time = Utc::now().add(Duration::hours(lock_offset_hours));
        WeekConfig {
            league_id: 1,
            season_year: 2025,
            week_number,
            picks_required: picks_required_for(week_number),
            lock_time,
            reveal_time: lock_time,
            updated_at: None,
        }
    }

    #[test]
    fn two_picks_until_week_seventeen() {
        for week in 1..=16 {
            assert_eq!(picks_required_for(week), 2, "week {}", week);
        }
        assert_eq!(picks_required_for(17), 1);
        assert_eq!(picks_required_for(18), 1);
    }

    #[test]
    fn future_lock_is_open() {
        let config = config(5, 2);

        assert!(!config.is_locked());
        assert!(!config.is_revealed());
    }

    #[test]
    fn past_lock_is_locked_and_revealed() {
        let config = config(5, -2);

        assert!(config.is_locked());
        // reveal time equals lock time
        assert!(config.is_revealed());
    }
}
